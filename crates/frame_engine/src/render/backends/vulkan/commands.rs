//! Command buffer recording and submission
//!
//! One persistent primary command buffer per frame slot, reset and
//! re-recorded each cycle rather than reallocated. Submission wires the
//! slot's semaphores and fence so the GPU never writes an image the
//! presentation engine has not released.

use ash::{vk, Device};

use crate::render::backends::vulkan::sync::FrameSync;
use crate::render::backends::vulkan::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup
///
/// Created with `RESET_COMMAND_BUFFER` so individual buffers can be reset
/// per frame without recycling the whole pool.
pub struct CommandPool {
    device: Device,
    command_pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a new command pool on the given queue family
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let pool_create_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);

        let command_pool = unsafe {
            device
                .create_command_pool(&pool_create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self {
            device,
            command_pool,
        })
    }

    /// Allocate primary command buffers from the pool
    pub fn allocate_command_buffers(&self, count: u32) -> VulkanResult<Vec<vk::CommandBuffer>> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let command_buffers = unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?
        };

        Ok(command_buffers)
    }

    /// Get the command pool handle
    pub fn handle(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // All buffers allocated from the pool must be off the queue
            // before the pool goes away.
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.command_pool, None);
        }
    }
}

/// Opaque draw handles passed through to command recording
///
/// The pipeline and geometry buffers are owned by collaborators outside the
/// core; this struct only carries them into the recorded command stream.
/// The pipeline is expected to declare viewport and scissor as dynamic
/// state.
#[derive(Debug, Clone, Copy)]
pub struct DrawInputs {
    /// Graphics pipeline compiled against the fixed render pass
    pub pipeline: vk::Pipeline,
    /// Layout of `pipeline`, used when binding `descriptor_set`
    pub pipeline_layout: vk::PipelineLayout,
    /// Descriptor set bound at set 0 when the pipeline consumes one
    pub descriptor_set: Option<vk::DescriptorSet>,
    /// Vertex buffer bound at binding 0
    pub vertex_buffer: vk::Buffer,
    /// Index buffer, `u32` indices
    pub index_buffer: vk::Buffer,
    /// Number of indices to draw
    pub index_count: u32,
}

/// Records and submits one command buffer per frame slot
pub struct CommandSubmissionPipeline {
    device: Device,
    pool: CommandPool,
    buffers: Vec<vk::CommandBuffer>,
    clear_color: [f32; 4],
}

impl CommandSubmissionPipeline {
    /// Create the pool and pre-allocate one buffer per slot
    pub fn new(
        device: Device,
        queue_family_index: u32,
        slot_count: usize,
        clear_color: [f32; 4],
    ) -> VulkanResult<Self> {
        let pool = CommandPool::new(device.clone(), queue_family_index)?;
        let buffers = pool.allocate_command_buffers(slot_count as u32)?;
        log::debug!("Allocated {} per-slot command buffers", buffers.len());

        Ok(Self {
            device,
            pool,
            buffers,
            clear_color,
        })
    }

    /// Number of per-slot buffers
    pub fn slot_count(&self) -> usize {
        self.buffers.len()
    }

    /// Get the command buffer for a slot
    pub fn buffer(&self, slot: usize) -> vk::CommandBuffer {
        self.buffers[slot]
    }

    /// Borrow the owning pool
    pub fn pool(&self) -> &CommandPool {
        &self.pool
    }

    /// Reset the slot's buffer and re-encode the full draw sequence
    ///
    /// Legal only after the slot's fence wait has returned; resetting a
    /// buffer that is still executing is undefined behavior on the GPU
    /// timeline.
    pub fn record(
        &self,
        slot: usize,
        framebuffer: vk::Framebuffer,
        render_pass: vk::RenderPass,
        extent: vk::Extent2D,
        inputs: &DrawInputs,
    ) -> VulkanResult<()> {
        let command_buffer = self.buffers[slot];

        unsafe {
            self.device
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;

            let begin_info = vk::CommandBufferBeginInfo::builder();
            self.device
                .begin_command_buffer(command_buffer, &begin_info)
                .map_err(VulkanError::Api)?;

            let clear_values = [vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: self.clear_color,
                },
            }];
            let render_area = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            let render_pass_begin = vk::RenderPassBeginInfo::builder()
                .render_pass(render_pass)
                .framebuffer(framebuffer)
                .render_area(render_area)
                .clear_values(&clear_values);

            self.device.cmd_begin_render_pass(
                command_buffer,
                &render_pass_begin,
                vk::SubpassContents::INLINE,
            );

            self.device.cmd_bind_pipeline(
                command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                inputs.pipeline,
            );

            if let Some(descriptor_set) = inputs.descriptor_set {
                self.device.cmd_bind_descriptor_sets(
                    command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    inputs.pipeline_layout,
                    0,
                    &[descriptor_set],
                    &[],
                );
            }

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            self.device.cmd_set_viewport(command_buffer, 0, &[viewport]);
            self.device.cmd_set_scissor(command_buffer, 0, &[render_area]);

            self.device.cmd_bind_vertex_buffers(
                command_buffer,
                0,
                &[inputs.vertex_buffer],
                &[0],
            );
            self.device.cmd_bind_index_buffer(
                command_buffer,
                inputs.index_buffer,
                0,
                vk::IndexType::UINT32,
            );
            self.device
                .cmd_draw_indexed(command_buffer, inputs.index_count, 1, 0, 0, 0);

            self.device.cmd_end_render_pass(command_buffer);
            self.device
                .end_command_buffer(command_buffer)
                .map_err(VulkanError::Api)?;
        }

        Ok(())
    }

    /// Submit the slot's buffer to the graphics queue
    ///
    /// Waits on the slot's image-available semaphore at the color-output
    /// stage and signals render-finished plus the slot fence on completion.
    /// Queue rejection (device lost) is fatal and never retried.
    pub fn submit(&self, slot: usize, queue: vk::Queue, sync: &FrameSync) -> VulkanResult<()> {
        let wait_semaphores = [sync.image_available.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [self.buffers[slot]];
        let signal_semaphores = [sync.render_finished.handle()];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        match unsafe {
            self.device.queue_submit(
                queue,
                &[submit_info.build()],
                sync.in_flight.handle(),
            )
        } {
            Ok(()) => Ok(()),
            Err(vk::Result::ERROR_DEVICE_LOST) => Err(VulkanError::DeviceLost),
            Err(e) => Err(VulkanError::Api(e)),
        }
    }
}
