use ash::vk;

use crate::basic::queue_type::QueueType;
use crate::commands::barrier::{AliasingBarrier, GfxImageBarrier, TransitionBarrier, UavBarrier};
use crate::resources::handles::{GfxBufferHandle, GfxPipelineHandle, GfxTextureHandle, GfxTextureViewHandle};
use crate::resources::texture::{ClearValue, GfxTextureDesc};

/// headless 命令缓冲中记录的一条命令
#[derive(Clone, Debug)]
pub enum GfxCommand {
    BeginLabel {
        name: String,
        color: glam::Vec4,
    },
    EndLabel,
    Transition {
        barrier: TransitionBarrier,
        image_barrier: GfxImageBarrier,
    },
    UavBarrier(UavBarrier),
    AliasingBarrier(AliasingBarrier),
    BindPipeline {
        pipeline: GfxPipelineHandle,
        bind_point: vk::PipelineBindPoint,
    },
    BindFrameResources {
        constants: GfxBufferHandle,
        structured: Vec<GfxBufferHandle>,
    },
    /// 按 shader 中的槽位顺序
    BindTextureViews {
        views: Vec<GfxTextureViewHandle>,
    },
    BeginRenderPass {
        color_attachments: Vec<(GfxTextureViewHandle, Option<ClearValue>)>,
        depth_attachment: Option<(GfxTextureViewHandle, Option<ClearValue>)>,
    },
    EndRenderPass,
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    Dispatch {
        group_count: glam::UVec3,
    },
    CopyTexture {
        src: GfxTextureHandle,
        dst: GfxTextureHandle,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GfxCommandBufferState {
    Initial,
    Recording,
    Executable,
}

/// headless 命令缓冲
///
/// 只记录命令列表；在非 recording 状态下录制命令会 panic。
#[derive(Debug)]
pub struct GfxCommandBuffer {
    name: String,
    queue: QueueType,
    state: GfxCommandBufferState,
    commands: Vec<GfxCommand>,
    label_depth: u32,
}

// new & init
impl GfxCommandBuffer {
    pub fn new(queue: QueueType, name: impl Into<String>) -> Self {
        let name = name.into();
        log::trace!("allocate command buffer: {name} on {queue} queue");
        Self {
            name,
            queue,
            state: GfxCommandBufferState::Initial,
            commands: Vec::new(),
            label_depth: 0,
        }
    }
}

// getters
impl GfxCommandBuffer {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    #[inline]
    pub fn state(&self) -> GfxCommandBufferState {
        self.state
    }

    #[inline]
    pub fn commands(&self) -> &[GfxCommand] {
        &self.commands
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 已录制的 transition barrier
    pub fn transitions(&self) -> impl Iterator<Item = &TransitionBarrier> {
        self.commands.iter().filter_map(|cmd| match cmd {
            GfxCommand::Transition { barrier, .. } => Some(barrier),
            _ => None,
        })
    }
}

// begin & end
impl GfxCommandBuffer {
    /// 开始录制，之前的命令会被清空
    pub fn begin(&mut self) {
        self.commands.clear();
        self.label_depth = 0;
        self.state = GfxCommandBufferState::Recording;
    }

    pub fn end(&mut self) {
        self.assert_recording();
        assert_eq!(self.label_depth, 0, "Unbalanced debug labels in command buffer {}", self.name);
        self.state = GfxCommandBufferState::Executable;
    }

    #[inline]
    fn assert_recording(&self) {
        assert_eq!(
            self.state,
            GfxCommandBufferState::Recording,
            "Command buffer {} is not recording",
            self.name
        );
    }

    #[inline]
    fn record(&mut self, command: GfxCommand) {
        self.assert_recording();
        self.commands.push(command);
    }
}

// debug label
impl GfxCommandBuffer {
    pub fn begin_label(&mut self, label_name: &str, label_color: glam::Vec4) {
        self.record(GfxCommand::BeginLabel {
            name: label_name.to_string(),
            color: label_color,
        });
        self.label_depth += 1;
    }

    pub fn end_label(&mut self) {
        assert!(self.label_depth > 0, "end_label without begin_label in {}", self.name);
        self.record(GfxCommand::EndLabel);
        self.label_depth -= 1;
    }
}

// barrier
impl GfxCommandBuffer {
    pub fn transition_resource(&mut self, barrier: &TransitionBarrier, desc: &GfxTextureDesc) {
        let image_barrier = barrier.to_image_barrier(desc);
        self.record(GfxCommand::Transition {
            barrier: barrier.clone(),
            image_barrier,
        });
    }

    pub fn uav_barrier(&mut self, barrier: &UavBarrier) {
        self.record(GfxCommand::UavBarrier(barrier.clone()));
    }

    pub fn aliasing_barrier(&mut self, barrier: &AliasingBarrier) {
        self.record(GfxCommand::AliasingBarrier(*barrier));
    }
}

// draw & dispatch
impl GfxCommandBuffer {
    pub fn set_graphics_pipeline(&mut self, pipeline: GfxPipelineHandle) {
        self.record(GfxCommand::BindPipeline {
            pipeline,
            bind_point: vk::PipelineBindPoint::GRAPHICS,
        });
    }

    pub fn set_compute_pipeline(&mut self, pipeline: GfxPipelineHandle) {
        self.record(GfxCommand::BindPipeline {
            pipeline,
            bind_point: vk::PipelineBindPoint::COMPUTE,
        });
    }

    /// 绑定每帧共享的数据（常量 buffer + 若干 structured buffer）
    pub fn bind_frame_resources(&mut self, constants: GfxBufferHandle, structured: &[GfxBufferHandle]) {
        self.record(GfxCommand::BindFrameResources {
            constants,
            structured: structured.to_vec(),
        });
    }

    pub fn bind_texture_views(&mut self, views: &[GfxTextureViewHandle]) {
        self.record(GfxCommand::BindTextureViews { views: views.to_vec() });
    }

    pub fn begin_render_pass(
        &mut self,
        color_attachments: &[(GfxTextureViewHandle, Option<ClearValue>)],
        depth_attachment: Option<(GfxTextureViewHandle, Option<ClearValue>)>,
    ) {
        assert!(
            self.queue == QueueType::Graphics,
            "Render pass recorded on {} queue in {}",
            self.queue,
            self.name
        );
        self.record(GfxCommand::BeginRenderPass {
            color_attachments: color_attachments.to_vec(),
            depth_attachment,
        });
    }

    pub fn end_render_pass(&mut self) {
        self.record(GfxCommand::EndRenderPass);
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        self.record(GfxCommand::Draw {
            vertex_count,
            instance_count,
        });
    }

    pub fn dispatch(&mut self, group_count: glam::UVec3) {
        self.record(GfxCommand::Dispatch { group_count });
    }

    pub fn copy_texture(&mut self, src: GfxTextureHandle, dst: GfxTextureHandle) {
        self.record(GfxCommand::CopyTexture { src, dst });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_end() {
        let mut cmd = GfxCommandBuffer::new(QueueType::Compute, "bloom-downsample");
        cmd.begin();
        cmd.begin_label("bloom", glam::Vec4::ONE);
        cmd.dispatch(glam::uvec3(8, 8, 1));
        cmd.end_label();
        cmd.end();

        assert_eq!(cmd.state(), GfxCommandBufferState::Executable);
        assert_eq!(cmd.commands().len(), 3);
        assert!(matches!(cmd.commands()[1], GfxCommand::Dispatch { .. }));
    }

    #[test]
    fn test_begin_clears_previous_commands() {
        let mut cmd = GfxCommandBuffer::new(QueueType::Graphics, "geometry");
        cmd.begin();
        cmd.draw(3, 1);
        cmd.end();
        cmd.begin();
        assert!(cmd.is_empty());
    }

    #[test]
    fn test_copy_queue_commands() {
        let src = GfxTextureHandle::default();
        let dst = GfxTextureHandle::default();

        let mut cmd = GfxCommandBuffer::new(QueueType::Copy, "upload");
        cmd.begin();
        cmd.aliasing_barrier(&AliasingBarrier {
            before: None,
            after: Some(dst),
        });
        cmd.copy_texture(src, dst);
        cmd.end();

        assert!(matches!(cmd.commands()[0], GfxCommand::AliasingBarrier(AliasingBarrier { before: None, .. })));
        assert!(matches!(cmd.commands()[1], GfxCommand::CopyTexture { .. }));
        assert_eq!(cmd.transitions().count(), 0);
    }

    #[test]
    #[should_panic(expected = "is not recording")]
    fn test_record_without_begin() {
        let mut cmd = GfxCommandBuffer::new(QueueType::Graphics, "geometry");
        cmd.draw(3, 1);
    }

    #[test]
    #[should_panic(expected = "Render pass recorded on Copy queue")]
    fn test_render_pass_on_copy_queue() {
        let mut cmd = GfxCommandBuffer::new(QueueType::Copy, "upload");
        cmd.begin();
        cmd.begin_render_pass(&[], None);
    }
}
