//! 录制与提交

use ash::vk;
use ember_gfx::basic::color::LabelColor;
use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::commands::barrier::TransitionBarrier;
use ember_gfx::commands::command_buffer::GfxCommandBuffer;
use ember_gfx::gfx::GfxDevice;

use crate::graph::{RedirectedTransitionsEvent, RenderGraph, RenderGraphEvent, RenderPassEvent};
use crate::pass::RenderPass;
use crate::pass_context::RenderPassContext;
use crate::resource_scheduler::ResourceScheduler;

impl RenderGraph {
    /// 录制所有事件的命令缓冲，然后按队列提交
    ///
    /// 每帧共享数据需要在调用前通过 `ResourceScheduler::update_scene_frame_data` 上传。
    pub fn execute(&mut self, scheduler: &ResourceScheduler, gfx: &mut GfxDevice) {
        let _span = tracy_client::span!("RenderGraph::execute");
        assert!(self.built, "RenderGraph::execute called before build");

        self.record_commands(scheduler, gfx);
        self.submit(gfx);
    }

    fn record_commands(&mut self, scheduler: &ResourceScheduler, gfx: &GfxDevice) {
        let _span = tracy_client::span!("RenderGraph::record_commands");

        let Self { passes, events, .. } = self;
        for event in events.iter_mut().flatten() {
            match event {
                RenderGraphEvent::RedirectedTransitions(event) => Self::record_redirected(event, gfx),
                RenderGraphEvent::RenderPass(event) => {
                    Self::record_pass(&passes[event.pass], event, scheduler, gfx);
                }
            }
        }
    }

    fn record_redirected(event: &mut RedirectedTransitionsEvent, gfx: &GfxDevice) {
        let cmd = &mut event.command_buffer;
        cmd.begin();
        cmd.begin_label(&format!("RedirectedTransitions[{}]", event.dependency_group), LabelColor::COLOR_TRANSITION);
        for barrier in &event.barriers {
            record_transition(cmd, barrier, gfx);
        }
        cmd.end_label();
        cmd.end();
    }

    fn record_pass(pass: &RenderPass, event: &mut RenderPassEvent, scheduler: &ResourceScheduler, gfx: &GfxDevice) {
        // pre-pass barrier
        let pre = &mut event.pre_command_buffer;
        pre.begin();
        if !event.barriers.is_empty() || !event.uav_barriers.is_empty() {
            pre.begin_label(&format!("{} barriers", pass.name), LabelColor::COLOR_TRANSITION);
            for barrier in &event.barriers {
                record_transition(pre, barrier, gfx);
            }
            for barrier in &event.uav_barriers {
                pre.uav_barrier(barrier);
            }
            pre.end_label();
        }
        pre.end();

        // pass 本体
        let cmd = &mut event.pass_command_buffer;
        cmd.begin();
        cmd.begin_label(&pass.name, LabelColor::COLOR_PASS);
        if let Some(pipeline) = scheduler.pass_pipeline(pass.id) {
            match gfx.pipeline(pipeline).map(|p| p.bind_point()) {
                Some(vk::PipelineBindPoint::COMPUTE) => cmd.set_compute_pipeline(pipeline),
                Some(_) => cmd.set_graphics_pipeline(pipeline),
                None => log::warn!("pipeline of pass {} is not alive", pass.name),
            }
        }
        if pass.queue != QueueType::Copy {
            if let Some(frame_resources) = scheduler.frame_resources() {
                cmd.bind_frame_resources(frame_resources.constant_buffer, &frame_resources.structured_buffers());
            }
        }
        {
            let mut ctx = RenderPassContext::new(pass.id, &pass.name, pass.queue, cmd, scheduler, gfx);
            pass.pass.execute(&mut ctx);
        }
        cmd.end_label();
        cmd.end();

        // post-pass barrier
        let post = &mut event.post_command_buffer;
        post.begin();
        for barrier in &event.post_barriers {
            record_transition(post, barrier, gfx);
        }
        post.end();
    }

    /// 逐队列提交
    ///
    /// 不需要等待的相邻命令缓冲合并为一次提交；遇到等待先提交已有批次，signal 紧跟在提交之后。
    fn submit(&self, gfx: &mut GfxDevice) {
        let _span = tracy_client::span!("RenderGraph::submit");

        for queue in QueueType::ALL {
            let mut batch: Vec<&GfxCommandBuffer> = Vec::new();
            for event in &self.events[queue.index()] {
                let waits = event.signals_to_wait();
                if !waits.is_empty() {
                    gfx.submit(queue, &batch);
                    batch.clear();
                    for wait in waits {
                        gfx.wait(queue, wait.queue, wait.value);
                    }
                }

                batch.extend(event.command_buffers().into_iter().filter(|cmd| !cmd.is_empty()));

                if let Some(signal) = event.signal() {
                    gfx.submit(queue, &batch);
                    batch.clear();
                    gfx.signal(queue, signal.queue, signal.value);
                }
            }
            gfx.submit(queue, &batch);
        }
    }
}

fn record_transition(cmd: &mut GfxCommandBuffer, barrier: &TransitionBarrier, gfx: &GfxDevice) {
    match gfx.resource_manager().texture(barrier.texture) {
        Some(texture) => cmd.transition_resource(barrier, texture.desc()),
        None => log::error!("transition of {} skipped: texture is not alive", barrier.resource),
    }
}
