//! 每个队列的事件列表
//!
//! 事件是一次提交单元：若干命令缓冲，加上提交前需要等待的 fence 和提交后需要 signal 的 fence。
//! graphics 队列上，每个分组的重定向事件排在该分组的 graphics pass 之前。

use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::commands::barrier::{TransitionBarrier, UavBarrier};
use ember_gfx::commands::command_buffer::GfxCommandBuffer;
use ember_gfx::gfx::GfxDevice;
use indexmap::IndexSet;
use itertools::Itertools;

use crate::graph::RenderGraph;
use crate::pass::PassId;
use crate::resource_id::ResourceId;
use crate::resource_scheduler::ResourceScheduler;

/// 队列 timeline fence 上的一个值
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FenceSignal {
    /// fence 所属的队列
    pub queue: QueueType,
    pub value: u64,
}

/// 在 graphics 队列上执行的重定向转换
#[derive(Debug)]
pub struct RedirectedTransitionsEvent {
    /// 所属的依赖分组；所有分组之后的 `PRESENT` 转换使用分组数量
    pub dependency_group: usize,
    pub barriers: Vec<TransitionBarrier>,
    pub command_buffer: GfxCommandBuffer,
    pub signal: Option<FenceSignal>,
    pub signals_to_wait: Vec<FenceSignal>,
}

/// 一个 pass 的提交单元
#[derive(Debug)]
pub struct RenderPassEvent {
    pub pass: PassId,
    pub barriers: Vec<TransitionBarrier>,
    pub uav_barriers: Vec<UavBarrier>,
    pub post_barriers: Vec<TransitionBarrier>,
    pub pre_command_buffer: GfxCommandBuffer,
    pub pass_command_buffer: GfxCommandBuffer,
    pub post_command_buffer: GfxCommandBuffer,
    pub signal: Option<FenceSignal>,
    pub signals_to_wait: Vec<FenceSignal>,
}

#[derive(Debug)]
pub enum RenderGraphEvent {
    RedirectedTransitions(RedirectedTransitionsEvent),
    RenderPass(RenderPassEvent),
}

// getters
impl RenderGraphEvent {
    #[inline]
    pub fn signal(&self) -> Option<FenceSignal> {
        match self {
            Self::RedirectedTransitions(event) => event.signal,
            Self::RenderPass(event) => event.signal,
        }
    }

    #[inline]
    pub fn signals_to_wait(&self) -> &[FenceSignal] {
        match self {
            Self::RedirectedTransitions(event) => &event.signals_to_wait,
            Self::RenderPass(event) => &event.signals_to_wait,
        }
    }

    /// 按提交顺序排列的命令缓冲
    pub fn command_buffers(&self) -> Vec<&GfxCommandBuffer> {
        match self {
            Self::RedirectedTransitions(event) => vec![&event.command_buffer],
            Self::RenderPass(event) => vec![
                &event.pre_command_buffer,
                &event.pass_command_buffer,
                &event.post_command_buffer,
            ],
        }
    }

    #[inline]
    pub fn as_pass(&self) -> Option<&RenderPassEvent> {
        match self {
            Self::RenderPass(event) => Some(event),
            Self::RedirectedTransitions(_) => None,
        }
    }

    #[inline]
    pub fn as_redirected(&self) -> Option<&RedirectedTransitionsEvent> {
        match self {
            Self::RedirectedTransitions(event) => Some(event),
            Self::RenderPass(_) => None,
        }
    }

    fn set_signal(&mut self, signal: FenceSignal) {
        match self {
            Self::RedirectedTransitions(event) => event.signal = Some(signal),
            Self::RenderPass(event) => event.signal = Some(signal),
        }
    }

    fn set_signals_to_wait(&mut self, signals: Vec<FenceSignal>) {
        match self {
            Self::RedirectedTransitions(event) => event.signals_to_wait = signals,
            Self::RenderPass(event) => event.signals_to_wait = signals,
        }
    }
}

/// 事件在所属队列列表中的位置
type EventRef = (QueueType, usize);

impl RenderGraph {
    pub(super) fn build_events(&mut self, scheduler: &ResourceScheduler, gfx: &GfxDevice) {
        let _span = tracy_client::span!("RenderGraph::build_events");

        let mut events: [Vec<RenderGraphEvent>; QueueType::COUNT] = Default::default();
        let mut waits: [Vec<Vec<EventRef>>; QueueType::COUNT] = Default::default();
        let mut pass_locations: Vec<Option<EventRef>> = vec![None; self.passes.len()];

        let mut push_event = |event: RenderGraphEvent, queue: QueueType, event_waits: Vec<EventRef>| {
            events[queue.index()].push(event);
            waits[queue.index()].push(event_waits);
            (queue, events[queue.index()].len() - 1)
        };

        for group in &self.dependency_groups {
            let mut redirected_location = None;
            if !group.redirected_barriers.is_empty() {
                let event_waits = self
                    .last_foreign_users_before(group.index, &group.redirected_resources, scheduler)
                    .into_iter()
                    .filter_map(|pass| pass_locations[pass])
                    .collect_vec();
                let event = RenderGraphEvent::RedirectedTransitions(RedirectedTransitionsEvent {
                    dependency_group: group.index,
                    barriers: group.redirected_barriers.clone(),
                    command_buffer: gfx.allocate_command_buffer(
                        QueueType::Graphics,
                        format!("redirected-transitions-{}", group.index),
                    ),
                    signal: None,
                    signals_to_wait: Vec::new(),
                });
                redirected_location = Some(push_event(event, QueueType::Graphics, event_waits));
            }

            for &pass_id in &group.passes {
                let pass = &self.passes[pass_id];
                let mut event_waits = pass.sync_passes.iter().filter_map(|&wait| pass_locations[wait]).collect_vec();
                if let Some(location) = redirected_location {
                    if pass.queue != QueueType::Graphics
                        && Self::pass_uses_any(scheduler, pass_id, &group.redirected_resources)
                    {
                        event_waits.push(location);
                    }
                }

                let barriers = &group.pass_barriers[pass.group_exec_index as usize];
                let event = RenderGraphEvent::RenderPass(RenderPassEvent {
                    pass: pass_id,
                    barriers: barriers.transitions.clone(),
                    uav_barriers: barriers.uav_barriers.clone(),
                    post_barriers: barriers.post_transitions.clone(),
                    pre_command_buffer: gfx.allocate_command_buffer(pass.queue, format!("{}-pre", pass.name)),
                    pass_command_buffer: gfx.allocate_command_buffer(pass.queue, pass.name.clone()),
                    post_command_buffer: gfx.allocate_command_buffer(pass.queue, format!("{}-post", pass.name)),
                    signal: None,
                    signals_to_wait: Vec::new(),
                });
                pass_locations[pass_id] = Some(push_event(event, pass.queue, event_waits));
            }
        }

        if !self.trailing_transitions.barriers.is_empty() {
            let event_waits = self
                .trailing_transitions
                .wait_passes
                .iter()
                .filter_map(|&pass| pass_locations[pass])
                .collect_vec();
            let event = RenderGraphEvent::RedirectedTransitions(RedirectedTransitionsEvent {
                dependency_group: self.dependency_groups.len(),
                barriers: self.trailing_transitions.barriers.clone(),
                command_buffer: gfx.allocate_command_buffer(QueueType::Graphics, "present-transitions"),
                signal: None,
                signals_to_wait: Vec::new(),
            });
            push_event(event, QueueType::Graphics, event_waits);
        }

        // 只有被等待的事件才需要 signal
        let mut signalled: [Vec<bool>; QueueType::COUNT] = QueueType::ALL.map(|q| vec![false; events[q.index()].len()]);
        for &(queue, index) in waits.iter().flatten().flatten() {
            signalled[queue.index()][index] = true;
        }

        // 按每个队列的事件顺序预留 fence 值，保证同一个 fence 上的值单调递增
        let mut signal_values: [Vec<Option<u64>>; QueueType::COUNT] = Default::default();
        for queue in QueueType::ALL {
            let fence = gfx.fence(queue);
            for (event, &needs_signal) in events[queue.index()].iter_mut().zip(&signalled[queue.index()]) {
                let value = needs_signal.then(|| fence.reserve_value());
                if let Some(value) = value {
                    event.set_signal(FenceSignal { queue, value });
                }
                signal_values[queue.index()].push(value);
            }
        }

        // 同一个 fence 只保留最大的等待值
        for queue in QueueType::ALL {
            for (event, event_waits) in events[queue.index()].iter_mut().zip(&waits[queue.index()]) {
                let mut max_values = [None::<u64>; QueueType::COUNT];
                for &(wait_queue, index) in event_waits {
                    let value = signal_values[wait_queue.index()][index];
                    max_values[wait_queue.index()] = max_values[wait_queue.index()].max(value);
                }
                let signals = QueueType::ALL
                    .into_iter()
                    .filter_map(|q| max_values[q.index()].map(|value| FenceSignal { queue: q, value }))
                    .collect_vec();
                event.set_signals_to_wait(signals);
            }
        }

        self.events = events;
    }

    /// 分组 `group_index` 之前，每个非 graphics 队列上最后一个使用了这些资源的 pass
    fn last_foreign_users_before(
        &self,
        group_index: usize,
        resources: &IndexSet<ResourceId>,
        scheduler: &ResourceScheduler,
    ) -> Vec<PassId> {
        [QueueType::Compute, QueueType::Copy]
            .into_iter()
            .filter_map(|queue| {
                self.ordered_passes.iter().rev().copied().find(|&pass_id| {
                    let pass = &self.passes[pass_id];
                    pass.dependency_group < group_index
                        && pass.queue == queue
                        && Self::pass_uses_any(scheduler, pass_id, resources)
                })
            })
            .collect_vec()
    }

    fn pass_uses_any(scheduler: &ResourceScheduler, pass_id: PassId, resources: &IndexSet<ResourceId>) -> bool {
        scheduler
            .pass_views(pass_id)
            .any(|view| resources.contains(&view.resource))
    }
}
