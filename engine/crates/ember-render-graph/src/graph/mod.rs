//! RenderGraph 主体
//!
//! 每次 [`RenderGraph::build`] 依次执行：
//! 1. 调用所有 pass 的 `build`，填充资源表与视图表
//! 2. 根据资源的 producer 以及同一资源上的读写顺序构建邻接表
//! 3. 拓扑排序，按最长路径划分依赖分组，计算执行序号（`order.rs`）
//! 4. 计算最少的跨队列等待（`sync.rs`）
//! 5. 规划 barrier，队列不支持的转换重定向到 graphics 队列（`transitions.rs`）
//! 6. 组装每个队列的事件列表并预留 fence 值（`events.rs`）
//!
//! [`RenderGraph::execute`] 录制所有命令缓冲并按队列提交（`execute.rs`）。

mod debug;
mod events;
mod execute;
mod order;
mod sync;
mod transitions;


use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::commands::barrier::{TransitionBarrier, UavBarrier};
use ember_gfx::gfx::GfxDevice;
use ember_gfx::resources::handles::GfxTextureHandle;
use indexmap::IndexSet;

pub use events::{FenceSignal, RedirectedTransitionsEvent, RenderGraphEvent, RenderPassEvent};

use crate::config::RenderGraphConfig;
use crate::pass::{PassId, RenderPass, RgPass};
use crate::pass_builder::RenderPassBuilder;
use crate::resource_id::{ResourceId, ResourceIdRegistry};
use crate::resource_scheduler::ResourceScheduler;

/// 一个 pass 在执行前后需要的 barrier
#[derive(Clone, Debug, Default)]
pub struct PassBarriers {
    pub transitions: Vec<TransitionBarrier>,
    pub uav_barriers: Vec<UavBarrier>,
    /// 执行后的转换（目前只有外部资源到 `PRESENT` 的转换）
    pub post_transitions: Vec<TransitionBarrier>,
}

/// 依赖分组
///
/// 分组下标等于从任意根 pass 出发到该 pass 的最长路径长度，
/// 同一分组内的 pass 之间没有依赖，可以在不同队列上并行。
#[derive(Debug, Default)]
pub struct DependencyGroup {
    pub(crate) index: usize,
    /// 按 pass id 升序
    pub(crate) passes: Vec<PassId>,
    pub(crate) passes_per_queue: [Vec<PassId>; QueueType::COUNT],

    pub(crate) resources_read_by_multiple_queues: IndexSet<ResourceId>,
    pub(crate) queues_involved_in_multi_queue_reads: IndexSet<QueueType>,

    /// 以组内执行序号为下标
    pub(crate) pass_barriers: Vec<PassBarriers>,
    pub(crate) redirected_barriers: Vec<TransitionBarrier>,
    pub(crate) redirected_resources: IndexSet<ResourceId>,
}

impl DependencyGroup {
    fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn passes(&self) -> &[PassId] {
        &self.passes
    }

    #[inline]
    pub fn passes_on_queue(&self, queue: QueueType) -> &[PassId] {
        &self.passes_per_queue[queue.index()]
    }

    #[inline]
    pub fn resources_read_by_multiple_queues(&self) -> &IndexSet<ResourceId> {
        &self.resources_read_by_multiple_queues
    }

    #[inline]
    pub fn queues_involved_in_multi_queue_reads(&self) -> &IndexSet<QueueType> {
        &self.queues_involved_in_multi_queue_reads
    }

    #[inline]
    pub fn pass_barriers(&self, group_exec_index: u32) -> &PassBarriers {
        &self.pass_barriers[group_exec_index as usize]
    }

    #[inline]
    pub fn redirected_barriers(&self) -> &[TransitionBarrier] {
        &self.redirected_barriers
    }

    #[inline]
    pub fn redirected_resources(&self) -> &IndexSet<ResourceId> {
        &self.redirected_resources
    }
}

/// 资源在本帧中的使用区间（全局执行序号，闭区间）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLifetime {
    pub first: u32,
    pub last: u32,
    /// 最后一次使用该资源的 pass
    pub last_user: PassId,
}

/// 所有分组之后执行的重定向转换（外部资源转换到 `PRESENT`）
#[derive(Debug, Default)]
pub(crate) struct TrailingTransitions {
    pub(crate) barriers: Vec<TransitionBarrier>,
    /// 需要先完成的非 graphics 队列上的 pass
    pub(crate) wait_passes: Vec<PassId>,
}

pub struct RenderGraph {
    config: RenderGraphConfig,
    resource_ids: ResourceIdRegistry,
    passes: Vec<RenderPass>,

    // 以下字段每次 build 重新计算
    adjacency: Vec<Vec<PassId>>,
    ordered_passes: Vec<PassId>,
    dependency_groups: Vec<DependencyGroup>,
    resource_lifetimes: Vec<Option<ResourceLifetime>>,
    trailing_transitions: TrailingTransitions,
    events: [Vec<RenderGraphEvent>; QueueType::COUNT],
    built: bool,
}

// new & init
impl RenderGraph {
    pub fn new(config: RenderGraphConfig) -> Self {
        Self {
            config,
            resource_ids: ResourceIdRegistry::new(),
            passes: Vec::new(),
            adjacency: Vec::new(),
            ordered_passes: Vec::new(),
            dependency_groups: Vec::new(),
            resource_lifetimes: Vec::new(),
            trailing_transitions: TrailingTransitions::default(),
            events: Default::default(),
            built: false,
        }
    }

    /// 添加 pass，返回其 id
    ///
    /// 关闭 async 队列时，请求该队列的 pass 会在 graphics 队列上执行。
    pub fn add_pass<P: RgPass + 'static>(&mut self, name: impl Into<String>, queue: QueueType, pass: P) -> PassId {
        let id = self.passes.len();
        let name = name.into();
        let effective_queue = self.config.effective_queue(queue);
        if effective_queue != queue {
            log::debug!("pass {name} requested {queue} queue, scheduled on {effective_queue}");
        }

        self.passes
            .push(RenderPass::new(id, name, queue, effective_queue, Box::new(pass)));
        self.built = false;
        id
    }

    /// 移除所有 pass 和调度结果，资源 id 保持注册
    pub fn reset(&mut self) {
        self.passes.clear();
        self.clear_schedule();
    }

    fn clear_schedule(&mut self) {
        self.adjacency.clear();
        self.ordered_passes.clear();
        self.dependency_groups.clear();
        self.resource_lifetimes.clear();
        self.trailing_transitions = TrailingTransitions::default();
        self.events.iter_mut().for_each(Vec::clear);
        self.passes.iter_mut().for_each(RenderPass::reset_scheduling);
        self.built = false;
    }
}

// build
impl RenderGraph {
    /// 重新声明资源并重新计算整个调度
    ///
    /// 配置错误（资源不存在、重复声明、依赖成环）会直接 panic。
    pub fn build(&mut self, scheduler: &mut ResourceScheduler, gfx: &mut GfxDevice) {
        let _span = tracy_client::span!("RenderGraph::build");

        self.clear_schedule();
        self.build_resources(scheduler, gfx);
        self.build_adjacency(scheduler);
        self.build_dependency_groups();
        self.build_sync_plan();
        self.build_transitions(scheduler);
        self.build_events(scheduler, gfx);
        self.built = true;

        log::debug!(
            "render graph built: {} passes, {} dependency groups, events [{}]",
            self.passes.len(),
            self.dependency_groups.len(),
            QueueType::ALL
                .iter()
                .map(|queue| format!("{queue}: {}", self.events[queue.index()].len()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        if self.config.print_execution_plan {
            self.print_execution_plan(scheduler);
        }
    }

    fn build_resources(&mut self, scheduler: &mut ResourceScheduler, gfx: &mut GfxDevice) {
        let _span = tracy_client::span!("RenderGraph::build_resources");

        scheduler.begin_scheduling(self.passes.len(), self.resource_ids.slot_count(), gfx);

        let Self {
            passes, resource_ids, ..
        } = self;
        for pass in passes.iter_mut() {
            let mut builder = RenderPassBuilder::new(pass.id, &pass.name, scheduler, gfx, resource_ids);
            pass.pass.build(&mut builder);
        }

        // 所有 pass 都声明完毕后再检查，pass 的添加顺序不影响结果
        for pass in passes.iter() {
            for view in scheduler.pass_views(pass.id) {
                assert!(
                    scheduler.resource(view.resource).is_some(),
                    "Resource {} used by pass {} does not exist",
                    resource_ids.name(view.resource).unwrap_or("<unregistered>"),
                    pass.name
                );
            }
        }

        scheduler.end_scheduling(gfx);
    }
}

// getters
impl RenderGraph {
    #[inline]
    pub fn config(&self) -> &RenderGraphConfig {
        &self.config
    }

    #[inline]
    pub fn resource_ids(&self) -> &ResourceIdRegistry {
        &self.resource_ids
    }

    #[inline]
    pub fn resource_ids_mut(&mut self) -> &mut ResourceIdRegistry {
        &mut self.resource_ids
    }

    #[inline]
    pub fn pass(&self, id: PassId) -> &RenderPass {
        &self.passes[id]
    }

    #[inline]
    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// pass 的直接后继
    #[inline]
    pub fn successors(&self, id: PassId) -> &[PassId] {
        &self.adjacency[id]
    }

    /// 最终执行顺序：按分组升序，组内按 pass id 升序
    #[inline]
    pub fn ordered_passes(&self) -> &[PassId] {
        &self.ordered_passes
    }

    #[inline]
    pub fn dependency_groups(&self) -> &[DependencyGroup] {
        &self.dependency_groups
    }

    #[inline]
    pub fn events(&self, queue: QueueType) -> &[RenderGraphEvent] {
        &self.events[queue.index()]
    }

    #[inline]
    pub fn resource_lifetime(&self, id: impl Into<ResourceId>) -> Option<ResourceLifetime> {
        self.resource_lifetimes.get(id.into().index()).copied().flatten()
    }

    /// 最后一个 pass 的最后一个输出，即本帧的最终图像
    pub fn final_output(&self, scheduler: &ResourceScheduler) -> Option<GfxTextureHandle> {
        let last_pass = *self.ordered_passes.last()?;
        let view = scheduler.pass_outputs(last_pass).last()?;
        scheduler.resource(view.resource)?.main_texture()
    }
}
