//! Pass 定义
//!
//! 提供 `RgPass` trait 用于声明式定义渲染 Pass，
//! 以及 graph 内部保存调度结果的 [`RenderPass`] 节点。

use ember_gfx::basic::queue_type::QueueType;

use crate::pass_builder::RenderPassBuilder;
use crate::pass_context::RenderPassContext;

/// pass 在 graph 中的下标，按 `add_pass` 的顺序分配
pub type PassId = usize;

/// RgPass trait
///
/// 定义渲染图中的一个 Pass。用户需要实现此 trait 来创建自定义 Pass。
///
/// # 示例
///
/// ```ignore
/// struct BlurPass {
///     ids: BlurIds,
/// }
///
/// impl RgPass for BlurPass {
///     fn build(&mut self, builder: &mut RenderPassBuilder) {
///         builder.read_rt(self.ids.scene_color);
///         builder.new_ua(self.ids.blurred, desc);
///         builder.set_pipeline_state_desc(ComputePipelineDesc::new("blur", "blur.slang", [8, 8, 1]));
///     }
///
///     fn execute(&self, ctx: &mut RenderPassContext) {
///         let output = ctx.get_ua(self.ids.blurred, None, None);
///         ctx.command_buffer().dispatch(glam::uvec3(64, 64, 1));
///     }
/// }
/// ```
///
/// # 线程安全
///
/// graph 在单线程中构建和录制，Pass 不需要是 Send + Sync。
pub trait RgPass {
    /// 声明 Pass 创建、读取和写入的资源，以及使用的管线
    ///
    /// 每次 `RenderGraph::build` 都会重新调用。
    fn build(&mut self, builder: &mut RenderPassBuilder);

    /// 录制 Pass 的命令
    ///
    /// 命令缓冲区已经开始录制，graph 已经绑定好管线和每帧共享数据。
    fn execute(&self, ctx: &mut RenderPassContext);
}

/// graph 中的 Pass 节点
///
/// 在组装 graph 时创建一次；调度相关的字段每次 build 重新计算。
pub struct RenderPass {
    pub(crate) id: PassId,
    pub(crate) name: String,
    /// 用户请求的队列
    pub(crate) requested_queue: QueueType,
    /// 实际执行的队列（关闭 async 队列后会回退到 graphics）
    pub(crate) queue: QueueType,

    pub(crate) pass: Box<dyn RgPass>,

    pub(crate) signal_required: bool,
    /// 需要显式等待的 pass
    pub(crate) sync_passes: Vec<PassId>,
    /// 本 pass 完成时，每个队列上保证已完成的最大队列执行序号
    pub(crate) sync_indices: [Option<u32>; QueueType::COUNT],
    pub(crate) dependency_group: usize,
    pub(crate) group_exec_index: u32,
    pub(crate) queue_exec_index: u32,
    pub(crate) global_exec_index: u32,
    /// 同一队列上紧挨着的前一个 pass
    pub(crate) prev_pass_on_queue: Option<PassId>,
}

// new & init
impl RenderPass {
    pub(crate) fn new(id: PassId, name: String, requested_queue: QueueType, queue: QueueType, pass: Box<dyn RgPass>) -> Self {
        Self {
            id,
            name,
            requested_queue,
            queue,
            pass,
            signal_required: false,
            sync_passes: Vec::new(),
            sync_indices: [None; QueueType::COUNT],
            dependency_group: 0,
            group_exec_index: 0,
            queue_exec_index: 0,
            global_exec_index: 0,
            prev_pass_on_queue: None,
        }
    }

    pub(crate) fn reset_scheduling(&mut self) {
        self.signal_required = false;
        self.sync_passes.clear();
        self.sync_indices = [None; QueueType::COUNT];
        self.dependency_group = 0;
        self.group_exec_index = 0;
        self.queue_exec_index = 0;
        self.global_exec_index = 0;
        self.prev_pass_on_queue = None;
    }
}

// getters
impl RenderPass {
    #[inline]
    pub fn id(&self) -> PassId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn requested_queue(&self) -> QueueType {
        self.requested_queue
    }

    #[inline]
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    /// 是否有其他队列上的 pass 依赖本 pass
    #[inline]
    pub fn signal_required(&self) -> bool {
        self.signal_required
    }

    #[inline]
    pub fn sync_passes(&self) -> &[PassId] {
        &self.sync_passes
    }

    #[inline]
    pub fn sync_indices(&self) -> &[Option<u32>; QueueType::COUNT] {
        &self.sync_indices
    }

    #[inline]
    pub fn dependency_group(&self) -> usize {
        self.dependency_group
    }

    #[inline]
    pub fn group_exec_index(&self) -> u32 {
        self.group_exec_index
    }

    #[inline]
    pub fn queue_exec_index(&self) -> u32 {
        self.queue_exec_index
    }

    #[inline]
    pub fn global_exec_index(&self) -> u32 {
        self.global_exec_index
    }

    #[inline]
    pub fn prev_pass_on_queue(&self) -> Option<PassId> {
        self.prev_pass_on_queue
    }
}
