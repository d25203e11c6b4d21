use std::collections::HashMap;

use slotmap::SlotMap;

use crate::basic::queue_type::QueueType;
use crate::commands::command_buffer::GfxCommandBuffer;
use crate::commands::fence::GfxFence;
use crate::commands::queue::GfxQueue;
use crate::pipelines::pipeline::{GfxPipeline, PipelineDesc};
use crate::resources::handles::GfxPipelineHandle;
use crate::resources::manager::GfxResourceManager;

/// headless 图形设备
///
/// 持有三个硬件队列、每个队列一个 timeline fence，以及资源管理器和管线缓存。
/// 不使用单例，需要的地方显式传入 `&GfxDevice` / `&mut GfxDevice`。
///
/// # 使用示例
/// ```ignore
/// let mut gfx = GfxDevice::new_headless();
/// let cmd = gfx.allocate_command_buffer(QueueType::Graphics, "geometry");
/// ```
pub struct GfxDevice {
    queues: [GfxQueue; QueueType::COUNT],
    fences: [GfxFence; QueueType::COUNT],
    resource_manager: GfxResourceManager,

    pipeline_pool: SlotMap<GfxPipelineHandle, GfxPipeline>,
    pipeline_cache: HashMap<PipelineDesc, GfxPipelineHandle>,
}

// new & init
impl GfxDevice {
    pub fn new_headless() -> Self {
        // 之后的 tracy_client::span! 都要求 client 已经启动，重复调用不会重复启动
        tracy_client::Client::start();
        log::info!("create headless gfx device");
        Self {
            queues: QueueType::ALL.map(GfxQueue::new),
            fences: QueueType::ALL.map(|queue| GfxFence::new_timeline(0, Self::fence_name(queue))),
            resource_manager: GfxResourceManager::new(),
            pipeline_pool: SlotMap::with_key(),
            pipeline_cache: HashMap::new(),
        }
    }

    /// 队列 timeline fence 的名字
    pub fn fence_name(queue: QueueType) -> String {
        format!("{}-fence", queue.to_string().to_lowercase())
    }

    pub fn destroy(&mut self) {
        let _span = tracy_client::span!("GfxDevice::destroy");
        self.resource_manager.destroy_all();
        self.pipeline_cache.clear();
        self.pipeline_pool.clear();
    }
}

// getters
impl GfxDevice {
    #[inline]
    pub fn queue(&self, queue: QueueType) -> &GfxQueue {
        &self.queues[queue.index()]
    }

    #[inline]
    pub fn queue_mut(&mut self, queue: QueueType) -> &mut GfxQueue {
        &mut self.queues[queue.index()]
    }

    #[inline]
    pub fn fence(&self, queue: QueueType) -> &GfxFence {
        &self.fences[queue.index()]
    }

    #[inline]
    pub fn resource_manager(&self) -> &GfxResourceManager {
        &self.resource_manager
    }

    #[inline]
    pub fn resource_manager_mut(&mut self) -> &mut GfxResourceManager {
        &mut self.resource_manager
    }

    #[inline]
    pub fn pipeline(&self, handle: GfxPipelineHandle) -> Option<&GfxPipeline> {
        self.pipeline_pool.get(handle)
    }

    #[inline]
    pub fn pipeline_count(&self) -> usize {
        self.pipeline_pool.len()
    }
}

// commands
impl GfxDevice {
    pub fn allocate_command_buffer(&self, queue: QueueType, name: impl Into<String>) -> GfxCommandBuffer {
        GfxCommandBuffer::new(queue, name)
    }

    pub fn submit(&mut self, queue: QueueType, command_buffers: &[&GfxCommandBuffer]) {
        self.queues[queue.index()].submit(command_buffers);
    }

    /// 让 `queue` 等待 `fence_queue` 的 fence 到达 `value`
    pub fn wait(&mut self, queue: QueueType, fence_queue: QueueType, value: u64) {
        let fence = &self.fences[fence_queue.index()];
        self.queues[queue.index()].wait(fence, value);
    }

    /// 在 `queue` 上 signal `fence_queue` 的 fence
    pub fn signal(&mut self, queue: QueueType, fence_queue: QueueType, value: u64) {
        let fence = &self.fences[fence_queue.index()];
        self.queues[queue.index()].signal(fence, value);
    }
}

// pipelines
impl GfxDevice {
    /// 加载管线，相同描述只会“编译”一次
    pub fn load_pipeline(&mut self, desc: &PipelineDesc) -> GfxPipelineHandle {
        if let Some(handle) = self.pipeline_cache.get(desc) {
            return *handle;
        }

        log::debug!("compile pipeline: {}", desc.name());
        let handle = self.pipeline_pool.insert(GfxPipeline { desc: desc.clone() });
        self.pipeline_cache.insert(desc.clone(), handle);
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::pipeline::ComputePipelineDesc;

    #[test]
    fn test_pipeline_cache() {
        let mut gfx = GfxDevice::new_headless();
        let desc: PipelineDesc = ComputePipelineDesc::new("bloom", "bloom.slang", [8, 8, 1]).into();
        let a = gfx.load_pipeline(&desc);
        let b = gfx.load_pipeline(&desc);
        assert_eq!(a, b);
        assert_eq!(gfx.pipeline_count(), 1);
        assert_eq!(gfx.pipeline(a).unwrap().bind_point(), ash::vk::PipelineBindPoint::COMPUTE);
    }

    #[test]
    fn test_cross_queue_signal_and_wait() {
        let mut gfx = GfxDevice::new_headless();
        let value = gfx.fence(QueueType::Compute).reserve_value();
        gfx.signal(QueueType::Compute, QueueType::Compute, value);
        gfx.wait(QueueType::Graphics, QueueType::Compute, value);

        assert!(gfx.fence(QueueType::Compute).is_complete(value));
        assert_eq!(gfx.queue(QueueType::Graphics).stats().waits, 1);
        assert_eq!(gfx.fence(QueueType::Copy).name(), "copy-fence");
    }
}
