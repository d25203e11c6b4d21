use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::commands::command_buffer::GfxCommandBuffer;
use ember_gfx::gfx::GfxDevice;
use ember_gfx::resources::handles::{GfxTextureHandle, GfxTextureViewHandle};

use crate::frame_data::FrameResources;
use crate::pass::PassId;
use crate::resource::Resource;
use crate::resource_id::{DsId, ResourceId, RtId, UaId};
use crate::resource_scheduler::ResourceScheduler;
use crate::resource_view::ResourceViewKind;

/// Pass 执行时的上下文
///
/// 把 pass 在 build 阶段声明的视图解析为具体的 GPU 视图，并提供命令缓冲区。
/// `mip` / `slice` 为 `None` 时表示全部 mip 或全部 slice。
pub struct RenderPassContext<'a> {
    pass_id: PassId,
    pass_name: &'a str,
    queue: QueueType,
    cmd: &'a mut GfxCommandBuffer,
    scheduler: &'a ResourceScheduler,
    gfx: &'a GfxDevice,
}

// new & init
impl<'a> RenderPassContext<'a> {
    pub(crate) fn new(
        pass_id: PassId,
        pass_name: &'a str,
        queue: QueueType,
        cmd: &'a mut GfxCommandBuffer,
        scheduler: &'a ResourceScheduler,
        gfx: &'a GfxDevice,
    ) -> Self {
        Self {
            pass_id,
            pass_name,
            queue,
            cmd,
            scheduler,
            gfx,
        }
    }
}

// 视图查询
impl RenderPassContext<'_> {
    #[inline]
    pub fn get_ua(&self, id: UaId, mip: Option<u32>, slice: Option<u32>) -> GfxTextureViewHandle {
        self.declared(id.id(), ResourceViewKind::UnorderedAccess).view(mip, slice)
    }

    #[inline]
    pub fn get_rt(&self, id: RtId, mip: Option<u32>, slice: Option<u32>) -> GfxTextureViewHandle {
        self.declared(id.id(), ResourceViewKind::RenderTarget).view(mip, slice)
    }

    #[inline]
    pub fn get_ds_rw(&self, id: DsId, mip: Option<u32>, slice: Option<u32>) -> GfxTextureViewHandle {
        self.declared(id.id(), ResourceViewKind::DepthStencilRw).view(mip, slice)
    }

    #[inline]
    pub fn get_ds_ro(&self, id: DsId, mip: Option<u32>, slice: Option<u32>) -> GfxTextureViewHandle {
        self.declared(id.id(), ResourceViewKind::DepthStencilRo).view(mip, slice)
    }

    /// 只读着色器视图，三种 id 都可以使用
    #[inline]
    pub fn get_sr(&self, id: impl Into<ResourceId>, mip: Option<u32>, slice: Option<u32>) -> GfxTextureViewHandle {
        self.declared(id.into(), ResourceViewKind::ShaderResource).view(mip, slice)
    }

    /// 资源的主对象，用于 copy 之类不需要视图的命令
    pub fn get_texture(&self, id: impl Into<ResourceId>) -> GfxTextureHandle {
        let id = id.into();
        let view = self
            .scheduler
            .pass_view(self.pass_id, id)
            .unwrap_or_else(|| panic!("Resource {id} is not scheduled for pass {}", self.pass_name));
        let resource = self.resource(view.resource);
        resource
            .main_texture()
            .unwrap_or_else(|| panic!("Resource {} is not allocated", resource.name()))
    }

    fn declared(&self, id: ResourceId, kind: ResourceViewKind) -> &Resource {
        let view = self.scheduler.pass_view(self.pass_id, id);
        let resource = self.resource(id);
        match view {
            Some(view) if view.kind == kind => resource,
            Some(view) => panic!(
                "View type mismatch: pass {} declared {:?} for {}, requested {:?}",
                self.pass_name,
                view.kind,
                resource.name(),
                kind
            ),
            None => panic!("No {kind:?} view of {} declared by pass {}", resource.name(), self.pass_name),
        }
    }

    fn resource(&self, id: ResourceId) -> &Resource {
        self.scheduler
            .resource(id)
            .unwrap_or_else(|| panic!("Resource {id} used by pass {} does not exist", self.pass_name))
    }
}

// getters
impl RenderPassContext<'_> {
    #[inline]
    pub fn pass_id(&self) -> PassId {
        self.pass_id
    }

    #[inline]
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    #[inline]
    pub fn queue(&self) -> QueueType {
        self.queue
    }

    #[inline]
    pub fn command_buffer(&mut self) -> &mut GfxCommandBuffer {
        self.cmd
    }

    #[inline]
    pub fn frame_resources(&self) -> Option<&FrameResources> {
        self.scheduler.frame_resources()
    }

    #[inline]
    pub fn viewport_size(&self) -> glam::UVec2 {
        self.scheduler.viewport_size()
    }

    #[inline]
    pub fn gfx(&self) -> &GfxDevice {
        self.gfx
    }
}
