//! Pass 构建器
//!
//! 在 `RgPass::build()` 中使用，是 pass 创建和引用资源的唯一途径。
//! `new_*` 创建由本 pass 产出的资源，`read_*` / `write_*` 声明对其他 pass 产出资源的视图。

use ember_gfx::gfx::GfxDevice;
use ember_gfx::pipelines::pipeline::PipelineDesc;
use ember_gfx::resources::handles::GfxTextureHandle;

use crate::pass::PassId;
use crate::resource::{SurfaceKind, TextureDesc};
use crate::resource_id::{DsId, ResourceId, ResourceIdRegistry, RtId, UaId};
use crate::resource_scheduler::ResourceScheduler;
use crate::resource_view::ResourceViewKind;

pub struct RenderPassBuilder<'a> {
    pass_id: PassId,
    pass_name: &'a str,
    scheduler: &'a mut ResourceScheduler,
    gfx: &'a mut GfxDevice,
    resource_ids: &'a ResourceIdRegistry,
}

// new & init
impl<'a> RenderPassBuilder<'a> {
    pub(crate) fn new(
        pass_id: PassId,
        pass_name: &'a str,
        scheduler: &'a mut ResourceScheduler,
        gfx: &'a mut GfxDevice,
        resource_ids: &'a ResourceIdRegistry,
    ) -> Self {
        Self {
            pass_id,
            pass_name,
            scheduler,
            gfx,
            resource_ids,
        }
    }
}

// 创建资源
impl RenderPassBuilder<'_> {
    /// 创建读写纹理，本 pass 以 UAV 写入
    pub fn new_ua(&mut self, id: UaId, desc: TextureDesc) {
        let name = self.resource_name(id.id());
        self.scheduler.create_texture(id.id(), &name, desc, self.pass_id);
        self.add_view(id.id(), ResourceViewKind::UnorderedAccess);
    }

    /// 包装外部传入的读写纹理，本 pass 以 UAV 写入
    pub fn new_external_ua(&mut self, id: UaId, texture: GfxTextureHandle) {
        let name = self.resource_name(id.id());
        let desc = self.external_desc(&name, texture);
        self.scheduler
            .create_external_texture(id.id(), &name, texture, desc, self.pass_id);
        self.add_view(id.id(), ResourceViewKind::UnorderedAccess);
    }

    /// 创建颜色目标，本 pass 以 RT 写入
    pub fn new_rt(&mut self, id: RtId, desc: TextureDesc) {
        let name = self.resource_name(id.id());
        self.scheduler
            .create_surface(id.id(), &name, SurfaceKind::RenderTarget, desc, self.pass_id);
        self.add_view(id.id(), ResourceViewKind::RenderTarget);
    }

    /// 包装外部传入的颜色目标（例如 back buffer）
    ///
    /// 描述取自外部纹理本身；graph 在最后一次使用后把它转换到 `PRESENT`。
    pub fn new_external_rt(&mut self, id: RtId, texture: GfxTextureHandle) {
        let name = self.resource_name(id.id());
        let desc = self.external_desc(&name, texture);
        self.scheduler
            .create_external_surface(id.id(), &name, SurfaceKind::RenderTarget, texture, desc, self.pass_id);
        self.add_view(id.id(), ResourceViewKind::RenderTarget);
    }

    /// 创建深度模板目标，本 pass 以可写深度使用
    pub fn new_ds(&mut self, id: DsId, desc: TextureDesc) {
        let name = self.resource_name(id.id());
        self.scheduler
            .create_surface(id.id(), &name, SurfaceKind::DepthStencil, desc, self.pass_id);
        self.add_view(id.id(), ResourceViewKind::DepthStencilRw);
    }
}

// 读写声明
impl RenderPassBuilder<'_> {
    #[inline]
    pub fn read_ua(&mut self, id: UaId) {
        self.add_view(id.id(), ResourceViewKind::ShaderResource);
    }

    #[inline]
    pub fn read_rt(&mut self, id: RtId) {
        self.add_view(id.id(), ResourceViewKind::ShaderResource);
    }

    /// `as_srv` 为 false 时以只读深度目标使用
    #[inline]
    pub fn read_ds(&mut self, id: DsId, as_srv: bool) {
        let kind = if as_srv {
            ResourceViewKind::ShaderResource
        } else {
            ResourceViewKind::DepthStencilRo
        };
        self.add_view(id.id(), kind);
    }

    #[inline]
    pub fn write_ua(&mut self, id: UaId) {
        self.add_view(id.id(), ResourceViewKind::UnorderedAccess);
    }

    #[inline]
    pub fn write_rt(&mut self, id: RtId) {
        self.add_view(id.id(), ResourceViewKind::RenderTarget);
    }

    #[inline]
    pub fn write_ds(&mut self, id: DsId) {
        self.add_view(id.id(), ResourceViewKind::DepthStencilRw);
    }

    pub fn set_pipeline_state_desc(&mut self, desc: impl Into<PipelineDesc>) {
        self.scheduler.assign_pipeline(self.pass_id, &desc.into(), self.gfx);
    }
}

// getters
impl RenderPassBuilder<'_> {
    #[inline]
    pub fn pass_id(&self) -> PassId {
        self.pass_id
    }

    #[inline]
    pub fn pass_name(&self) -> &str {
        self.pass_name
    }

    /// 本帧导入的外部纹理
    #[inline]
    pub fn imported_texture(&self, id: impl Into<ResourceId>) -> Option<GfxTextureHandle> {
        self.scheduler.imported_texture(id)
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

// tools
impl RenderPassBuilder<'_> {
    fn resource_name(&self, id: ResourceId) -> String {
        self.resource_ids
            .name(id)
            .unwrap_or_else(|| panic!("Resource {id} used by pass {} is not registered", self.pass_name))
            .to_string()
    }

    /// 外部纹理的描述取自纹理本身
    fn external_desc(&self, name: &str, texture: GfxTextureHandle) -> TextureDesc {
        self.gfx
            .resource_manager()
            .texture(texture)
            .unwrap_or_else(|| panic!("External texture of {name} is not alive"))
            .desc()
            .clone()
    }

    /// 每个资源在一个 pass 中只能有一个视图
    fn add_view(&mut self, id: ResourceId, kind: ResourceViewKind) {
        if let Some(existing) = self.scheduler.pass_view(self.pass_id, id) {
            let name = self.resource_name(id);
            match (existing.is_read_only(), kind.is_read_only()) {
                (false, true) => panic!("Resource {name} already added as an output of pass {}", self.pass_name),
                (true, false) => panic!("Resource {name} already added as an input of pass {}", self.pass_name),
                _ => panic!("Resource {name} already scheduled for pass {}", self.pass_name),
            }
        }
        self.scheduler.create_resource_view(self.pass_id, id, kind);
    }
}
