//! RenderGraph 管理的资源
//!
//! 两类资源：读写纹理（[`TextureResource`]）和渲染表面（[`RenderSurfaceResource`]，颜色或深度目标）。
//! 资源要么由 graph 创建并在帧开始时释放，要么包装外部传入的 GPU 对象（例如 swapchain 的 back buffer）。

use ember_gfx::basic::resource_state::ResourceState;
use ember_gfx::resources::handles::{GfxTextureHandle, GfxTextureViewHandle};
use ember_gfx::resources::manager::GfxResourceManager;
use ember_gfx::resources::texture::GfxTextureViewRange;
use itertools::Itertools;

pub use ember_gfx::resources::texture::{ClearValue, GfxTextureDesc as TextureDesc, TextureFlags};

use crate::pass::PassId;
use crate::resource_id::ResourceId;

/// 渲染表面的类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    RenderTarget,
    DepthStencil,
}

impl SurfaceKind {
    #[inline]
    fn required_flag(self) -> TextureFlags {
        match self {
            Self::RenderTarget => TextureFlags::RENDER_TARGET,
            Self::DepthStencil => TextureFlags::DEPTH_STENCIL,
        }
    }
}

/// 分配后得到的 GPU 对象
struct TextureAllocation {
    main: GfxTextureHandle,
    full_view: GfxTextureViewHandle,
    mip_views: Vec<GfxTextureViewHandle>,
    slice_views: Vec<GfxTextureViewHandle>,
    subresource_views: Vec<GfxTextureViewHandle>,
}

/// 读写纹理资源
pub struct TextureResource {
    id: ResourceId,
    name: String,
    desc: TextureDesc,
    producer: PassId,
    external: Option<GfxTextureHandle>,
    allocation: Option<TextureAllocation>,
}

impl TextureResource {
    pub fn new(id: ResourceId, name: impl Into<String>, desc: TextureDesc, producer: PassId) -> Self {
        Self {
            id,
            name: name.into(),
            desc,
            producer,
            external: None,
            allocation: None,
        }
    }

    pub fn new_external(
        id: ResourceId,
        name: impl Into<String>,
        texture: GfxTextureHandle,
        desc: TextureDesc,
        producer: PassId,
    ) -> Self {
        Self {
            external: Some(texture),
            ..Self::new(id, name, desc, producer)
        }
    }

    fn allocate(&mut self, rm: &mut GfxResourceManager) {
        let main = self.external.unwrap_or_else(|| rm.create_texture(&self.desc, format!("{}_MainResource", self.name)));
        let full_view = rm.create_texture_view(main, GfxTextureViewRange::Full);
        let mip_views = (0..self.desc.mip_levels)
            .map(|mip| rm.create_texture_view(main, GfxTextureViewRange::Mip(mip)))
            .collect_vec();
        let slice_views = (0..self.desc.array_size)
            .map(|slice| rm.create_texture_view(main, GfxTextureViewRange::Slice(slice)))
            .collect_vec();
        let subresource_views = subresource_views(&self.desc, main, rm);

        self.allocation = Some(TextureAllocation {
            main,
            full_view,
            mip_views,
            slice_views,
            subresource_views,
        });
    }

    fn free(&mut self, rm: &mut GfxResourceManager) {
        let Some(allocation) = self.allocation.take() else {
            return;
        };
        std::iter::once(allocation.full_view)
            .chain(allocation.mip_views)
            .chain(allocation.slice_views)
            .chain(allocation.subresource_views)
            .for_each(|view| rm.destroy_texture_view(view));
        if self.external.is_none() {
            rm.destroy_texture(allocation.main);
        }
    }

    fn view(&self, mip: Option<u32>, slice: Option<u32>) -> GfxTextureViewHandle {
        let allocation = self.allocation.as_ref().unwrap_or_else(|| panic!("Resource {} is not allocated", self.name));
        match (mip, slice) {
            (None, None) => allocation.full_view,
            (Some(mip), None) => allocation.mip_views[mip as usize],
            (None, Some(slice)) => allocation.slice_views[slice as usize],
            (Some(mip), Some(slice)) => allocation.subresource_views[self.desc.subresource_index(mip, slice) as usize],
        }
    }
}

/// 分配后得到的 GPU 对象
struct SurfaceAllocation {
    main: GfxTextureHandle,
    full_view: GfxTextureViewHandle,
    subresource_views: Vec<GfxTextureViewHandle>,
}

/// 渲染表面资源（颜色目标或深度模板目标）
pub struct RenderSurfaceResource {
    id: ResourceId,
    name: String,
    kind: SurfaceKind,
    desc: TextureDesc,
    producer: PassId,
    external: Option<GfxTextureHandle>,
    allocation: Option<SurfaceAllocation>,
}

impl RenderSurfaceResource {
    pub fn new(id: ResourceId, name: impl Into<String>, kind: SurfaceKind, desc: TextureDesc, producer: PassId) -> Self {
        let name = name.into();
        assert!(
            desc.flags.contains(kind.required_flag()),
            "Surface {name} requires {:?} flag",
            kind.required_flag()
        );
        Self {
            id,
            name,
            kind,
            desc,
            producer,
            external: None,
            allocation: None,
        }
    }

    pub fn new_external(
        id: ResourceId,
        name: impl Into<String>,
        kind: SurfaceKind,
        texture: GfxTextureHandle,
        desc: TextureDesc,
        producer: PassId,
    ) -> Self {
        Self {
            external: Some(texture),
            ..Self::new(id, name, kind, desc, producer)
        }
    }

    #[inline]
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn allocate(&mut self, rm: &mut GfxResourceManager) {
        let main = self.external.unwrap_or_else(|| rm.create_texture(&self.desc, format!("{}_MainResource", self.name)));
        let full_view = rm.create_texture_view(main, GfxTextureViewRange::Full);
        let subresource_views = subresource_views(&self.desc, main, rm);

        self.allocation = Some(SurfaceAllocation {
            main,
            full_view,
            subresource_views,
        });
    }

    fn free(&mut self, rm: &mut GfxResourceManager) {
        let Some(allocation) = self.allocation.take() else {
            return;
        };
        std::iter::once(allocation.full_view)
            .chain(allocation.subresource_views)
            .for_each(|view| rm.destroy_texture_view(view));
        if self.external.is_none() {
            rm.destroy_texture(allocation.main);
        }
    }

    fn view(&self, mip: Option<u32>, slice: Option<u32>) -> GfxTextureViewHandle {
        let allocation = self.allocation.as_ref().unwrap_or_else(|| panic!("Resource {} is not allocated", self.name));
        match (mip, slice) {
            (None, None) => allocation.full_view,
            (Some(mip), Some(slice)) => allocation.subresource_views[self.desc.subresource_index(mip, slice) as usize],
            _ => panic!("Surface {} only supports full or single subresource views", self.name),
        }
    }
}

/// 每个 (mip, slice) 一个视图，下标为 `mip + slice * mip_levels`
fn subresource_views(
    desc: &TextureDesc,
    main: GfxTextureHandle,
    rm: &mut GfxResourceManager,
) -> Vec<GfxTextureViewHandle> {
    (0..desc.array_size)
        .cartesian_product(0..desc.mip_levels)
        .map(|(slice, mip)| rm.create_texture_view(main, GfxTextureViewRange::Subresource { mip, slice }))
        .collect_vec()
}

/// RenderGraph 资源
pub enum Resource {
    Texture(TextureResource),
    Surface(RenderSurfaceResource),
}

// getters
impl Resource {
    #[inline]
    pub fn id(&self) -> ResourceId {
        match self {
            Self::Texture(r) => r.id,
            Self::Surface(r) => r.id,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        match self {
            Self::Texture(r) => &r.name,
            Self::Surface(r) => &r.name,
        }
    }

    #[inline]
    pub fn desc(&self) -> &TextureDesc {
        match self {
            Self::Texture(r) => &r.desc,
            Self::Surface(r) => &r.desc,
        }
    }

    /// 创建该资源的 pass
    #[inline]
    pub fn producer(&self) -> PassId {
        match self {
            Self::Texture(r) => r.producer,
            Self::Surface(r) => r.producer,
        }
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        match self {
            Self::Texture(r) => r.external.is_some(),
            Self::Surface(r) => r.external.is_some(),
        }
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        match self {
            Self::Texture(r) => r.allocation.is_some(),
            Self::Surface(r) => r.allocation.is_some(),
        }
    }

    /// 主对象（覆盖全部 subresource 的 GPU 纹理）
    #[inline]
    pub fn main_texture(&self) -> Option<GfxTextureHandle> {
        match self {
            Self::Texture(r) => r.allocation.as_ref().map(|a| a.main),
            Self::Surface(r) => r.allocation.as_ref().map(|a| a.main),
        }
    }

    /// 获取视图；`None` 表示全部 mip 或全部 slice
    pub fn view(&self, mip: Option<u32>, slice: Option<u32>) -> GfxTextureViewHandle {
        match self {
            Self::Texture(r) => r.view(mip, slice),
            Self::Surface(r) => r.view(mip, slice),
        }
    }
}

// allocate & free
impl Resource {
    pub fn allocate(&mut self, rm: &mut GfxResourceManager) {
        assert!(!self.is_allocated(), "Resource {} is already allocated", self.name());
        match self {
            Self::Texture(r) => r.allocate(rm),
            Self::Surface(r) => r.allocate(rm),
        }
    }

    pub fn free(&mut self, rm: &mut GfxResourceManager) {
        match self {
            Self::Texture(r) => r.free(rm),
            Self::Surface(r) => r.free(rm),
        }
    }
}

// 隐式状态转换
impl Resource {
    /// 处于 `state` 时，能否在提交边界隐式退回 `COMMON`
    #[inline]
    pub fn can_decay_to_common_from(&self, state: ResourceState) -> bool {
        state.intersects(ResourceState::NON_PIXEL_SHADER_READ | ResourceState::PIXEL_SHADER_READ | ResourceState::COPY_SOURCE)
    }

    /// 能否从 `COMMON` 隐式提升到 `state`
    #[inline]
    pub fn can_promote_from_common_to(&self, state: ResourceState) -> bool {
        state.intersects(
            ResourceState::NON_PIXEL_SHADER_READ
                | ResourceState::PIXEL_SHADER_READ
                | ResourceState::COPY_SOURCE
                | ResourceState::COPY_DESTINATION,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk;

    fn bloom_desc() -> TextureDesc {
        TextureDesc::new_2d(vk::Format::R16G16B16A16_SFLOAT, 64, 64)
            .with_mip_levels(3)
            .with_array_size(2)
            .with_flags(TextureFlags::UNORDERED_ACCESS | TextureFlags::SHADER_RESOURCE)
    }

    #[test]
    fn test_texture_allocation_creates_all_views() {
        let mut rm = GfxResourceManager::new();
        let mut resource = Resource::Texture(TextureResource::new(ResourceId::INVALID, "Bloom", bloom_desc(), 0));
        resource.allocate(&mut rm);

        // full + 3 mips + 2 slices + 6 subresources
        assert_eq!(rm.texture_count(), 1);
        assert_eq!(rm.texture_view_count(), 12);

        let mip1 = resource.view(Some(1), None);
        assert_eq!(rm.texture_view(mip1).unwrap().range(), GfxTextureViewRange::Mip(1));
        let sub = resource.view(Some(2), Some(1));
        assert_eq!(
            rm.texture_view(sub).unwrap().range(),
            GfxTextureViewRange::Subresource { mip: 2, slice: 1 }
        );

        resource.free(&mut rm);
        assert!(!resource.is_allocated());
        assert_eq!(rm.texture_count(), 0);
        assert_eq!(rm.texture_view_count(), 0);
    }

    #[test]
    fn test_external_surface_keeps_main_object() {
        let mut rm = GfxResourceManager::new();
        let desc = TextureDesc::new_2d(vk::Format::B8G8R8A8_UNORM, 8, 8).with_flags(TextureFlags::RENDER_TARGET);
        let back_buffer = rm.create_texture(&desc, "BackBuffer");

        let mut resource = Resource::Surface(RenderSurfaceResource::new_external(
            ResourceId::INVALID,
            "FinalOutput",
            SurfaceKind::RenderTarget,
            back_buffer,
            desc,
            3,
        ));
        resource.allocate(&mut rm);
        assert!(resource.is_external());
        assert_eq!(resource.main_texture(), Some(back_buffer));
        assert_eq!(resource.producer(), 3);

        resource.free(&mut rm);
        assert_eq!(rm.texture_count(), 1);
        assert_eq!(rm.texture_view_count(), 0);
    }

    #[test]
    #[should_panic(expected = "requires")]
    fn test_surface_requires_flag() {
        let desc = TextureDesc::new_2d(vk::Format::D32_SFLOAT, 8, 8).with_flags(TextureFlags::SHADER_RESOURCE);
        RenderSurfaceResource::new(ResourceId::INVALID, "SceneDepth", SurfaceKind::DepthStencil, desc, 0);
    }

    #[test]
    #[should_panic(expected = "only supports full or single subresource views")]
    fn test_surface_mip_view() {
        let mut rm = GfxResourceManager::new();
        let desc = TextureDesc::new_2d(vk::Format::R8G8B8A8_UNORM, 8, 8).with_flags(TextureFlags::RENDER_TARGET);
        let mut resource =
            Resource::Surface(RenderSurfaceResource::new(ResourceId::INVALID, "Color", SurfaceKind::RenderTarget, desc, 0));
        resource.allocate(&mut rm);
        resource.view(Some(0), None);
    }

    #[test]
    fn test_decay_and_promote_policy() {
        let desc = TextureDesc::default();
        let resource = Resource::Texture(TextureResource::new(ResourceId::INVALID, "T", desc, 0));
        assert!(resource.can_decay_to_common_from(ResourceState::PIXEL_SHADER_READ));
        assert!(!resource.can_decay_to_common_from(ResourceState::RENDER_TARGET));
        assert!(resource.can_promote_from_common_to(ResourceState::COPY_DESTINATION));
        assert!(!resource.can_promote_from_common_to(ResourceState::UNORDERED_ACCESS));
    }
}
