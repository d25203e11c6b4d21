use ash::vk;

use crate::basic::resource_state::ResourceState;
use crate::resources::handles::GfxTextureHandle;
use crate::resources::texture::GfxTextureDesc;

/// 状态转换 barrier
///
/// `subresource` 为 `None` 时覆盖全部 subresource。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionBarrier {
    /// 资源名称，仅用于调试输出
    pub resource: String,
    pub texture: GfxTextureHandle,
    pub before: ResourceState,
    pub after: ResourceState,
    pub subresource: Option<u32>,
}

impl TransitionBarrier {
    /// 转换为 Vulkan 的 image barrier
    pub fn to_image_barrier(&self, desc: &GfxTextureDesc) -> GfxImageBarrier {
        let before = self.before.to_vk();
        let after = self.after.to_vk();
        let new_layout = if self.after == ResourceState::PRESENT {
            ResourceState::present_layout()
        } else {
            after.layout
        };

        let barrier = GfxImageBarrier::new()
            .layout_transfer(before.layout, new_layout)
            .src_mask(before.stage, before.access)
            .dst_mask(after.stage, after.access)
            .image_aspect_flag(desc.aspect());

        match self.subresource {
            None => barrier.subresource_range(0, desc.mip_levels, 0, desc.array_size),
            Some(index) => {
                let mip = index % desc.mip_levels;
                let slice = index / desc.mip_levels;
                barrier.subresource_range(mip, 1, slice, 1)
            }
        }
    }
}

/// 同一状态（UNORDERED_ACCESS）下的读写 hazard barrier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UavBarrier {
    pub resource: String,
    pub texture: GfxTextureHandle,
}

/// 两个资源共享同一块内存时的 aliasing barrier
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AliasingBarrier {
    pub before: Option<GfxTextureHandle>,
    pub after: Option<GfxTextureHandle>,
}

/// 便捷创建 image memory barrier 的结构体
#[derive(Clone, Copy, Debug)]
pub struct GfxImageBarrier {
    inner: vk::ImageMemoryBarrier2<'static>,
}

impl Default for GfxImageBarrier {
    fn default() -> Self {
        Self {
            inner: vk::ImageMemoryBarrier2 {
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::UNDEFINED,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::empty(),
                    base_array_layer: 0,
                    layer_count: 1,
                    base_mip_level: 0,
                    level_count: 1,
                },
                ..Default::default()
            },
        }
    }
}

impl GfxImageBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inner(&self) -> &vk::ImageMemoryBarrier2<'_> {
        &self.inner
    }

    /// builder
    #[inline]
    pub fn layout_transfer(mut self, old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Self {
        self.inner.old_layout = old_layout;
        self.inner.new_layout = new_layout;
        self
    }

    /// builder
    #[inline]
    pub fn src_mask(mut self, src_stage_mask: vk::PipelineStageFlags2, src_access_mask: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = src_stage_mask;
        self.inner.src_access_mask = src_access_mask;
        self
    }

    /// builder
    #[inline]
    pub fn dst_mask(mut self, dst_stage_mask: vk::PipelineStageFlags2, dst_access_mask: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = dst_stage_mask;
        self.inner.dst_access_mask = dst_access_mask;
        self
    }

    /// builder
    #[inline]
    pub fn image_aspect_flag(mut self, aspect_mask: vk::ImageAspectFlags) -> Self {
        self.inner.subresource_range.aspect_mask = aspect_mask;
        self
    }

    /// builder
    #[inline]
    pub fn subresource_range(mut self, base_mip: u32, level_count: u32, base_layer: u32, layer_count: u32) -> Self {
        self.inner.subresource_range.base_mip_level = base_mip;
        self.inner.subresource_range.level_count = level_count;
        self.inner.subresource_range.base_array_layer = base_layer;
        self.inner.subresource_range.layer_count = layer_count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::texture::TextureFlags;

    fn barrier(after: ResourceState, subresource: Option<u32>) -> TransitionBarrier {
        TransitionBarrier {
            resource: "SceneColor".to_string(),
            texture: GfxTextureHandle::default(),
            before: ResourceState::RENDER_TARGET,
            after,
            subresource,
        }
    }

    #[test]
    fn test_full_range_barrier() {
        let desc = GfxTextureDesc::new_2d(vk::Format::R16G16B16A16_SFLOAT, 16, 16)
            .with_mip_levels(3)
            .with_flags(TextureFlags::RENDER_TARGET);
        let image_barrier = barrier(ResourceState::PIXEL_SHADER_READ, None).to_image_barrier(&desc);
        let inner = image_barrier.inner();
        assert_eq!(inner.old_layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert_eq!(inner.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(inner.subresource_range.level_count, 3);
        assert_eq!(inner.subresource_range.aspect_mask, vk::ImageAspectFlags::COLOR);
        assert_eq!(inner.dst_stage_mask, vk::PipelineStageFlags2::FRAGMENT_SHADER);
    }

    #[test]
    fn test_single_subresource_barrier() {
        let desc = GfxTextureDesc::new_2d(vk::Format::D32_SFLOAT, 16, 16)
            .with_mip_levels(2)
            .with_array_size(4);
        // index 5 = mip 1, slice 2
        let image_barrier = barrier(ResourceState::DEPTH_WRITE, Some(5)).to_image_barrier(&desc);
        let range = image_barrier.inner().subresource_range;
        assert_eq!((range.base_mip_level, range.level_count), (1, 1));
        assert_eq!((range.base_array_layer, range.layer_count), (2, 1));
        assert_eq!(range.aspect_mask, vk::ImageAspectFlags::DEPTH);
    }

    #[test]
    fn test_present_layout() {
        let desc = GfxTextureDesc::new_2d(vk::Format::B8G8R8A8_UNORM, 8, 8);
        let image_barrier = barrier(ResourceState::PRESENT, None).to_image_barrier(&desc);
        assert_eq!(image_barrier.inner().new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }
}
