use ash::vk;

use crate::basic::resource_state::ResourceState;
use crate::resources::handles::GfxTextureHandle;

bitflags::bitflags! {
    /// 纹理的用途
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TextureFlags: u32 {
        const SHADER_RESOURCE = 1 << 0;
        const UNORDERED_ACCESS = 1 << 1;
        const RENDER_TARGET = 1 << 2;
        const DEPTH_STENCIL = 1 << 3;
    }
}

impl TextureFlags {
    /// 映射为 Vulkan 的 image usage
    pub fn to_vk_usage(self) -> vk::ImageUsageFlags {
        let mut usage = vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::TRANSFER_DST;
        if self.contains(Self::SHADER_RESOURCE) {
            usage |= vk::ImageUsageFlags::SAMPLED;
        }
        if self.contains(Self::UNORDERED_ACCESS) {
            usage |= vk::ImageUsageFlags::STORAGE;
        }
        if self.contains(Self::RENDER_TARGET) {
            usage |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
        }
        if self.contains(Self::DEPTH_STENCIL) {
            usage |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
        }
        usage
    }
}

/// 清屏值
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    Color(glam::Vec4),
    DepthStencil { depth: f32, stencil: u32 },
}

impl Default for ClearValue {
    fn default() -> Self {
        Self::Color(glam::Vec4::ZERO)
    }
}

impl ClearValue {
    #[inline]
    pub fn color(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self::Color(glam::vec4(r, g, b, a))
    }

    #[inline]
    pub fn depth(depth: f32, stencil: u32) -> Self {
        Self::DepthStencil { depth, stencil }
    }
}

/// 纹理描述
#[derive(Clone, Debug, PartialEq)]
pub struct GfxTextureDesc {
    pub format: vk::Format,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub mip_levels: u32,
    pub array_size: u32,
    pub flags: TextureFlags,
    pub clear_value: ClearValue,
    /// 创建后纹理所处的状态，也是每帧调度开始时的状态
    pub initial_state: ResourceState,
}

impl Default for GfxTextureDesc {
    fn default() -> Self {
        Self {
            format: vk::Format::R8G8B8A8_UNORM,
            width: 1,
            height: 1,
            depth: 1,
            mip_levels: 1,
            array_size: 1,
            flags: TextureFlags::SHADER_RESOURCE,
            clear_value: ClearValue::default(),
            initial_state: ResourceState::COMMON,
        }
    }
}

// new & builder
impl GfxTextureDesc {
    /// 创建 2D 纹理描述
    #[inline]
    pub fn new_2d(format: vk::Format, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_flags(mut self, flags: TextureFlags) -> Self {
        self.flags = flags;
        self
    }

    #[inline]
    pub fn with_mip_levels(mut self, mip_levels: u32) -> Self {
        self.mip_levels = mip_levels.max(1);
        self
    }

    #[inline]
    pub fn with_array_size(mut self, array_size: u32) -> Self {
        self.array_size = array_size.max(1);
        self
    }

    #[inline]
    pub fn with_clear_value(mut self, clear_value: ClearValue) -> Self {
        self.clear_value = clear_value;
        self
    }

    #[inline]
    pub fn with_initial_state(mut self, initial_state: ResourceState) -> Self {
        self.initial_state = initial_state;
        self
    }
}

// getters
impl GfxTextureDesc {
    #[inline]
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.array_size
    }

    /// subresource 下标：`mip + slice * mip_levels`
    #[inline]
    pub fn subresource_index(&self, mip: u32, slice: u32) -> u32 {
        assert!(mip < self.mip_levels && slice < self.array_size, "Subresource ({mip}, {slice}) out of range");
        mip + slice * self.mip_levels
    }

    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        Self::infer_aspect(self.format)
    }

    /// 从格式推断 aspect
    pub fn infer_aspect(format: vk::Format) -> vk::ImageAspectFlags {
        match format {
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
                vk::ImageAspectFlags::DEPTH
            }
            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
            vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::COLOR,
        }
    }
}

/// 纹理视图覆盖的范围
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxTextureViewRange {
    /// 全部 mip 与 slice
    Full,
    /// 单个 mip，覆盖全部 slice
    Mip(u32),
    /// 单个 slice，覆盖全部 mip
    Slice(u32),
    /// 单个 (mip, slice)
    Subresource { mip: u32, slice: u32 },
}

/// headless 纹理对象
#[derive(Clone, Debug)]
pub struct GfxTexture {
    pub(crate) desc: GfxTextureDesc,
    pub(crate) name: String,
}

impl GfxTexture {
    #[inline]
    pub fn desc(&self) -> &GfxTextureDesc {
        &self.desc
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// headless 纹理视图对象
#[derive(Clone, Debug)]
pub struct GfxTextureView {
    pub(crate) texture: GfxTextureHandle,
    pub(crate) range: GfxTextureViewRange,
}

impl GfxTextureView {
    #[inline]
    pub fn texture(&self) -> GfxTextureHandle {
        self.texture
    }

    #[inline]
    pub fn range(&self) -> GfxTextureViewRange {
        self.range
    }
}
