use ash::vk;
use slotmap::{SecondaryMap, SlotMap};

use crate::resources::buffer::GfxBuffer;
use crate::resources::handles::{GfxBufferHandle, GfxTextureHandle, GfxTextureViewHandle};
use crate::resources::texture::{GfxTexture, GfxTextureDesc, GfxTextureView, GfxTextureViewRange};

/// 资源管理器
///
/// 使用 SlotMap 存储 headless 的纹理、纹理视图和 buffer，对外提供轻量级的 Handle。
/// 销毁纹理时会一并销毁基于它创建的视图。
#[derive(Default)]
pub struct GfxResourceManager {
    texture_pool: SlotMap<GfxTextureHandle, GfxTexture>,
    texture_view_pool: SlotMap<GfxTextureViewHandle, GfxTextureView>,
    buffer_pool: SlotMap<GfxBufferHandle, GfxBuffer>,

    /// 用于缓存：TextureHandle -> 所有关联的 TextureViewHandle
    texture_to_views: SecondaryMap<GfxTextureHandle, Vec<GfxTextureViewHandle>>,
}

// new & init
impl GfxResourceManager {
    pub fn new() -> Self {
        Self::default()
    }
}

// destroy
impl GfxResourceManager {
    pub fn destroy_all(&mut self) {
        let _span = tracy_client::span!("GfxResourceManager::destroy_all");

        log::debug!(
            "destroy all resources: {} textures, {} views, {} buffers",
            self.texture_pool.len(),
            self.texture_view_pool.len(),
            self.buffer_pool.len()
        );
        self.texture_view_pool.clear();
        self.texture_to_views.clear();
        self.texture_pool.clear();
        self.buffer_pool.clear();
    }
}

// Texture API
impl GfxResourceManager {
    pub fn create_texture(&mut self, desc: &GfxTextureDesc, name: impl Into<String>) -> GfxTextureHandle {
        let name = name.into();
        log::trace!(
            "create texture: {name}, {}x{}, mips: {}, slices: {}, format: {:?}",
            desc.width,
            desc.height,
            desc.mip_levels,
            desc.array_size,
            desc.format
        );
        let handle = self.texture_pool.insert(GfxTexture {
            desc: desc.clone(),
            name,
        });
        self.texture_to_views.insert(handle, Vec::new());
        handle
    }

    pub fn destroy_texture(&mut self, handle: GfxTextureHandle) {
        if let Some(views) = self.texture_to_views.remove(handle) {
            for view in views {
                self.texture_view_pool.remove(view);
            }
        }
        if let Some(texture) = self.texture_pool.remove(handle) {
            log::trace!("destroy texture: {}", texture.name);
        }
    }

    #[inline]
    pub fn texture(&self, handle: GfxTextureHandle) -> Option<&GfxTexture> {
        self.texture_pool.get(handle)
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.texture_pool.len()
    }
}

// Texture View API
impl GfxResourceManager {
    pub fn create_texture_view(&mut self, texture: GfxTextureHandle, range: GfxTextureViewRange) -> GfxTextureViewHandle {
        let desc = &self
            .texture_pool
            .get(texture)
            .unwrap_or_else(|| panic!("Texture view created on destroyed texture {texture:?}"))
            .desc;
        match range {
            GfxTextureViewRange::Full => {}
            GfxTextureViewRange::Mip(mip) => assert!(mip < desc.mip_levels, "Mip {mip} out of range"),
            GfxTextureViewRange::Slice(slice) => assert!(slice < desc.array_size, "Slice {slice} out of range"),
            GfxTextureViewRange::Subresource { mip, slice } => {
                desc.subresource_index(mip, slice);
            }
        }

        let handle = self.texture_view_pool.insert(GfxTextureView { texture, range });
        if let Some(views) = self.texture_to_views.get_mut(texture) {
            views.push(handle);
        }
        handle
    }

    pub fn destroy_texture_view(&mut self, handle: GfxTextureViewHandle) {
        let Some(view) = self.texture_view_pool.remove(handle) else {
            return;
        };
        if let Some(views) = self.texture_to_views.get_mut(view.texture) {
            views.retain(|v| *v != handle);
        }
    }

    #[inline]
    pub fn texture_view(&self, handle: GfxTextureViewHandle) -> Option<&GfxTextureView> {
        self.texture_view_pool.get(handle)
    }

    #[inline]
    pub fn texture_view_count(&self) -> usize {
        self.texture_view_pool.len()
    }
}

// Buffer API
impl GfxResourceManager {
    pub fn create_buffer(
        &mut self,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        name: impl Into<String>,
    ) -> GfxBufferHandle {
        let buffer = GfxBuffer::new(size, usage, name);
        log::trace!("create buffer: {}, size: {size}", buffer.name);
        self.buffer_pool.insert(buffer)
    }

    pub fn destroy_buffer(&mut self, handle: GfxBufferHandle) {
        if let Some(buffer) = self.buffer_pool.remove(handle) {
            log::trace!("destroy buffer: {}", buffer.name);
        }
    }

    /// 将 Pod 数据写入 buffer 的 `offset` 处
    pub fn write_buffer<T: bytemuck::Pod>(&mut self, handle: GfxBufferHandle, offset: vk::DeviceSize, data: &[T]) {
        let buffer = self
            .buffer_pool
            .get_mut(handle)
            .unwrap_or_else(|| panic!("Write to destroyed buffer {handle:?}"));
        buffer.write_bytes(offset as usize, bytemuck::cast_slice(data));
    }

    #[inline]
    pub fn buffer(&self, handle: GfxBufferHandle) -> Option<&GfxBuffer> {
        self.buffer_pool.get(handle)
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffer_pool.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroy_texture_removes_views() {
        let mut manager = GfxResourceManager::new();
        let desc = GfxTextureDesc::new_2d(vk::Format::R8G8B8A8_UNORM, 4, 4).with_mip_levels(2);
        let texture = manager.create_texture(&desc, "bloom");
        let mip0 = manager.create_texture_view(texture, GfxTextureViewRange::Mip(0));
        manager.create_texture_view(texture, GfxTextureViewRange::Mip(1));
        assert_eq!(manager.texture_view_count(), 2);

        manager.destroy_texture_view(mip0);
        assert_eq!(manager.texture_view_count(), 1);

        manager.destroy_texture(texture);
        assert_eq!(manager.texture_count(), 0);
        assert_eq!(manager.texture_view_count(), 0);
        assert!(manager.texture(texture).is_none());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_view_out_of_range() {
        let mut manager = GfxResourceManager::new();
        let texture = manager.create_texture(&GfxTextureDesc::default(), "tex");
        manager.create_texture_view(texture, GfxTextureViewRange::Slice(1));
    }

    #[test]
    fn test_write_buffer() {
        let mut manager = GfxResourceManager::new();
        let buffer = manager.create_buffer(16, vk::BufferUsageFlags::UNIFORM_BUFFER, "constants");
        manager.write_buffer(buffer, 4, &[1.5f32, 2.5f32]);

        let buffer = manager.buffer(buffer).unwrap();
        assert_eq!(buffer.read::<f32>(0), Some(0.0));
        assert_eq!(buffer.read::<f32>(1), Some(1.5));
        assert_eq!(buffer.read::<f32>(2), Some(2.5));
        assert_eq!(buffer.read::<f32>(4), None);
    }

    #[test]
    #[should_panic(expected = "overflows buffer")]
    fn test_write_buffer_overflow() {
        let mut manager = GfxResourceManager::new();
        let buffer = manager.create_buffer(4, vk::BufferUsageFlags::STORAGE_BUFFER, "lights");
        manager.write_buffer(buffer, 0, &[0u32, 1u32]);
    }
}
