use ash::vk;

/// headless buffer，数据保存在 CPU 内存中
#[derive(Clone, Debug)]
pub struct GfxBuffer {
    pub(crate) name: String,
    pub(crate) usage: vk::BufferUsageFlags,
    pub(crate) data: Vec<u8>,
}

impl GfxBuffer {
    pub(crate) fn new(size: vk::DeviceSize, usage: vk::BufferUsageFlags, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usage,
            data: vec![0; size as usize],
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.data.len() as vk::DeviceSize
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 以 `T` 的视角读取 buffer 内容
    ///
    /// 使用 `pod_read_unaligned`，不要求内部存储对齐。
    pub fn read<T: bytemuck::Pod>(&self, index: usize) -> Option<T> {
        let stride = size_of::<T>();
        let start = index.checked_mul(stride)?;
        let bytes = self.data.get(start..start + stride)?;
        Some(bytemuck::pod_read_unaligned(bytes))
    }

    pub(crate) fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        assert!(
            end <= self.data.len(),
            "Write of {} bytes at offset {offset} overflows buffer {} ({} bytes)",
            bytes.len(),
            self.name,
            self.data.len()
        );
        self.data[offset..end].copy_from_slice(bytes);
    }
}
