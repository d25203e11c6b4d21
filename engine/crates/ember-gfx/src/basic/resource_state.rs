//! 资源状态定义
//!
//! RenderGraph 使用一组与具体 API 无关的状态位描述资源的使用方式，
//! 录制 barrier 时再映射为 Vulkan 的 pipeline stage、access mask 和 image layout。

use ash::vk;

bitflags::bitflags! {
    /// 资源状态位
    ///
    /// 空集合即 `COMMON`（同时也是 `PRESENT`）。
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ResourceState: u32 {
        const VERTEX_CONSTANT_BUFFER = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const RENDER_TARGET = 1 << 2;
        const UNORDERED_ACCESS = 1 << 3;
        const DEPTH_WRITE = 1 << 4;
        const DEPTH_READ = 1 << 5;
        const NON_PIXEL_SHADER_READ = 1 << 6;
        const PIXEL_SHADER_READ = 1 << 7;
        const STREAM_OUT = 1 << 8;
        const INDIRECT_ARGUMENT = 1 << 9;
        const COPY_DESTINATION = 1 << 10;
        const COPY_SOURCE = 1 << 11;
        const RESOLVE_DESTINATION = 1 << 12;
        const RESOLVE_SOURCE = 1 << 13;
        const RAYTRACING_ACCELERATION_STRUCTURE = 1 << 14;
    }
}

// 组合状态
impl ResourceState {
    pub const COMMON: Self = Self::empty();
    pub const PRESENT: Self = Self::COMMON;

    pub const GENERIC_READ: Self = Self::from_bits_retain(
        Self::VERTEX_CONSTANT_BUFFER.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::NON_PIXEL_SHADER_READ.bits()
            | Self::PIXEL_SHADER_READ.bits()
            | Self::INDIRECT_ARGUMENT.bits()
            | Self::COPY_SOURCE.bits(),
    );

    pub const ANY_SHADER_READ: Self =
        Self::from_bits_retain(Self::PIXEL_SHADER_READ.bits() | Self::NON_PIXEL_SHADER_READ.bits());

    /// 包含写操作的状态位
    const WRITE_STATES: Self = Self::from_bits_retain(
        Self::RENDER_TARGET.bits()
            | Self::UNORDERED_ACCESS.bits()
            | Self::DEPTH_WRITE.bits()
            | Self::STREAM_OUT.bits()
            | Self::COPY_DESTINATION.bits()
            | Self::RESOLVE_DESTINATION.bits(),
    );

    /// 检查是否为写状态
    #[inline]
    pub fn is_write(&self) -> bool {
        self.intersects(Self::WRITE_STATES)
    }

    /// 检查是否为只读状态（`COMMON` 视为只读）
    #[inline]
    pub fn is_read_only(&self) -> bool {
        !self.is_write()
    }
}

/// 状态对应的 Vulkan 同步信息
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VkResourceState {
    pub stage: vk::PipelineStageFlags2,
    pub access: vk::AccessFlags2,
    pub layout: vk::ImageLayout,
}

// vulkan 映射
impl ResourceState {
    /// 单个状态位对应的 stage、access、layout
    fn single_vk_state(flag: Self) -> VkResourceState {
        type S = vk::PipelineStageFlags2;
        type A = vk::AccessFlags2;
        type L = vk::ImageLayout;

        let (stage, access, layout) = if flag == Self::VERTEX_CONSTANT_BUFFER {
            (S::VERTEX_INPUT | S::ALL_GRAPHICS, A::VERTEX_ATTRIBUTE_READ | A::UNIFORM_READ, L::GENERAL)
        } else if flag == Self::INDEX_BUFFER {
            (S::INDEX_INPUT, A::INDEX_READ, L::GENERAL)
        } else if flag == Self::RENDER_TARGET {
            (
                S::COLOR_ATTACHMENT_OUTPUT,
                A::COLOR_ATTACHMENT_READ | A::COLOR_ATTACHMENT_WRITE,
                L::COLOR_ATTACHMENT_OPTIMAL,
            )
        } else if flag == Self::UNORDERED_ACCESS {
            (S::ALL_COMMANDS, A::SHADER_STORAGE_READ | A::SHADER_STORAGE_WRITE, L::GENERAL)
        } else if flag == Self::DEPTH_WRITE {
            (
                S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
                A::DEPTH_STENCIL_ATTACHMENT_READ | A::DEPTH_STENCIL_ATTACHMENT_WRITE,
                L::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            )
        } else if flag == Self::DEPTH_READ {
            (
                S::EARLY_FRAGMENT_TESTS | S::LATE_FRAGMENT_TESTS,
                A::DEPTH_STENCIL_ATTACHMENT_READ,
                L::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            )
        } else if flag == Self::NON_PIXEL_SHADER_READ {
            (S::VERTEX_SHADER | S::COMPUTE_SHADER, A::SHADER_SAMPLED_READ, L::SHADER_READ_ONLY_OPTIMAL)
        } else if flag == Self::PIXEL_SHADER_READ {
            (S::FRAGMENT_SHADER, A::SHADER_SAMPLED_READ, L::SHADER_READ_ONLY_OPTIMAL)
        } else if flag == Self::STREAM_OUT {
            (S::TRANSFORM_FEEDBACK_EXT, A::TRANSFORM_FEEDBACK_WRITE_EXT, L::GENERAL)
        } else if flag == Self::INDIRECT_ARGUMENT {
            (S::DRAW_INDIRECT, A::INDIRECT_COMMAND_READ, L::GENERAL)
        } else if flag == Self::COPY_DESTINATION || flag == Self::RESOLVE_DESTINATION {
            (S::TRANSFER, A::TRANSFER_WRITE, L::TRANSFER_DST_OPTIMAL)
        } else if flag == Self::COPY_SOURCE || flag == Self::RESOLVE_SOURCE {
            (S::TRANSFER, A::TRANSFER_READ, L::TRANSFER_SRC_OPTIMAL)
        } else if flag == Self::RAYTRACING_ACCELERATION_STRUCTURE {
            (
                S::RAY_TRACING_SHADER_KHR | S::ACCELERATION_STRUCTURE_BUILD_KHR,
                A::ACCELERATION_STRUCTURE_READ_KHR,
                L::GENERAL,
            )
        } else {
            (S::ALL_COMMANDS, A::NONE, L::GENERAL)
        };
        VkResourceState { stage, access, layout }
    }

    /// 映射为 Vulkan 的同步信息
    ///
    /// 多个状态位组合时 stage 和 access 取并集；layout 不一致时退回 `GENERAL`，
    /// 深度只读与着色器读取同时存在时使用 `DEPTH_STENCIL_READ_ONLY_OPTIMAL`。
    pub fn to_vk(self) -> VkResourceState {
        if self.is_empty() {
            return VkResourceState {
                stage: vk::PipelineStageFlags2::ALL_COMMANDS,
                access: vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE,
                layout: vk::ImageLayout::GENERAL,
            };
        }

        let mut stage = vk::PipelineStageFlags2::NONE;
        let mut access = vk::AccessFlags2::NONE;
        let mut layout: Option<vk::ImageLayout> = None;

        for flag in self.iter() {
            let single = Self::single_vk_state(flag);
            stage |= single.stage;
            access |= single.access;
            layout = match layout {
                None => Some(single.layout),
                Some(l) if l == single.layout => Some(l),
                Some(_) => Some(vk::ImageLayout::GENERAL),
            };
        }

        if self.contains(Self::DEPTH_READ) && (self - Self::DEPTH_READ - Self::ANY_SHADER_READ).is_empty() {
            layout = Some(vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL);
        }

        VkResourceState {
            stage,
            access,
            layout: layout.unwrap_or(vk::ImageLayout::GENERAL),
        }
    }

    /// 作为 present 目标时的 layout
    #[inline]
    pub fn present_layout() -> vk::ImageLayout {
        vk::ImageLayout::PRESENT_SRC_KHR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composites() {
        assert!(ResourceState::GENERIC_READ.contains(ResourceState::PIXEL_SHADER_READ));
        assert!(ResourceState::GENERIC_READ.contains(ResourceState::COPY_SOURCE));
        assert!(!ResourceState::GENERIC_READ.contains(ResourceState::COPY_DESTINATION));
        assert_eq!(ResourceState::PRESENT, ResourceState::COMMON);
        assert!(ResourceState::COMMON.is_empty());
    }

    #[test]
    fn test_write_classification() {
        assert!(ResourceState::RENDER_TARGET.is_write());
        assert!(ResourceState::UNORDERED_ACCESS.is_write());
        assert!(ResourceState::ANY_SHADER_READ.is_read_only());
        assert!(ResourceState::COMMON.is_read_only());
    }

    #[test]
    fn test_vk_single_states() {
        let rt = ResourceState::RENDER_TARGET.to_vk();
        assert_eq!(rt.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        assert!(rt.access.contains(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE));

        let ua = ResourceState::UNORDERED_ACCESS.to_vk();
        assert_eq!(ua.layout, vk::ImageLayout::GENERAL);

        let src = ResourceState::COPY_SOURCE.to_vk();
        assert_eq!(src.layout, vk::ImageLayout::TRANSFER_SRC_OPTIMAL);
        assert_eq!(src.stage, vk::PipelineStageFlags2::TRANSFER);
    }

    #[test]
    fn test_vk_combined_states() {
        let any_read = ResourceState::ANY_SHADER_READ.to_vk();
        assert_eq!(any_read.layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert!(any_read.stage.contains(vk::PipelineStageFlags2::FRAGMENT_SHADER));
        assert!(any_read.stage.contains(vk::PipelineStageFlags2::COMPUTE_SHADER));

        let depth_and_read = (ResourceState::DEPTH_READ | ResourceState::PIXEL_SHADER_READ).to_vk();
        assert_eq!(depth_and_read.layout, vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL);

        let mixed = (ResourceState::PIXEL_SHADER_READ | ResourceState::COPY_SOURCE).to_vk();
        assert_eq!(mixed.layout, vk::ImageLayout::GENERAL);

        assert_eq!(ResourceState::COMMON.to_vk().layout, vk::ImageLayout::GENERAL);
    }
}
