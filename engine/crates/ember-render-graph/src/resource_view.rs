use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::basic::resource_state::ResourceState;

use crate::pass::PassId;
use crate::resource_id::ResourceId;

/// 视图类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceViewKind {
    /// 只读着色器视图（SRV）
    ShaderResource,
    /// 读写视图（UAV）
    UnorderedAccess,
    RenderTarget,
    /// 深度模板，可写
    DepthStencilRw,
    /// 深度模板，只读
    DepthStencilRo,
}

impl ResourceViewKind {
    #[inline]
    pub fn is_read_only(self) -> bool {
        matches!(self, Self::ShaderResource | Self::DepthStencilRo)
    }

    /// 在 `queue` 上使用该视图时资源需要处于的状态
    pub fn requested_state(self, queue: QueueType) -> ResourceState {
        match self {
            Self::ShaderResource => match queue {
                QueueType::Graphics => ResourceState::ANY_SHADER_READ,
                QueueType::Compute => ResourceState::NON_PIXEL_SHADER_READ,
                QueueType::Copy => ResourceState::COPY_SOURCE,
            },
            Self::DepthStencilRo => ResourceState::DEPTH_READ,
            Self::UnorderedAccess => ResourceState::UNORDERED_ACCESS,
            Self::RenderTarget => ResourceState::RENDER_TARGET,
            Self::DepthStencilRw => ResourceState::DEPTH_WRITE,
        }
    }
}

/// pass 对某个资源声明的视图
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceView {
    pub pass: PassId,
    pub resource: ResourceId,
    pub kind: ResourceViewKind,
}

impl ResourceView {
    #[inline]
    pub fn is_read_only(&self) -> bool {
        self.kind.is_read_only()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_kinds() {
        assert!(ResourceViewKind::ShaderResource.is_read_only());
        assert!(ResourceViewKind::DepthStencilRo.is_read_only());
        assert!(!ResourceViewKind::UnorderedAccess.is_read_only());
        assert!(!ResourceViewKind::RenderTarget.is_read_only());
        assert!(!ResourceViewKind::DepthStencilRw.is_read_only());
    }

    #[test]
    fn test_shader_read_depends_on_queue() {
        let srv = ResourceViewKind::ShaderResource;
        assert_eq!(srv.requested_state(QueueType::Graphics), ResourceState::ANY_SHADER_READ);
        assert_eq!(srv.requested_state(QueueType::Compute), ResourceState::NON_PIXEL_SHADER_READ);
        assert_eq!(srv.requested_state(QueueType::Copy), ResourceState::COPY_SOURCE);
        assert_eq!(
            ResourceViewKind::DepthStencilRw.requested_state(QueueType::Compute),
            ResourceState::DEPTH_WRITE
        );
    }
}
