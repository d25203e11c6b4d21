use std::fmt::{Display, Formatter};

use crate::basic::resource_state::ResourceState;

/// 硬件队列类型
///
/// 数量固定为 3，`index()` 可以直接作为数组下标。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum QueueType {
    #[default]
    Graphics = 0,
    Compute = 1,
    Copy = 2,
}

impl QueueType {
    pub const COUNT: usize = 3;
    pub const ALL: [QueueType; Self::COUNT] = [QueueType::Graphics, QueueType::Compute, QueueType::Copy];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 该队列上可以出现的资源状态
    ///
    /// graphics 队列支持所有状态。
    pub fn supported_states(self) -> ResourceState {
        match self {
            Self::Graphics => ResourceState::all(),
            Self::Compute => {
                ResourceState::NON_PIXEL_SHADER_READ
                    | ResourceState::GENERIC_READ
                    | ResourceState::COPY_DESTINATION
                    | ResourceState::COPY_SOURCE
                    | ResourceState::UNORDERED_ACCESS
                    | ResourceState::RAYTRACING_ACCELERATION_STRUCTURE
                    | ResourceState::VERTEX_CONSTANT_BUFFER
            }
            Self::Copy => ResourceState::COPY_DESTINATION | ResourceState::COPY_SOURCE,
        }
    }

    /// 状态中的每一位都被该队列支持（`COMMON` 总是支持）
    #[inline]
    pub fn supports_state(self, state: ResourceState) -> bool {
        (state - self.supported_states()).is_empty()
    }
}

impl Display for QueueType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Graphics => write!(f, "Graphics"),
            Self::Compute => write!(f, "Compute"),
            Self::Copy => write!(f, "Copy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for queue in QueueType::ALL {
            assert_eq!(QueueType::from_index(queue.index()), Some(queue));
        }
        assert_eq!(QueueType::from_index(QueueType::COUNT), None);
    }

    #[test]
    fn test_copy_queue_states() {
        assert!(QueueType::Copy.supports_state(ResourceState::COMMON));
        assert!(QueueType::Copy.supports_state(ResourceState::COPY_SOURCE | ResourceState::COPY_DESTINATION));
        assert!(!QueueType::Copy.supports_state(ResourceState::NON_PIXEL_SHADER_READ));
    }

    #[test]
    fn test_compute_queue_states() {
        assert!(QueueType::Compute.supports_state(ResourceState::UNORDERED_ACCESS));
        assert!(QueueType::Compute.supports_state(ResourceState::NON_PIXEL_SHADER_READ));
        // GENERIC_READ 中包含 PIXEL_SHADER_READ，所以 compute 队列也接受它
        assert!(QueueType::Compute.supports_state(ResourceState::PIXEL_SHADER_READ));
        assert!(!QueueType::Compute.supports_state(ResourceState::RENDER_TARGET));
        assert!(!QueueType::Compute.supports_state(ResourceState::DEPTH_WRITE));
    }

    #[test]
    fn test_graphics_supports_everything() {
        assert!(QueueType::Graphics.supports_state(ResourceState::all()));
    }
}
