use std::sync::atomic::{AtomicU64, Ordering};

/// headless 的 timeline fence
///
/// `completed` 记录 GPU 侧已经完成的值；`next` 是 CPU 侧预留 signal 值的计数器，
/// 保证每一次 signal 的值严格递增。
#[derive(Debug)]
pub struct GfxFence {
    name: String,
    completed: AtomicU64,
    next: AtomicU64,
}

// new & init
impl GfxFence {
    pub fn new_timeline(initial_value: u64, name: impl Into<String>) -> Self {
        let name = name.into();
        log::trace!("create timeline fence: {name}, initial value: {initial_value}");
        Self {
            name,
            completed: AtomicU64::new(initial_value),
            next: AtomicU64::new(initial_value),
        }
    }
}

// getters
impl GfxFence {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_complete(&self, value: u64) -> bool {
        self.completed_value() >= value
    }

    /// 最近一次预留的值
    #[inline]
    pub fn last_reserved_value(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}

// tools
impl GfxFence {
    /// 预留下一个 signal 值
    #[inline]
    pub fn reserve_value(&self) -> u64 {
        self.next.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// 将 fence 推进到 `value`，timeline 不会回退
    #[inline]
    pub fn signal(&self, value: u64) {
        self.completed.fetch_max(value, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_is_monotonic() {
        let fence = GfxFence::new_timeline(0, "graphics-fence");
        assert_eq!(fence.reserve_value(), 1);
        assert_eq!(fence.reserve_value(), 2);
        assert_eq!(fence.last_reserved_value(), 2);
        assert!(!fence.is_complete(1));
    }

    #[test]
    fn test_signal_never_goes_back() {
        let fence = GfxFence::new_timeline(0, "compute-fence");
        fence.signal(5);
        fence.signal(3);
        assert_eq!(fence.completed_value(), 5);
        assert!(fence.is_complete(4));
        assert!(!fence.is_complete(6));
    }
}
