use std::fmt;

/// 帧标签，用于日志中区分 frame in flight 的槽位
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLabel(usize);

impl fmt::Display for FrameLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 0 -> a, 1 -> b ...，超过 26 个槽位时直接用数字
        match u8::try_from(self.0) {
            Ok(index) if index < 26 => write!(f, "{}", (b'a' + index) as char),
            _ => write!(f, "#{}", self.0),
        }
    }
}

pub struct FrameCounter {
    /// 当前的帧序号，一直累加
    frame_id: u64,
    frames_in_flight: usize,
}
// new & init
impl FrameCounter {
    pub fn new(init_frame_id: u64, frames_in_flight: usize) -> Self {
        assert!(frames_in_flight >= 1, "frames_in_flight must be at least 1");
        Self {
            frame_id: init_frame_id,
            frames_in_flight,
        }
    }
}
// update
impl FrameCounter {
    #[inline]
    pub fn next_frame(&mut self) {
        self.frame_id = self.frame_id.wrapping_add(1);
    }
}
// getters
impl FrameCounter {
    #[inline]
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }
    #[inline]
    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }
    /// 当前帧使用的槽位下标
    #[inline]
    pub fn frame_index(&self) -> usize {
        (self.frame_id % self.frames_in_flight as u64) as usize
    }
    #[inline]
    pub fn frame_label(&self) -> FrameLabel {
        FrameLabel(self.frame_index())
    }
    #[inline]
    pub fn frame_name(&self) -> String {
        format!("[F{}{}]", self.frame_id, self.frame_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index_wraps() {
        let mut counter = FrameCounter::new(0, 3);
        let indices = (0..7)
            .map(|_| {
                let index = counter.frame_index();
                counter.next_frame();
                index
            })
            .collect::<Vec<_>>();
        assert_eq!(indices, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(counter.frame_id(), 7);
    }

    #[test]
    fn test_frame_name() {
        let counter = FrameCounter::new(4, 3);
        assert_eq!(counter.frame_name(), "[F4b]");
        assert_eq!(FrameCounter::new(9, 1).frame_name(), "[F9a]");
    }

    #[test]
    fn test_frame_id_wraps_around() {
        let mut counter = FrameCounter::new(u64::MAX, 2);
        counter.next_frame();
        assert_eq!(counter.frame_id(), 0);
        assert_eq!(counter.frame_index(), 0);
    }

    #[test]
    #[should_panic(expected = "frames_in_flight must be at least 1")]
    fn test_zero_frames_in_flight() {
        FrameCounter::new(0, 0);
    }
}
