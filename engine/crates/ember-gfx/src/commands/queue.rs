use itertools::Itertools;

use crate::basic::queue_type::QueueType;
use crate::commands::command_buffer::{GfxCommandBuffer, GfxCommandBufferState};
use crate::commands::fence::GfxFence;

/// 队列上发生的一次操作，按提交顺序记录
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GfxQueueOp {
    Submit { command_buffers: Vec<String> },
    Wait { fence: String, value: u64 },
    Signal { fence: String, value: u64 },
}

/// 队列的累计统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GfxQueueStats {
    pub submits: u64,
    pub command_buffers: u64,
    pub waits: u64,
    pub signals: u64,
}

/// headless 队列
///
/// 提交立即视为执行完成；wait 只记录，不阻塞。
#[derive(Debug)]
pub struct GfxQueue {
    queue_type: QueueType,
    ops: Vec<GfxQueueOp>,
    stats: GfxQueueStats,
}

// new & init
impl GfxQueue {
    pub fn new(queue_type: QueueType) -> Self {
        Self {
            queue_type,
            ops: Vec::new(),
            stats: GfxQueueStats::default(),
        }
    }
}

// getters
impl GfxQueue {
    #[inline]
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    #[inline]
    pub fn ops(&self) -> &[GfxQueueOp] {
        &self.ops
    }

    #[inline]
    pub fn stats(&self) -> GfxQueueStats {
        self.stats
    }

    /// 取出并清空操作日志
    #[inline]
    pub fn take_ops(&mut self) -> Vec<GfxQueueOp> {
        std::mem::take(&mut self.ops)
    }
}

// tools
impl GfxQueue {
    /// 提交一批命令缓冲，空批次直接跳过
    pub fn submit(&mut self, command_buffers: &[&GfxCommandBuffer]) {
        if command_buffers.is_empty() {
            return;
        }
        for cmd in command_buffers {
            assert_eq!(
                cmd.state(),
                GfxCommandBufferState::Executable,
                "Command buffer {} submitted before end()",
                cmd.name()
            );
            assert_eq!(
                cmd.queue(),
                self.queue_type,
                "Command buffer {} submitted to {} queue",
                cmd.name(),
                self.queue_type
            );
        }

        self.stats.submits += 1;
        self.stats.command_buffers += command_buffers.len() as u64;
        self.ops.push(GfxQueueOp::Submit {
            command_buffers: command_buffers.iter().map(|cmd| cmd.name().to_string()).collect_vec(),
        });
    }

    pub fn wait(&mut self, fence: &GfxFence, value: u64) {
        self.stats.waits += 1;
        self.ops.push(GfxQueueOp::Wait {
            fence: fence.name().to_string(),
            value,
        });
    }

    pub fn signal(&mut self, fence: &GfxFence, value: u64) {
        fence.signal(value);
        self.stats.signals += 1;
        self.ops.push(GfxQueueOp::Signal {
            fence: fence.name().to_string(),
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executable(queue: QueueType, name: &str) -> GfxCommandBuffer {
        let mut cmd = GfxCommandBuffer::new(queue, name);
        cmd.begin();
        cmd.end();
        cmd
    }

    #[test]
    fn test_op_log() {
        let fence = GfxFence::new_timeline(0, "compute-fence");
        let mut queue = GfxQueue::new(QueueType::Compute);
        let a = executable(QueueType::Compute, "a");
        let b = executable(QueueType::Compute, "b");

        queue.submit(&[]);
        queue.wait(&fence, 0);
        queue.submit(&[&a, &b]);
        queue.signal(&fence, 1);

        assert_eq!(
            queue.ops(),
            &[
                GfxQueueOp::Wait {
                    fence: "compute-fence".to_string(),
                    value: 0
                },
                GfxQueueOp::Submit {
                    command_buffers: vec!["a".to_string(), "b".to_string()]
                },
                GfxQueueOp::Signal {
                    fence: "compute-fence".to_string(),
                    value: 1
                },
            ]
        );
        assert_eq!(fence.completed_value(), 1);
        assert_eq!(queue.stats().command_buffers, 2);
        assert_eq!(queue.take_ops().len(), 3);
        assert!(queue.ops().is_empty());
    }

    #[test]
    #[should_panic(expected = "submitted before end()")]
    fn test_submit_unfinished() {
        let mut queue = GfxQueue::new(QueueType::Graphics);
        let mut cmd = GfxCommandBuffer::new(QueueType::Graphics, "a");
        cmd.begin();
        queue.submit(&[&cmd]);
    }
}
