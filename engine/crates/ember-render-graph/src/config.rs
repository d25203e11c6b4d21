use ember_gfx::basic::queue_type::QueueType;
use serde::Deserialize;

/// RenderGraph 配置，对应配置文件中的 `[render_graph]` 表
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderGraphConfig {
    /// 是否使用独立的 compute 队列；关闭后 compute pass 在 graphics 队列上执行
    pub async_compute: bool,
    /// 是否使用独立的 copy 队列；关闭后 copy pass 在 graphics 队列上执行
    pub async_copy: bool,
    /// 每次 build 后打印执行计划
    pub print_execution_plan: bool,
}

impl Default for RenderGraphConfig {
    fn default() -> Self {
        Self {
            async_compute: true,
            async_copy: true,
            print_execution_plan: false,
        }
    }
}

impl RenderGraphConfig {
    /// pass 实际执行的队列
    pub fn effective_queue(&self, requested: QueueType) -> QueueType {
        match requested {
            QueueType::Compute if !self.async_compute => QueueType::Graphics,
            QueueType::Copy if !self.async_copy => QueueType::Graphics,
            queue => queue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_queue() {
        let config = RenderGraphConfig {
            async_compute: false,
            ..Default::default()
        };
        assert_eq!(config.effective_queue(QueueType::Compute), QueueType::Graphics);
        assert_eq!(config.effective_queue(QueueType::Copy), QueueType::Copy);
        assert_eq!(config.effective_queue(QueueType::Graphics), QueueType::Graphics);
    }
}
