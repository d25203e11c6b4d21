//! 多队列 RenderGraph
//!
//! Pass 在 `build` 阶段通过 [`pass_builder::RenderPassBuilder`] 声明资源，
//! graph 据此构建依赖关系、拓扑排序与依赖分组，计算最少的跨队列等待，
//! 规划每个依赖分组需要的 barrier（队列不支持的转换会被重定向到 graphics 队列），
//! 最后按队列批量提交命令缓冲。
//!
//! # 使用示例
//!
//! ```ignore
//! let mut graph = RenderGraph::new(RenderGraphConfig::default());
//! graph.add_pass("geometry", QueueType::Graphics, GeometryPass::new(ids));
//!
//! graph.build(&mut scheduler, &mut gfx);
//! scheduler.update_scene_frame_data(&frame_data, &mut gfx);
//! graph.execute(&scheduler, &mut gfx);
//! ```

pub mod config;
pub mod frame_data;
pub mod graph;
pub mod pass;
pub mod pass_builder;
pub mod pass_context;
pub mod resource;
pub mod resource_id;
pub mod resource_scheduler;
pub mod resource_view;
