//! Ember 的 GFX 抽象层
//!
//! 提供 RenderGraph 所依赖的 GPU 侧概念：资源状态模型（[`basic::resource_state::ResourceState`]）、
//! 队列类型、barrier 值对象、timeline fence、命令缓冲与队列。
//!
//! 当前只有 headless 后端：命令缓冲记录命令列表，队列记录提交日志，
//! fence 是原子计数器。所有资源通过 [`gfx::GfxDevice`] 显式传递，不使用全局单例。

pub mod basic;
pub mod commands;
pub mod gfx;
pub mod pipelines;
pub mod resources;
