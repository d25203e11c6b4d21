//! Ember 渲染器
//!
//! 在 [`ember_render_graph`] 之上组装一帧的完整流程：
//! 级联阴影、天空盒、静态/蒙皮几何体、compute 队列上的 Bloom、最终合成。
//!
//! 每个 frame in flight 持有一份 `ResourceScheduler`，graph 本身只有一份，每帧重新 build。

pub mod config;
pub mod frame_counter;
pub mod passes;
pub mod renderer;
