//! Bloom
//!
//! 降采样和升采样都在 compute 队列上执行，在 Bloom 纹理的 mip 链上逐级处理；
//! 合成在 graphics 队列上把 Bloom 叠加回场景颜色。

use ash::vk;
use ember_gfx::basic::resource_state::ResourceState;
use ember_gfx::commands::barrier::UavBarrier;
use ember_gfx::pipelines::pipeline::{ComputePipelineDesc, GraphicsPipelineDesc};
use ember_render_graph::pass::RgPass;
use ember_render_graph::pass_builder::RenderPassBuilder;
use ember_render_graph::pass_context::RenderPassContext;
use ember_render_graph::resource::{ClearValue, TextureDesc, TextureFlags};
use ember_render_graph::resource_id::{RtId, UaId};

use crate::config::BloomConfig;
use crate::passes::{HDR_FORMAT, group_count_8x8};

/// 全屏三角形
const FULLSCREEN_VERTEX_COUNT: u32 = 3;

/// 完整 mip 链的长度
pub fn max_mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

/// Bloom 纹理的 mip 数量
pub fn bloom_mip_count(viewport: glam::UVec2, settings: &BloomConfig) -> u32 {
    max_mip_count(viewport.x, viewport.y).min(settings.downsample_steps)
}

#[inline]
fn mip_size(viewport: glam::UVec2, mip: u32) -> glam::UVec2 {
    glam::uvec2((viewport.x >> mip).max(1), (viewport.y >> mip).max(1))
}

/// 同一纹理的相邻 mip 之间存在读写依赖
fn mip_barrier(ctx: &mut RenderPassContext, bloom: UaId) {
    let barrier = UavBarrier {
        resource: "Bloom".to_string(),
        texture: ctx.get_texture(bloom),
    };
    ctx.command_buffer().uav_barrier(&barrier);
}

pub struct BloomDownsamplePass {
    scene_color: RtId,
    bloom: UaId,
    settings: BloomConfig,
    viewport: glam::UVec2,
    mip_count: u32,
}

impl BloomDownsamplePass {
    pub fn new(scene_color: RtId, bloom: UaId, settings: BloomConfig) -> Self {
        Self {
            scene_color,
            bloom,
            settings,
            viewport: glam::UVec2::ONE,
            mip_count: 1,
        }
    }
}

impl RgPass for BloomDownsamplePass {
    fn build(&mut self, builder: &mut RenderPassBuilder) {
        builder.set_pipeline_state_desc(ComputePipelineDesc::new(
            "bloom-downsample",
            "bloom_downsample.cs.slang",
            [8, 8, 1],
        ));

        self.viewport = builder.viewport_size();
        self.mip_count = bloom_mip_count(self.viewport, &self.settings);
        builder.new_ua(
            self.bloom,
            TextureDesc::new_2d(HDR_FORMAT, self.viewport.x, self.viewport.y)
                .with_mip_levels(self.mip_count)
                .with_flags(TextureFlags::UNORDERED_ACCESS | TextureFlags::SHADER_RESOURCE)
                .with_clear_value(ClearValue::color(0.2, 0.2, 0.2, 1.0))
                .with_initial_state(ResourceState::UNORDERED_ACCESS),
        );
        builder.read_rt(self.scene_color);
    }

    fn execute(&self, ctx: &mut RenderPassContext) {
        for mip in 0..self.mip_count {
            // mip 0 从场景颜色采样，其余从上一级 mip 采样
            let source = match mip {
                0 => ctx.get_sr(self.scene_color, None, None),
                _ => ctx.get_ua(self.bloom, Some(mip - 1), None),
            };
            let target = ctx.get_ua(self.bloom, Some(mip), None);
            let size = mip_size(self.viewport, mip);

            let cmd = ctx.command_buffer();
            cmd.bind_texture_views(&[source, target]);
            cmd.dispatch(group_count_8x8(size.x, size.y));
            mip_barrier(ctx, self.bloom);
        }
    }
}

pub struct BloomUpsamplePass {
    bloom: UaId,
    settings: BloomConfig,
    viewport: glam::UVec2,
    mip_count: u32,
}

impl BloomUpsamplePass {
    pub fn new(bloom: UaId, settings: BloomConfig) -> Self {
        Self {
            bloom,
            settings,
            viewport: glam::UVec2::ONE,
            mip_count: 1,
        }
    }
}

impl RgPass for BloomUpsamplePass {
    fn build(&mut self, builder: &mut RenderPassBuilder) {
        builder.set_pipeline_state_desc(ComputePipelineDesc::new(
            "bloom-upsample",
            "bloom_upsample.cs.slang",
            [8, 8, 1],
        ));

        self.viewport = builder.viewport_size();
        self.mip_count = bloom_mip_count(self.viewport, &self.settings);
        builder.write_ua(self.bloom);
    }

    fn execute(&self, ctx: &mut RenderPassContext) {
        log::trace!("bloom upsample filter radius {}", self.settings.filter_radius);
        for mip in (1..self.mip_count).rev() {
            let source = ctx.get_ua(self.bloom, Some(mip), None);
            let target = ctx.get_ua(self.bloom, Some(mip - 1), None);
            let size = mip_size(self.viewport, mip - 1);

            let cmd = ctx.command_buffer();
            cmd.bind_texture_views(&[source, target]);
            cmd.dispatch(group_count_8x8(size.x, size.y));
            mip_barrier(ctx, self.bloom);
        }
    }
}

pub struct BloomCompositePass {
    scene_color: RtId,
    bloom: UaId,
    scene_bloom: RtId,
    settings: BloomConfig,
}

impl BloomCompositePass {
    pub fn new(scene_color: RtId, bloom: UaId, scene_bloom: RtId, settings: BloomConfig) -> Self {
        Self {
            scene_color,
            bloom,
            scene_bloom,
            settings,
        }
    }
}

impl RgPass for BloomCompositePass {
    fn build(&mut self, builder: &mut RenderPassBuilder) {
        builder.set_pipeline_state_desc(
            GraphicsPipelineDesc::new("bloom-composite", "fullscreen.vs.slang", "bloom_composite.ps.slang")
                .with_color_format(HDR_FORMAT)
                .with_cull_mode(vk::CullModeFlags::BACK),
        );

        let size = builder.viewport_size();
        builder.new_rt(
            self.scene_bloom,
            TextureDesc::new_2d(HDR_FORMAT, size.x, size.y)
                .with_flags(TextureFlags::RENDER_TARGET | TextureFlags::SHADER_RESOURCE)
                .with_clear_value(ClearValue::color(0.2, 0.2, 0.2, 1.0))
                .with_initial_state(ResourceState::RENDER_TARGET),
        );
        builder.read_ua(self.bloom);
        builder.read_rt(self.scene_color);
    }

    fn execute(&self, ctx: &mut RenderPassContext) {
        let scene = ctx.get_sr(self.scene_color, None, None);
        let bloom = ctx.get_sr(self.bloom, None, None);
        let target = ctx.get_rt(self.scene_bloom, None, None);
        log::trace!("bloom strength {}", self.settings.strength);

        let cmd = ctx.command_buffer();
        cmd.bind_texture_views(&[scene, bloom]);
        cmd.begin_render_pass(&[(target, Some(ClearValue::color(0.2, 0.2, 0.2, 1.0)))], None);
        cmd.draw(FULLSCREEN_VERTEX_COUNT, 1);
        cmd.end_render_pass();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_mip_count() {
        assert_eq!(max_mip_count(1, 1), 1);
        assert_eq!(max_mip_count(1280, 720), 11);
        assert_eq!(max_mip_count(64, 64), 7);
        assert_eq!(max_mip_count(0, 0), 1);
    }

    #[test]
    fn test_bloom_mip_count_is_clamped() {
        let settings = BloomConfig::default();
        assert_eq!(bloom_mip_count(glam::uvec2(1280, 720), &settings), settings.downsample_steps);
        assert_eq!(bloom_mip_count(glam::uvec2(8, 4), &settings), 4);
    }

    #[test]
    fn test_mip_size_never_zero() {
        let viewport = glam::uvec2(16, 2);
        assert_eq!(mip_size(viewport, 1), glam::uvec2(8, 1));
        assert_eq!(mip_size(viewport, 3), glam::uvec2(2, 1));
    }
}
