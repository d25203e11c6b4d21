//! 天空盒：创建并清空场景颜色与深度，之后的几何 pass 在其上绘制

use ash::vk;
use ember_gfx::basic::resource_state::ResourceState;
use ember_gfx::pipelines::pipeline::GraphicsPipelineDesc;
use ember_render_graph::pass::RgPass;
use ember_render_graph::pass_builder::RenderPassBuilder;
use ember_render_graph::pass_context::RenderPassContext;
use ember_render_graph::resource::{ClearValue, TextureDesc, TextureFlags};
use ember_render_graph::resource_id::{DsId, RtId};

use crate::passes::{DEPTH_FORMAT, HDR_FORMAT};

/// 单位立方体的顶点数
const CUBE_VERTEX_COUNT: u32 = 36;

pub struct SkyBoxPass {
    scene_color: RtId,
    scene_depth: DsId,
}

impl SkyBoxPass {
    pub fn new(scene_color: RtId, scene_depth: DsId) -> Self {
        Self {
            scene_color,
            scene_depth,
        }
    }
}

impl RgPass for SkyBoxPass {
    fn build(&mut self, builder: &mut RenderPassBuilder) {
        builder.set_pipeline_state_desc(
            GraphicsPipelineDesc::new("sky-box", "sky_box.vs.slang", "sky_box.ps.slang")
                .with_color_format(HDR_FORMAT)
                .with_depth(DEPTH_FORMAT, false)
                .with_cull_mode(vk::CullModeFlags::NONE),
        );

        let size = builder.viewport_size();
        builder.new_rt(
            self.scene_color,
            TextureDesc::new_2d(HDR_FORMAT, size.x, size.y)
                .with_flags(TextureFlags::RENDER_TARGET | TextureFlags::SHADER_RESOURCE)
                .with_clear_value(ClearValue::color(0.0, 0.0, 0.0, 1.0))
                .with_initial_state(ResourceState::RENDER_TARGET),
        );
        builder.new_ds(
            self.scene_depth,
            TextureDesc::new_2d(DEPTH_FORMAT, size.x, size.y)
                .with_flags(TextureFlags::DEPTH_STENCIL)
                .with_clear_value(ClearValue::depth(1.0, 0))
                .with_initial_state(ResourceState::DEPTH_WRITE),
        );
    }

    fn execute(&self, ctx: &mut RenderPassContext) {
        let color = ctx.get_rt(self.scene_color, None, None);
        let depth = ctx.get_ds_rw(self.scene_depth, None, None);

        let cmd = ctx.command_buffer();
        cmd.begin_render_pass(
            &[(color, Some(ClearValue::color(0.0, 0.0, 0.0, 1.0)))],
            Some((depth, Some(ClearValue::depth(1.0, 0)))),
        );
        cmd.draw(CUBE_VERTEX_COUNT, 1);
        cmd.end_render_pass();
    }
}
