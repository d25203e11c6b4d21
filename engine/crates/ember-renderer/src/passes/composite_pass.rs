//! 最终合成：色调映射后写入最终图像
//!
//! 本帧导入了 back buffer 时直接写入 back buffer，graph 负责最后把它转换到 `PRESENT`。

use ash::vk;
use ember_gfx::basic::resource_state::ResourceState;
use ember_gfx::pipelines::pipeline::GraphicsPipelineDesc;
use ember_render_graph::pass::RgPass;
use ember_render_graph::pass_builder::RenderPassBuilder;
use ember_render_graph::pass_context::RenderPassContext;
use ember_render_graph::resource::{ClearValue, TextureDesc, TextureFlags};
use ember_render_graph::resource_id::RtId;

use crate::passes::OUTPUT_FORMAT;

pub struct CompositePass {
    scene_bloom: RtId,
    final_output: RtId,
    output_format: vk::Format,
}

impl CompositePass {
    pub fn new(scene_bloom: RtId, final_output: RtId) -> Self {
        Self {
            scene_bloom,
            final_output,
            output_format: OUTPUT_FORMAT,
        }
    }
}

impl RgPass for CompositePass {
    fn build(&mut self, builder: &mut RenderPassBuilder) {
        builder.read_rt(self.scene_bloom);

        match builder.imported_texture(self.final_output) {
            Some(back_buffer) => {
                builder.new_external_rt(self.final_output, back_buffer);
                if let Some(texture) = builder.gfx().resource_manager().texture(back_buffer) {
                    self.output_format = texture.desc().format;
                }
            }
            None => {
                let size = builder.viewport_size();
                self.output_format = OUTPUT_FORMAT;
                builder.new_rt(
                    self.final_output,
                    TextureDesc::new_2d(OUTPUT_FORMAT, size.x, size.y)
                        .with_flags(TextureFlags::RENDER_TARGET | TextureFlags::SHADER_RESOURCE)
                        .with_clear_value(ClearValue::color(0.0, 0.0, 0.0, 1.0))
                        .with_initial_state(ResourceState::RENDER_TARGET),
                );
            }
        }

        builder.set_pipeline_state_desc(
            GraphicsPipelineDesc::new("composite", "fullscreen.vs.slang", "composite.ps.slang")
                .with_color_format(self.output_format)
                .with_cull_mode(vk::CullModeFlags::BACK),
        );
    }

    fn execute(&self, ctx: &mut RenderPassContext) {
        let scene = ctx.get_sr(self.scene_bloom, None, None);
        let target = ctx.get_rt(self.final_output, None, None);

        let cmd = ctx.command_buffer();
        cmd.bind_texture_views(&[scene]);
        cmd.begin_render_pass(&[(target, Some(ClearValue::color(0.0, 0.0, 0.0, 1.0)))], None);
        cmd.draw(3, 1);
        cmd.end_render_pass();
    }
}
