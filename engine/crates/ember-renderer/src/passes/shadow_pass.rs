//! 级联阴影：每个级联渲染到阴影贴图的一个 array slice

use ash::vk;
use ember_gfx::basic::resource_state::ResourceState;
use ember_gfx::pipelines::pipeline::GraphicsPipelineDesc;
use ember_render_graph::pass::RgPass;
use ember_render_graph::pass_builder::RenderPassBuilder;
use ember_render_graph::pass_context::RenderPassContext;
use ember_render_graph::resource::{ClearValue, TextureDesc, TextureFlags};
use ember_render_graph::resource_id::DsId;

use crate::config::ShadowConfig;
use crate::passes::DEPTH_FORMAT;

pub struct ShadowPass {
    shadow_map: DsId,
    settings: ShadowConfig,
}

impl ShadowPass {
    pub fn new(shadow_map: DsId, settings: ShadowConfig) -> Self {
        Self { shadow_map, settings }
    }
}

impl RgPass for ShadowPass {
    fn build(&mut self, builder: &mut RenderPassBuilder) {
        builder.set_pipeline_state_desc(
            GraphicsPipelineDesc::new("shadow-depth", "shadow_map.vs.slang", "shadow_map.ps.slang")
                .with_depth(DEPTH_FORMAT, true)
                .with_cull_mode(vk::CullModeFlags::FRONT),
        );

        let resolution = self.settings.resolution;
        builder.new_ds(
            self.shadow_map,
            TextureDesc::new_2d(DEPTH_FORMAT, resolution, resolution)
                .with_array_size(self.settings.cascade_count)
                .with_flags(TextureFlags::DEPTH_STENCIL | TextureFlags::SHADER_RESOURCE)
                .with_clear_value(ClearValue::depth(1.0, 0))
                .with_initial_state(ResourceState::DEPTH_WRITE),
        );
    }

    fn execute(&self, ctx: &mut RenderPassContext) {
        let (static_meshes, animated_meshes) = match ctx.frame_resources() {
            Some(frame) => (frame.static_meshes.clone(), frame.animated_meshes.clone()),
            None => Default::default(),
        };

        for cascade in 0..self.settings.cascade_count {
            let depth = ctx.get_ds_rw(self.shadow_map, Some(0), Some(cascade));
            let cmd = ctx.command_buffer();
            cmd.begin_render_pass(&[], Some((depth, Some(ClearValue::depth(1.0, 0)))));
            for mesh in static_meshes.iter().chain(&animated_meshes) {
                cmd.draw(mesh.vertex_count, mesh.instance_count);
            }
            cmd.end_render_pass();
        }
    }
}
