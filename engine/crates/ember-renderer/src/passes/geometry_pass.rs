//! 几何体：静态网格和蒙皮网格各一个 pass，写入同一组场景颜色与深度

use std::fmt;

use ash::vk;
use ember_gfx::pipelines::pipeline::GraphicsPipelineDesc;
use ember_render_graph::frame_data::MeshDraw;
use ember_render_graph::pass::RgPass;
use ember_render_graph::pass_builder::RenderPassBuilder;
use ember_render_graph::pass_context::RenderPassContext;
use ember_render_graph::resource_id::{DsId, RtId};

use crate::passes::{DEPTH_FORMAT, HDR_FORMAT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeometryKind {
    Static,
    /// 顶点着色器读取骨骼矩阵
    Animated,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "static"),
            Self::Animated => write!(f, "animated"),
        }
    }
}

pub struct GeometryPass {
    kind: GeometryKind,
    shadow_map: DsId,
    scene_color: RtId,
    scene_depth: DsId,
}

impl GeometryPass {
    pub fn new(kind: GeometryKind, shadow_map: DsId, scene_color: RtId, scene_depth: DsId) -> Self {
        Self {
            kind,
            shadow_map,
            scene_color,
            scene_depth,
        }
    }

    fn vertex_shader(&self) -> &'static str {
        match self.kind {
            GeometryKind::Static => "mesh_pbr.vs.slang",
            GeometryKind::Animated => "mesh_pbr_skinned.vs.slang",
        }
    }
}

impl RgPass for GeometryPass {
    fn build(&mut self, builder: &mut RenderPassBuilder) {
        builder.set_pipeline_state_desc(
            GraphicsPipelineDesc::new(format!("mesh-pbr-{}", self.kind), self.vertex_shader(), "mesh_pbr.ps.slang")
                .with_color_format(HDR_FORMAT)
                .with_depth(DEPTH_FORMAT, true)
                .with_cull_mode(vk::CullModeFlags::BACK),
        );

        builder.read_ds(self.shadow_map, true);
        builder.write_rt(self.scene_color);
        builder.write_ds(self.scene_depth);
    }

    fn execute(&self, ctx: &mut RenderPassContext) {
        let meshes: Vec<MeshDraw> = match (ctx.frame_resources(), self.kind) {
            (Some(frame), GeometryKind::Static) => frame.static_meshes.clone(),
            (Some(frame), GeometryKind::Animated) => frame.animated_meshes.clone(),
            (None, _) => Vec::new(),
        };
        if meshes.is_empty() {
            log::trace!("{} has nothing to draw", ctx.pass_name());
        }

        let shadow_map = ctx.get_sr(self.shadow_map, None, None);
        let color = ctx.get_rt(self.scene_color, None, None);
        let depth = ctx.get_ds_rw(self.scene_depth, None, None);

        let cmd = ctx.command_buffer();
        cmd.bind_texture_views(&[shadow_map]);
        cmd.begin_render_pass(&[(color, None)], Some((depth, None)));
        for mesh in &meshes {
            cmd.draw(mesh.vertex_count, mesh.instance_count);
        }
        cmd.end_render_pass();
    }
}
