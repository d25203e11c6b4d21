//! 渲染器使用的 pass
//!
//! 资源链：
//! `Shadow -> CascadeShadowMap`，`SkyBox -> SceneColor / SceneDepth`，
//! 两个几何 pass 依次写入 SceneColor / SceneDepth，
//! `BloomDownsample -> Bloom`（compute），`BloomUpsample` 写 Bloom（compute），
//! `BloomComposite -> SceneBloom`，`Composite -> FinalOutput`。

mod bloom_pass;
mod composite_pass;
mod geometry_pass;
mod shadow_pass;
mod sky_box_pass;

pub use bloom_pass::{BloomCompositePass, BloomDownsamplePass, BloomUpsamplePass};
pub use composite_pass::CompositePass;
pub use geometry_pass::{GeometryKind, GeometryPass};
pub use shadow_pass::ShadowPass;
pub use sky_box_pass::SkyBoxPass;

use ash::vk;
use ember_render_graph::resource_id::{DsId, ResourceId, ResourceIdRegistry, RtId, UaId};

/// HDR 中间结果的格式
pub const HDR_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;
pub const DEPTH_FORMAT: vk::Format = vk::Format::D32_SFLOAT;
/// 没有外部 back buffer 时最终图像的格式
pub const OUTPUT_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// 渲染器注册的全部资源 id
#[derive(Clone, Copy, Debug)]
pub struct RendererResourceIds {
    pub cascade_shadow_map: DsId,
    pub scene_color: RtId,
    pub scene_depth: DsId,
    pub bloom: UaId,
    pub scene_bloom: RtId,
    pub final_output: RtId,
}

impl RendererResourceIds {
    pub fn register(registry: &mut ResourceIdRegistry) -> Self {
        Self {
            cascade_shadow_map: registry.register_ds("CascadeShadowMap"),
            scene_color: registry.register_rt("SceneColor"),
            scene_depth: registry.register_ds("SceneDepth"),
            bloom: registry.register_ua("Bloom"),
            scene_bloom: registry.register_rt("SceneBloom"),
            final_output: registry.register_rt("FinalOutput"),
        }
    }

    pub fn all(&self) -> [ResourceId; 6] {
        [
            self.cascade_shadow_map.id(),
            self.scene_color.id(),
            self.scene_depth.id(),
            self.bloom.id(),
            self.scene_bloom.id(),
            self.final_output.id(),
        ]
    }

    pub fn unregister(&self, registry: &mut ResourceIdRegistry) {
        for id in self.all() {
            registry.unregister(id);
        }
    }
}

/// 8x8 线程组覆盖 `width x height` 需要的组数
#[inline]
fn group_count_8x8(width: u32, height: u32) -> glam::UVec3 {
    glam::uvec3(width.div_ceil(8), height.div_ceil(8), 1)
}
