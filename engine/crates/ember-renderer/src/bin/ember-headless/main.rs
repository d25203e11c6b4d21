//! 不依赖窗口和 GPU 的 Ember 渲染器
//!
//! 用法：`ember-headless [config.toml]`，缺省读取 `config/ember.toml`。

use std::path::PathBuf;

use anyhow::Context;
use ash::vk;
use ember_crate_tools::init_log::{init_log, parse_level};
use ember_crate_tools::resource::EmberPath;
use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::basic::resource_state::ResourceState;
use ember_gfx::gfx::GfxDevice;
use ember_gfx::resources::handles::GfxTextureHandle;
use ember_render_graph::frame_data::{CameraData, Light, MeshDraw, SceneFrameData};
use ember_render_graph::resource::{TextureDesc, TextureFlags};
use ember_renderer::config::EmberConfig;
use ember_renderer::renderer::Renderer;
use itertools::Itertools;

/// 模拟 swapchain 的 back buffer，每个 frame in flight 一张
fn create_back_buffers(gfx: &mut GfxDevice, config: &EmberConfig) -> Vec<GfxTextureHandle> {
    let desc = TextureDesc::new_2d(
        vk::Format::B8G8R8A8_UNORM,
        config.viewport.width,
        config.viewport.height,
    )
    .with_flags(TextureFlags::RENDER_TARGET)
    .with_initial_state(ResourceState::PRESENT);

    (0..config.frames_in_flight)
        .map(|index| gfx.resource_manager_mut().create_texture(&desc, format!("swapchain-image-{index}")))
        .collect_vec()
}

fn demo_scene(config: &EmberConfig) -> SceneFrameData {
    let aspect = config.viewport.width as f32 / config.viewport.height as f32;
    let position = glam::vec3(0.0, 2.0, 6.0);
    SceneFrameData {
        camera: CameraData {
            view: glam::Mat4::look_at_rh(position, glam::Vec3::ZERO, glam::Vec3::Y),
            projection: glam::Mat4::perspective_rh(60f32.to_radians(), aspect, 0.1, 100.0),
            position,
            exposure: 1.0,
        },
        lights: vec![
            Light::directional(glam::vec3(-0.3, -1.0, -0.2).normalize(), glam::Vec3::ONE, 3.0),
            Light::point(glam::vec3(1.5, 1.0, 0.0), 8.0, glam::vec3(1.0, 0.6, 0.3), 20.0),
        ],
        bone_transforms: vec![glam::Mat4::IDENTITY; 32],
        static_meshes: vec![
            // 地面
            MeshDraw {
                vertex_count: 6,
                instance_count: 1,
            },
            MeshDraw {
                vertex_count: 36,
                instance_count: 16,
            },
        ],
        animated_meshes: vec![MeshDraw {
            vertex_count: 2904,
            instance_count: 1,
        }],
    }
}

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(EmberPath::default_config_path);
    let config = EmberConfig::load(&config_path).with_context(|| format!("加载配置失败: {:?}", config_path))?;

    init_log(parse_level(&config.log.level));
    log::info!("config: {:?}", config_path);

    let mut gfx = GfxDevice::new_headless();
    tracy_client::set_thread_name!("RenderThread");
    let back_buffers = create_back_buffers(&mut gfx, &config);

    let mut renderer = Renderer::new(config.clone());
    renderer.submit_scene(demo_scene(&config));
    for frame in 0..config.frames as usize {
        let back_buffer = back_buffers[frame % back_buffers.len()];
        renderer.render(&mut gfx, Some(back_buffer));
        tracy_client::frame_mark();
        log::info!(
            "{} final image {:?}",
            renderer.frame_counter().frame_name(),
            renderer.final_image()
        );
    }

    for queue in QueueType::ALL {
        let stats = gfx.queue(queue).stats();
        log::info!(
            "{queue} queue: {} submits, {} command buffers, {} waits, {} signals, fence at {}",
            stats.submits,
            stats.command_buffers,
            stats.waits,
            stats.signals,
            gfx.fence(queue).completed_value()
        );
    }

    renderer.shutdown(&mut gfx);
    for back_buffer in back_buffers {
        gfx.resource_manager_mut().destroy_texture(back_buffer);
    }
    gfx.destroy();
    Ok(())
}
