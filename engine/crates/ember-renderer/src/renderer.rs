use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::gfx::GfxDevice;
use ember_gfx::resources::handles::GfxTextureHandle;
use ember_render_graph::frame_data::SceneFrameData;
use ember_render_graph::graph::RenderGraph;
use ember_render_graph::resource_scheduler::ResourceScheduler;
use itertools::Itertools;

use crate::config::EmberConfig;
use crate::frame_counter::FrameCounter;
use crate::passes::{
    BloomCompositePass, BloomDownsamplePass, BloomUpsamplePass, CompositePass, GeometryKind, GeometryPass,
    RendererResourceIds, ShadowPass, SkyBoxPass,
};

/// 场景渲染器
///
/// 持有唯一的 [`RenderGraph`] 和每个 frame in flight 一份的 [`ResourceScheduler`]。
/// 每帧在当前槽位的 scheduler 上重新 build，上传场景数据后执行。
pub struct Renderer {
    config: EmberConfig,
    graph: RenderGraph,
    ids: RendererResourceIds,
    schedulers: Vec<ResourceScheduler>,
    frame_counter: FrameCounter,

    scene: SceneFrameData,
    viewport: glam::UVec2,
    /// 最近一次 render 使用的槽位
    last_frame_index: Option<usize>,
}

// new & init
impl Renderer {
    pub fn new(config: EmberConfig) -> Self {
        let mut graph = RenderGraph::new(config.render_graph.clone());
        let ids = RendererResourceIds::register(graph.resource_ids_mut());
        Self::add_passes(&mut graph, &ids, &config);

        let schedulers = (0..config.frames_in_flight).map(|_| ResourceScheduler::new()).collect_vec();
        log::info!(
            "renderer created: {} passes, {} frames in flight, viewport {}x{}",
            graph.passes().len(),
            config.frames_in_flight,
            config.viewport.width,
            config.viewport.height
        );

        Self {
            viewport: glam::uvec2(config.viewport.width, config.viewport.height),
            frame_counter: FrameCounter::new(0, config.frames_in_flight),
            graph,
            ids,
            schedulers,
            scene: SceneFrameData::default(),
            last_frame_index: None,
            config,
        }
    }

    fn add_passes(graph: &mut RenderGraph, ids: &RendererResourceIds, config: &EmberConfig) {
        graph.add_pass(
            "Shadow",
            QueueType::Graphics,
            ShadowPass::new(ids.cascade_shadow_map, config.shadow.clone()),
        );
        graph.add_pass(
            "SkyBox",
            QueueType::Graphics,
            SkyBoxPass::new(ids.scene_color, ids.scene_depth),
        );
        graph.add_pass(
            "StaticGeometry",
            QueueType::Graphics,
            GeometryPass::new(GeometryKind::Static, ids.cascade_shadow_map, ids.scene_color, ids.scene_depth),
        );
        graph.add_pass(
            "AnimatedGeometry",
            QueueType::Graphics,
            GeometryPass::new(GeometryKind::Animated, ids.cascade_shadow_map, ids.scene_color, ids.scene_depth),
        );
        graph.add_pass(
            "BloomDownsample",
            QueueType::Compute,
            BloomDownsamplePass::new(ids.scene_color, ids.bloom, config.bloom.clone()),
        );
        graph.add_pass(
            "BloomUpsample",
            QueueType::Compute,
            BloomUpsamplePass::new(ids.bloom, config.bloom.clone()),
        );
        graph.add_pass(
            "BloomComposite",
            QueueType::Graphics,
            BloomCompositePass::new(ids.scene_color, ids.bloom, ids.scene_bloom, config.bloom.clone()),
        );
        graph.add_pass(
            "Composite",
            QueueType::Graphics,
            CompositePass::new(ids.scene_bloom, ids.final_output),
        );
    }
}

// update
impl Renderer {
    /// 下一次 render 使用的场景数据
    pub fn submit_scene(&mut self, scene: SceneFrameData) {
        self.scene = scene;
    }

    /// 下一次 build 生效，所有依赖视口尺寸的资源随之重建
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::warn!("ignore viewport size {width}x{height}");
            return;
        }
        self.viewport = glam::uvec2(width, height);
    }

    /// 渲染一帧：build → 上传场景数据 → 录制并提交
    ///
    /// `back_buffer` 只在 `render_to_swapchain` 打开时使用，最终图像直接写入其中。
    pub fn render(&mut self, gfx: &mut GfxDevice, back_buffer: Option<GfxTextureHandle>) {
        let _span = tracy_client::span!("Renderer::render");

        let frame_index = self.frame_counter.frame_index();
        let frame_name = self.frame_counter.frame_name();
        let scheduler = &mut self.schedulers[frame_index];

        scheduler.set_viewport_size(self.viewport.x, self.viewport.y);
        scheduler.clear_imported_textures();
        if let Some(back_buffer) = back_buffer.filter(|_| self.config.render_to_swapchain) {
            scheduler.import_texture(self.ids.final_output, back_buffer);
        }

        self.graph.build(scheduler, gfx);
        scheduler.update_scene_frame_data(&self.scene, gfx);
        self.graph.execute(scheduler, gfx);

        log::debug!(
            "{frame_name} rendered {} passes in {} dependency groups",
            self.graph.ordered_passes().len(),
            self.graph.dependency_groups().len()
        );
        self.last_frame_index = Some(frame_index);
        self.frame_counter.next_frame();
    }

    /// 释放所有帧的资源并注销资源 id
    pub fn shutdown(&mut self, gfx: &mut GfxDevice) {
        for scheduler in &mut self.schedulers {
            scheduler.destroy(gfx);
        }
        self.graph.reset();
        self.ids.unregister(self.graph.resource_ids_mut());
        self.last_frame_index = None;
        log::info!("renderer shutdown after {} frames", self.frame_counter.frame_id());
    }
}

// getters
impl Renderer {
    /// 最近一帧的最终图像
    pub fn final_image(&self) -> Option<GfxTextureHandle> {
        let index = self.last_frame_index?;
        self.graph.final_output(&self.schedulers[index])
    }

    #[inline]
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    #[inline]
    pub fn resource_ids(&self) -> &RendererResourceIds {
        &self.ids
    }

    #[inline]
    pub fn frame_counter(&self) -> &FrameCounter {
        &self.frame_counter
    }

    #[inline]
    pub fn config(&self) -> &EmberConfig {
        &self.config
    }

    #[inline]
    pub fn viewport_size(&self) -> glam::UVec2 {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use ember_gfx::basic::resource_state::ResourceState;
    use ember_gfx::commands::command_buffer::GfxCommand;
    use ember_gfx::commands::queue::GfxQueueOp;
    use ember_render_graph::frame_data::MeshDraw;
    use ember_render_graph::graph::RenderPassEvent;
    use ember_render_graph::resource::{TextureDesc, TextureFlags};

    use super::*;
    use crate::config::{ShadowConfig, ViewportConfig};

    fn test_config() -> EmberConfig {
        EmberConfig {
            frames_in_flight: 2,
            viewport: ViewportConfig { width: 64, height: 32 },
            shadow: ShadowConfig {
                cascade_count: 2,
                resolution: 128,
            },
            ..Default::default()
        }
    }

    fn test_scene() -> SceneFrameData {
        SceneFrameData {
            static_meshes: vec![
                MeshDraw {
                    vertex_count: 36,
                    instance_count: 4,
                },
                MeshDraw {
                    vertex_count: 6,
                    instance_count: 1,
                },
            ],
            animated_meshes: vec![MeshDraw {
                vertex_count: 900,
                instance_count: 1,
            }],
            bone_transforms: vec![glam::Mat4::IDENTITY; 8],
            ..Default::default()
        }
    }

    fn create_back_buffer(gfx: &mut GfxDevice, width: u32, height: u32) -> GfxTextureHandle {
        let desc = TextureDesc::new_2d(ash::vk::Format::B8G8R8A8_UNORM, width, height)
            .with_flags(TextureFlags::RENDER_TARGET)
            .with_initial_state(ResourceState::PRESENT);
        gfx.resource_manager_mut().create_texture(&desc, "swapchain-image")
    }

    fn pass_names(renderer: &Renderer) -> Vec<&str> {
        let graph = renderer.graph();
        graph.ordered_passes().iter().map(|&id| graph.pass(id).name()).collect_vec()
    }

    fn pass_event<'a>(renderer: &'a Renderer, name: &str) -> &'a RenderPassEvent {
        let graph = renderer.graph();
        let pass = graph.passes().iter().find(|p| p.name() == name).unwrap();
        graph
            .events(pass.queue())
            .iter()
            .filter_map(|event| event.as_pass())
            .find(|event| event.pass == pass.id())
            .unwrap()
    }

    fn draw_count(event: &RenderPassEvent) -> usize {
        event
            .pass_command_buffer
            .commands()
            .iter()
            .filter(|cmd| matches!(cmd, GfxCommand::Draw { .. }))
            .count()
    }

    #[test]
    fn test_frame_schedule() {
        let mut gfx = GfxDevice::new_headless();
        let back_buffer = create_back_buffer(&mut gfx, 64, 32);
        let mut renderer = Renderer::new(test_config());
        renderer.submit_scene(test_scene());
        renderer.render(&mut gfx, Some(back_buffer));

        assert_eq!(
            pass_names(&renderer),
            vec![
                "Shadow",
                "SkyBox",
                "StaticGeometry",
                "AnimatedGeometry",
                "BloomDownsample",
                "BloomUpsample",
                "BloomComposite",
                "Composite",
            ]
        );
        let graph = renderer.graph();
        let groups = graph
            .ordered_passes()
            .iter()
            .map(|&id| graph.pass(id).dependency_group())
            .collect_vec();
        assert_eq!(groups, vec![0, 0, 1, 2, 3, 4, 5, 6]);

        let compute_passes = graph
            .passes()
            .iter()
            .filter(|p| p.queue() == QueueType::Compute)
            .map(|p| p.name())
            .collect_vec();
        assert_eq!(compute_passes, vec!["BloomDownsample", "BloomUpsample"]);

        // SceneColor 从 RT 转到 compute 读，compute 队列不支持，由 graphics 队列代为转换
        let redirected = graph.dependency_groups()[3].redirected_barriers();
        assert_eq!(redirected.len(), 1);
        assert_eq!(redirected[0].resource, "SceneColor");
        assert_eq!(redirected[0].before, ResourceState::RENDER_TARGET);
        assert_eq!(redirected[0].after, ResourceState::NON_PIXEL_SHADER_READ);

        assert_eq!(renderer.final_image(), Some(back_buffer));
    }

    #[test]
    fn test_compute_queue_ops() {
        let mut gfx = GfxDevice::new_headless();
        let mut renderer = Renderer::new(test_config());
        renderer.submit_scene(test_scene());
        renderer.render(&mut gfx, None);

        let graphics_fence = GfxDevice::fence_name(QueueType::Graphics);
        let compute_fence = GfxDevice::fence_name(QueueType::Compute);
        let ops = gfx.queue(QueueType::Compute).ops();
        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], GfxQueueOp::Wait { fence, .. } if *fence == graphics_fence));
        assert_eq!(
            ops[1],
            GfxQueueOp::Submit {
                command_buffers: vec![
                    "BloomDownsample".to_string(),
                    "BloomUpsample-pre".to_string(),
                    "BloomUpsample".to_string(),
                ]
            }
        );
        assert!(matches!(&ops[2], GfxQueueOp::Signal { fence, .. } if *fence == compute_fence));

        // BloomComposite 在 graphics 队列上等待 compute
        let graphics_ops = gfx.queue(QueueType::Graphics).ops();
        assert!(
            graphics_ops
                .iter()
                .any(|op| matches!(op, GfxQueueOp::Wait { fence, .. } if *fence == compute_fence))
        );
        assert!(gfx.queue(QueueType::Copy).ops().is_empty());
    }

    #[test]
    fn test_draws_follow_scene() {
        let mut gfx = GfxDevice::new_headless();
        let mut renderer = Renderer::new(test_config());
        renderer.submit_scene(test_scene());
        renderer.render(&mut gfx, None);

        assert_eq!(draw_count(pass_event(&renderer, "StaticGeometry")), 2);
        assert_eq!(draw_count(pass_event(&renderer, "AnimatedGeometry")), 1);
        // 每个级联绘制全部网格
        assert_eq!(draw_count(pass_event(&renderer, "Shadow")), 2 * 3);

        let dispatches = |name: &str| {
            pass_event(&renderer, name)
                .pass_command_buffer
                .commands()
                .iter()
                .filter(|cmd| matches!(cmd, GfxCommand::Dispatch { .. }))
                .count()
        };
        // 64x32 的完整 mip 链为 7 级
        assert_eq!(dispatches("BloomDownsample"), 7);
        assert_eq!(dispatches("BloomUpsample"), 6);
    }

    #[test]
    fn test_offscreen_output() {
        let mut gfx = GfxDevice::new_headless();
        let back_buffer = create_back_buffer(&mut gfx, 64, 32);
        let mut renderer = Renderer::new(EmberConfig {
            render_to_swapchain: false,
            ..test_config()
        });
        renderer.render(&mut gfx, Some(back_buffer));

        let image = renderer.final_image().unwrap();
        assert_ne!(image, back_buffer);
        let desc = gfx.resource_manager().texture(image).unwrap().desc();
        assert_eq!(desc.format, crate::passes::OUTPUT_FORMAT);
        assert_eq!((desc.width, desc.height), (64, 32));
        // 没有外部资源，不需要 PRESENT 转换
        assert!(pass_event(&renderer, "Composite").post_barriers.is_empty());
    }

    #[test]
    fn test_back_buffer_is_presented() {
        let mut gfx = GfxDevice::new_headless();
        let back_buffer = create_back_buffer(&mut gfx, 64, 32);
        let mut renderer = Renderer::new(test_config());
        renderer.render(&mut gfx, Some(back_buffer));

        let post = &pass_event(&renderer, "Composite").post_barriers;
        assert_eq!(post.len(), 1);
        assert_eq!(post[0].texture, back_buffer);
        assert_eq!(post[0].before, ResourceState::RENDER_TARGET);
        assert_eq!(post[0].after, ResourceState::PRESENT);
    }

    #[test]
    fn test_frames_in_flight_reuse_slots() {
        let mut gfx = GfxDevice::new_headless();
        let back_buffers = [
            create_back_buffer(&mut gfx, 64, 32),
            create_back_buffer(&mut gfx, 64, 32),
        ];
        let mut renderer = Renderer::new(test_config());
        renderer.submit_scene(test_scene());

        let mut texture_counts = Vec::new();
        for frame in 0..6 {
            renderer.render(&mut gfx, Some(back_buffers[frame % 2]));
            assert_eq!(renderer.final_image(), Some(back_buffers[frame % 2]));
            texture_counts.push(gfx.resource_manager().texture_count());
        }
        assert_eq!(renderer.frame_counter().frame_id(), 6);
        // 两个槽位都分配过之后，纹理数量保持不变
        assert!(texture_counts[1..].iter().all(|&count| count == texture_counts[1]));
        assert!(texture_counts[0] < texture_counts[1]);

        renderer.shutdown(&mut gfx);
        assert_eq!(gfx.resource_manager().texture_count(), back_buffers.len());
        assert_eq!(gfx.resource_manager().texture_view_count(), 0);
        assert_eq!(renderer.graph().resource_ids().registered_count(), 0);
        assert!(renderer.final_image().is_none());
    }

    #[test]
    fn test_viewport_resize() {
        let mut gfx = GfxDevice::new_headless();
        let mut renderer = Renderer::new(test_config());
        renderer.set_viewport_size(0, 10);
        assert_eq!(renderer.viewport_size(), glam::uvec2(64, 32));

        renderer.set_viewport_size(16, 8);
        renderer.render(&mut gfx, None);
        let image = renderer.final_image().unwrap();
        let desc = gfx.resource_manager().texture(image).unwrap().desc();
        assert_eq!((desc.width, desc.height), (16, 8));
    }

    #[test]
    fn test_async_compute_disabled() {
        let mut config = test_config();
        config.render_graph.async_compute = false;

        let mut gfx = GfxDevice::new_headless();
        let mut renderer = Renderer::new(config);
        renderer.render(&mut gfx, None);

        let graph = renderer.graph();
        assert!(graph.passes().iter().all(|p| p.queue() == QueueType::Graphics));
        assert!(graph.dependency_groups().iter().all(|g| g.redirected_barriers().is_empty()));
        assert!(gfx.queue(QueueType::Compute).ops().is_empty());
        assert!(
            gfx.queue(QueueType::Graphics)
                .ops()
                .iter()
                .all(|op| matches!(op, GfxQueueOp::Submit { .. }))
        );
    }
}
