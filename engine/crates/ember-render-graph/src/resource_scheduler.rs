//! 资源调度器
//!
//! 每个 frame in flight 一份：保存本帧的资源表、每个 pass 的输入/输出视图、pass 使用的管线，
//! 记录每个资源当前的状态并决定状态转换是否需要显式 barrier。
//! 另外负责上传所有 pass 共享的每帧场景数据。

use std::collections::HashMap;

use ash::vk;
use ember_gfx::basic::queue_type::QueueType;
use ember_gfx::basic::resource_state::ResourceState;
use ember_gfx::commands::barrier::TransitionBarrier;
use ember_gfx::gfx::GfxDevice;
use ember_gfx::pipelines::pipeline::PipelineDesc;
use ember_gfx::resources::handles::{GfxBufferHandle, GfxPipelineHandle, GfxTextureHandle};
use ember_gfx::resources::manager::GfxResourceManager;

use crate::frame_data::{FrameConstants, FrameResources, Light, SceneFrameData};
use crate::pass::PassId;
use crate::resource::{RenderSurfaceResource, Resource, SurfaceKind, TextureDesc, TextureResource};
use crate::resource_id::ResourceId;
use crate::resource_view::{ResourceView, ResourceViewKind};

#[derive(Default)]
pub struct ResourceScheduler {
    /// 以 `ResourceId` 为下标的资源槽位
    resources: Vec<Option<Resource>>,
    current_states: Vec<ResourceState>,

    pass_inputs: Vec<Vec<ResourceView>>,
    pass_outputs: Vec<Vec<ResourceView>>,
    pass_pipelines: Vec<Option<GfxPipelineHandle>>,

    /// 外部传入的纹理（例如 back buffer），由 pass 在 build 时包装为外部资源
    imported_textures: HashMap<ResourceId, GfxTextureHandle>,
    viewport: glam::UVec2,

    frame_resources: Option<FrameResources>,
}

// new & init
impl ResourceScheduler {
    pub fn new() -> Self {
        Self {
            viewport: glam::uvec2(1, 1),
            ..Default::default()
        }
    }

    /// 释放所有资源和每帧数据 buffer
    pub fn destroy(&mut self, gfx: &mut GfxDevice) {
        let rm = gfx.resource_manager_mut();
        self.free_resources(rm);
        if let Some(frame_resources) = self.frame_resources.take() {
            rm.destroy_buffer(frame_resources.constant_buffer);
            rm.destroy_buffer(frame_resources.lights_buffer);
            rm.destroy_buffer(frame_resources.bone_transforms_buffer);
        }
    }

    fn free_resources(&mut self, rm: &mut GfxResourceManager) {
        for resource in self.resources.iter_mut().flatten() {
            resource.free(rm);
        }
        self.resources.clear();
    }
}

// scheduling
impl ResourceScheduler {
    /// 开始新一轮调度：释放上一轮的资源与视图，状态全部重置为 `COMMON`
    pub fn begin_scheduling(&mut self, num_passes: usize, num_resource_slots: usize, gfx: &mut GfxDevice) {
        self.free_resources(gfx.resource_manager_mut());
        self.resources.resize_with(num_resource_slots, || None);

        self.current_states.clear();
        self.current_states.resize(num_resource_slots, ResourceState::COMMON);

        self.pass_inputs.clear();
        self.pass_inputs.resize_with(num_passes, Vec::new);
        self.pass_outputs.clear();
        self.pass_outputs.resize_with(num_passes, Vec::new);
        self.pass_pipelines.clear();
        self.pass_pipelines.resize(num_passes, None);
    }

    /// 所有 pass 声明完毕后统一分配资源
    pub fn end_scheduling(&mut self, gfx: &mut GfxDevice) {
        let _span = tracy_client::span!("ResourceScheduler::end_scheduling");

        let rm = gfx.resource_manager_mut();
        for resource in self.resources.iter_mut().flatten() {
            resource.allocate(rm);
        }
    }

    pub fn create_resource(&mut self, resource: Resource) {
        let index = resource.id().index();
        assert!(
            index < self.resources.len(),
            "Resource {} has an unregistered id {}",
            resource.name(),
            resource.id()
        );
        assert!(self.resources[index].is_none(), "Resource already created! ({})", resource.name());

        self.current_states[index] = resource.desc().initial_state;
        self.resources[index] = Some(resource);
    }

    pub fn create_texture(&mut self, id: ResourceId, name: &str, desc: TextureDesc, producer: PassId) {
        self.create_resource(Resource::Texture(TextureResource::new(id, name, desc, producer)));
    }

    pub fn create_surface(&mut self, id: ResourceId, name: &str, kind: SurfaceKind, desc: TextureDesc, producer: PassId) {
        self.create_resource(Resource::Surface(RenderSurfaceResource::new(id, name, kind, desc, producer)));
    }

    /// 包装外部纹理，帧开始时不会释放其主对象
    pub fn create_external_texture(
        &mut self,
        id: ResourceId,
        name: &str,
        texture: GfxTextureHandle,
        desc: TextureDesc,
        producer: PassId,
    ) {
        self.create_resource(Resource::Texture(TextureResource::new_external(
            id, name, texture, desc, producer,
        )));
    }

    pub fn create_external_surface(
        &mut self,
        id: ResourceId,
        name: &str,
        kind: SurfaceKind,
        texture: GfxTextureHandle,
        desc: TextureDesc,
        producer: PassId,
    ) {
        self.create_resource(Resource::Surface(RenderSurfaceResource::new_external(
            id, name, kind, texture, desc, producer,
        )));
    }

    pub(crate) fn create_resource_view(&mut self, pass: PassId, resource: ResourceId, kind: ResourceViewKind) {
        let view = ResourceView { pass, resource, kind };
        if view.is_read_only() {
            self.pass_inputs[pass].push(view);
        } else {
            self.pass_outputs[pass].push(view);
        }
    }

    pub fn assign_pipeline(&mut self, pass: PassId, desc: &PipelineDesc, gfx: &mut GfxDevice) {
        self.pass_pipelines[pass] = Some(gfx.load_pipeline(desc));
    }
}

// state
impl ResourceScheduler {
    /// 记录资源的新状态
    ///
    /// 状态不变，或者可以先隐式退回 `COMMON` 再隐式提升到新状态时返回 `None`；
    /// 否则返回需要录制的 barrier。
    pub fn transition_resource(&mut self, id: ResourceId, new_state: ResourceState) -> Option<TransitionBarrier> {
        let resource = self.resources[id.index()]
            .as_ref()
            .unwrap_or_else(|| panic!("Transition of missing resource {id}"));
        let current_state = self.current_states[id.index()];
        if current_state == new_state {
            return None;
        }

        self.current_states[id.index()] = new_state;

        let can_decay = current_state == ResourceState::COMMON || resource.can_decay_to_common_from(current_state);
        if can_decay && resource.can_promote_from_common_to(new_state) {
            return None;
        }

        Some(TransitionBarrier {
            resource: resource.name().to_string(),
            texture: resource.main_texture().unwrap_or_default(),
            before: current_state,
            after: new_state,
            subresource: None,
        })
    }

    #[inline]
    pub fn current_state(&self, id: ResourceId) -> ResourceState {
        self.current_states[id.index()]
    }

    #[inline]
    pub fn is_transition_supported_on_queue(before: ResourceState, after: ResourceState, queue: QueueType) -> bool {
        queue.supports_state(before) && queue.supports_state(after)
    }
}

// getters
impl ResourceScheduler {
    #[inline]
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index()).and_then(|r| r.as_ref())
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().flatten()
    }

    #[inline]
    pub fn pass_inputs(&self, pass: PassId) -> &[ResourceView] {
        &self.pass_inputs[pass]
    }

    #[inline]
    pub fn pass_outputs(&self, pass: PassId) -> &[ResourceView] {
        &self.pass_outputs[pass]
    }

    /// pass 的全部视图：先输入后输出，各自保持声明顺序
    pub fn pass_views(&self, pass: PassId) -> impl Iterator<Item = &ResourceView> {
        self.pass_inputs[pass].iter().chain(self.pass_outputs[pass].iter())
    }

    #[inline]
    pub fn pass_view(&self, pass: PassId, id: ResourceId) -> Option<&ResourceView> {
        self.pass_views(pass).find(|view| view.resource == id)
    }

    #[inline]
    pub fn is_resource_scheduled_for_pass(&self, pass: PassId, id: ResourceId) -> bool {
        self.pass_view(pass, id).is_some()
    }

    #[inline]
    pub fn pass_pipeline(&self, pass: PassId) -> Option<GfxPipelineHandle> {
        self.pass_pipelines.get(pass).copied().flatten()
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.pass_inputs.len()
    }
}

// 外部输入
impl ResourceScheduler {
    pub fn import_texture(&mut self, id: impl Into<ResourceId>, texture: GfxTextureHandle) {
        self.imported_textures.insert(id.into(), texture);
    }

    pub fn clear_imported_textures(&mut self) {
        self.imported_textures.clear();
    }

    #[inline]
    pub fn imported_texture(&self, id: impl Into<ResourceId>) -> Option<GfxTextureHandle> {
        self.imported_textures.get(&id.into()).copied()
    }

    #[inline]
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.viewport = glam::uvec2(width.max(1), height.max(1));
    }

    #[inline]
    pub fn viewport_size(&self) -> glam::UVec2 {
        self.viewport
    }
}

// 每帧场景数据
impl ResourceScheduler {
    /// 上传相机常量、光源列表和骨骼矩阵；元素数量变化时重建对应的 structured buffer
    pub fn update_scene_frame_data(&mut self, data: &SceneFrameData, gfx: &mut GfxDevice) {
        let _span = tracy_client::span!("ResourceScheduler::update_scene_frame_data");

        let rm = gfx.resource_manager_mut();
        let light_count = data.lights.len() as u32;
        let bone_count = data.bone_transforms.len() as u32;

        let mut frame_resources = match self.frame_resources.take() {
            Some(frame_resources) => frame_resources,
            None => FrameResources {
                constant_buffer: rm.create_buffer(
                    size_of::<FrameConstants>() as vk::DeviceSize,
                    vk::BufferUsageFlags::UNIFORM_BUFFER,
                    "FrameConstants",
                ),
                lights_buffer: Self::create_structured_buffer::<Light>(rm, light_count, "Lights"),
                bone_transforms_buffer: Self::create_structured_buffer::<glam::Mat4>(rm, bone_count, "BoneTransforms"),
                light_count,
                bone_count,
                static_meshes: Vec::new(),
                animated_meshes: Vec::new(),
            },
        };

        if frame_resources.light_count != light_count {
            rm.destroy_buffer(frame_resources.lights_buffer);
            frame_resources.lights_buffer = Self::create_structured_buffer::<Light>(rm, light_count, "Lights");
            frame_resources.light_count = light_count;
        }
        if frame_resources.bone_count != bone_count {
            rm.destroy_buffer(frame_resources.bone_transforms_buffer);
            frame_resources.bone_transforms_buffer =
                Self::create_structured_buffer::<glam::Mat4>(rm, bone_count, "BoneTransforms");
            frame_resources.bone_count = bone_count;
        }

        rm.write_buffer(frame_resources.constant_buffer, 0, &[FrameConstants::from_scene(data)]);
        rm.write_buffer(frame_resources.lights_buffer, 0, &data.lights);
        rm.write_buffer(frame_resources.bone_transforms_buffer, 0, &data.bone_transforms);

        frame_resources.static_meshes.clone_from(&data.static_meshes);
        frame_resources.animated_meshes.clone_from(&data.animated_meshes);
        self.frame_resources = Some(frame_resources);
    }

    fn create_structured_buffer<T>(rm: &mut GfxResourceManager, count: u32, name: &str) -> GfxBufferHandle {
        // 至少保留一个元素，空列表也能绑定
        let size = (size_of::<T>() * count.max(1) as usize) as vk::DeviceSize;
        rm.create_buffer(size, vk::BufferUsageFlags::STORAGE_BUFFER, name)
    }

    #[inline]
    pub fn frame_resources(&self) -> Option<&FrameResources> {
        self.frame_resources.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{RenderSurfaceResource, SurfaceKind, TextureDesc, TextureFlags, TextureResource};
    use crate::resource_id::ResourceIdRegistry;

    fn color_desc() -> TextureDesc {
        TextureDesc::new_2d(vk::Format::R16G16B16A16_SFLOAT, 32, 32)
            .with_flags(TextureFlags::RENDER_TARGET | TextureFlags::SHADER_RESOURCE)
            .with_initial_state(ResourceState::RENDER_TARGET)
    }

    fn scheduler_with_color(gfx: &mut GfxDevice) -> (ResourceScheduler, ResourceId) {
        let mut registry = ResourceIdRegistry::new();
        let id = registry.register("SceneColor");
        let mut scheduler = ResourceScheduler::new();
        scheduler.begin_scheduling(2, registry.slot_count(), gfx);
        scheduler.create_resource(Resource::Surface(RenderSurfaceResource::new(
            id,
            "SceneColor",
            SurfaceKind::RenderTarget,
            color_desc(),
            0,
        )));
        scheduler.end_scheduling(gfx);
        (scheduler, id)
    }

    #[test]
    fn test_transition_resource() {
        let mut gfx = GfxDevice::new_headless();
        let (mut scheduler, id) = scheduler_with_color(&mut gfx);

        assert_eq!(scheduler.current_state(id), ResourceState::RENDER_TARGET);
        assert!(scheduler.transition_resource(id, ResourceState::RENDER_TARGET).is_none());

        let barrier = scheduler.transition_resource(id, ResourceState::PIXEL_SHADER_READ).unwrap();
        assert_eq!(barrier.before, ResourceState::RENDER_TARGET);
        assert_eq!(barrier.after, ResourceState::PIXEL_SHADER_READ);
        assert_eq!(barrier.resource, "SceneColor");
        assert_eq!(Some(barrier.texture), scheduler.resource(id).unwrap().main_texture());

        // 读状态之间可以经由 COMMON 隐式转换
        assert!(scheduler.transition_resource(id, ResourceState::COPY_SOURCE).is_none());
        assert_eq!(scheduler.current_state(id), ResourceState::COPY_SOURCE);
    }

    #[test]
    fn test_promote_from_common() {
        let mut gfx = GfxDevice::new_headless();
        let mut registry = ResourceIdRegistry::new();
        let id = registry.register("Bloom");
        let mut scheduler = ResourceScheduler::new();
        scheduler.begin_scheduling(1, 1, &mut gfx);
        scheduler.create_resource(Resource::Texture(TextureResource::new(
            id,
            "Bloom",
            TextureDesc::default().with_flags(TextureFlags::UNORDERED_ACCESS),
            0,
        )));
        scheduler.end_scheduling(&mut gfx);

        assert!(scheduler.transition_resource(id, ResourceState::NON_PIXEL_SHADER_READ).is_none());
        assert!(scheduler.transition_resource(id, ResourceState::UNORDERED_ACCESS).is_some());
    }

    #[test]
    #[should_panic(expected = "Resource already created!")]
    fn test_create_twice() {
        let mut gfx = GfxDevice::new_headless();
        let (mut scheduler, id) = scheduler_with_color(&mut gfx);
        scheduler.create_resource(Resource::Surface(RenderSurfaceResource::new(
            id,
            "SceneColor",
            SurfaceKind::RenderTarget,
            color_desc(),
            1,
        )));
    }

    #[test]
    fn test_begin_scheduling_frees_resources() {
        let mut gfx = GfxDevice::new_headless();
        let (mut scheduler, id) = scheduler_with_color(&mut gfx);
        scheduler.create_resource_view(1, id, ResourceViewKind::ShaderResource);
        assert!(scheduler.is_resource_scheduled_for_pass(1, id));
        assert_eq!(gfx.resource_manager().texture_count(), 1);

        scheduler.begin_scheduling(2, 1, &mut gfx);
        assert_eq!(gfx.resource_manager().texture_count(), 0);
        assert_eq!(gfx.resource_manager().texture_view_count(), 0);
        assert!(scheduler.resource(id).is_none());
        assert!(!scheduler.is_resource_scheduled_for_pass(1, id));
        assert_eq!(scheduler.current_state(id), ResourceState::COMMON);
    }

    #[test]
    fn test_queue_support() {
        let rt = ResourceState::RENDER_TARGET;
        let read = ResourceState::NON_PIXEL_SHADER_READ;
        assert!(!ResourceScheduler::is_transition_supported_on_queue(rt, read, QueueType::Compute));
        assert!(ResourceScheduler::is_transition_supported_on_queue(rt, read, QueueType::Graphics));
        assert!(ResourceScheduler::is_transition_supported_on_queue(
            ResourceState::UNORDERED_ACCESS,
            read,
            QueueType::Compute
        ));
        assert!(!ResourceScheduler::is_transition_supported_on_queue(
            ResourceState::COPY_DESTINATION,
            read,
            QueueType::Copy
        ));
    }

    #[test]
    fn test_scene_frame_data_upload() {
        let mut gfx = GfxDevice::new_headless();
        let mut scheduler = ResourceScheduler::new();

        let mut data = SceneFrameData::default();
        data.lights.push(Light::point(glam::Vec3::ONE, 10.0, glam::Vec3::ONE, 1.0));
        scheduler.update_scene_frame_data(&data, &mut gfx);

        let frame = scheduler.frame_resources().unwrap().clone();
        assert_eq!(frame.light_count, 1);
        let constants = gfx.resource_manager().buffer(frame.constant_buffer).unwrap();
        assert_eq!(constants.read::<FrameConstants>(0).unwrap().light_count, 1);

        // 光源数量变化时重建 buffer，常量 buffer 保持不变
        data.lights.push(Light::point(glam::Vec3::ZERO, 5.0, glam::Vec3::X, 2.0));
        scheduler.update_scene_frame_data(&data, &mut gfx);
        let updated = scheduler.frame_resources().unwrap();
        assert_eq!(updated.constant_buffer, frame.constant_buffer);
        assert_ne!(updated.lights_buffer, frame.lights_buffer);
        let lights = gfx.resource_manager().buffer(updated.lights_buffer).unwrap();
        assert_eq!(lights.read::<Light>(1).unwrap().range, 5.0);
        assert_eq!(gfx.resource_manager().buffer_count(), 3);

        scheduler.destroy(&mut gfx);
        assert_eq!(gfx.resource_manager().buffer_count(), 0);
    }
}
