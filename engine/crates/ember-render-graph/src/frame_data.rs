//! 每帧共享的场景数据
//!
//! 场景层在 `execute` 之前通过 `ResourceScheduler::update_scene_frame_data` 推送，
//! 上传后以 [`FrameResources`] 的形式暴露给所有 pass。

use bytemuck::{Pod, Zeroable};
use ember_gfx::resources::handles::GfxBufferHandle;

/// 相机数据
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraData {
    pub view: glam::Mat4,
    pub projection: glam::Mat4,
    pub position: glam::Vec3,
    pub exposure: f32,
}

impl Default for CameraData {
    fn default() -> Self {
        Self {
            view: glam::Mat4::IDENTITY,
            projection: glam::Mat4::IDENTITY,
            position: glam::Vec3::ZERO,
            exposure: 1.0,
        }
    }
}

#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LightType {
    #[default]
    Directional = 0,
    Point = 1,
    Spot = 2,
}

/// GPU 侧的光源结构
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Light {
    pub position: glam::Vec3,
    pub range: f32,
    pub color: glam::Vec3,
    pub intensity: f32,
    pub direction: glam::Vec3,
    pub light_type: u32,
}

impl Light {
    pub fn directional(direction: glam::Vec3, color: glam::Vec3, intensity: f32) -> Self {
        Self {
            position: glam::Vec3::ZERO,
            range: f32::MAX,
            color,
            intensity,
            direction: direction.normalize_or_zero(),
            light_type: LightType::Directional as u32,
        }
    }

    pub fn point(position: glam::Vec3, range: f32, color: glam::Vec3, intensity: f32) -> Self {
        Self {
            position,
            range,
            color,
            intensity,
            direction: glam::Vec3::ZERO,
            light_type: LightType::Point as u32,
        }
    }
}

/// 一次绘制
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshDraw {
    pub vertex_count: u32,
    pub instance_count: u32,
}

/// 场景层每帧推送的数据
#[derive(Clone, Debug, Default)]
pub struct SceneFrameData {
    pub camera: CameraData,
    pub lights: Vec<Light>,
    pub bone_transforms: Vec<glam::Mat4>,
    pub static_meshes: Vec<MeshDraw>,
    pub animated_meshes: Vec<MeshDraw>,
}

/// 常量 buffer 的布局
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct FrameConstants {
    pub view: glam::Mat4,
    pub projection: glam::Mat4,
    pub inv_view_projection: glam::Mat4,
    pub camera_position: glam::Vec3,
    pub exposure: f32,
    pub light_count: u32,
    pub bone_count: u32,
    pub _padding: [u32; 2],
}

impl FrameConstants {
    pub fn from_scene(data: &SceneFrameData) -> Self {
        let camera = &data.camera;
        Self {
            view: camera.view,
            projection: camera.projection,
            inv_view_projection: (camera.projection * camera.view).inverse(),
            camera_position: camera.position,
            exposure: camera.exposure,
            light_count: data.lights.len() as u32,
            bone_count: data.bone_transforms.len() as u32,
            _padding: [0; 2],
        }
    }
}

/// 上传后的每帧资源，所有 pass 共享
#[derive(Clone, Debug)]
pub struct FrameResources {
    pub constant_buffer: GfxBufferHandle,
    pub lights_buffer: GfxBufferHandle,
    pub bone_transforms_buffer: GfxBufferHandle,
    pub light_count: u32,
    pub bone_count: u32,
    pub static_meshes: Vec<MeshDraw>,
    pub animated_meshes: Vec<MeshDraw>,
}

impl FrameResources {
    /// 绑定时使用的 structured buffer 列表
    #[inline]
    pub fn structured_buffers(&self) -> [GfxBufferHandle; 2] {
        [self.lights_buffer, self.bone_transforms_buffer]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_layouts() {
        assert_eq!(size_of::<Light>(), 48);
        assert_eq!(size_of::<FrameConstants>() % 16, 0);
    }

    #[test]
    fn test_constants_from_scene() {
        let data = SceneFrameData {
            camera: CameraData {
                position: glam::vec3(1.0, 2.0, 3.0),
                exposure: 0.5,
                ..Default::default()
            },
            lights: vec![Light::directional(glam::Vec3::NEG_Y, glam::Vec3::ONE, 2.0)],
            bone_transforms: vec![glam::Mat4::IDENTITY; 4],
            ..Default::default()
        };
        let constants = FrameConstants::from_scene(&data);
        assert_eq!(constants.light_count, 1);
        assert_eq!(constants.bone_count, 4);
        assert_eq!(constants.camera_position, glam::vec3(1.0, 2.0, 3.0));
        assert_eq!(constants.inv_view_projection, glam::Mat4::IDENTITY);
    }
}
