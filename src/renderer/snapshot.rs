//! 常量块快照
//!
//! 每次绘制前，把场景状态（相机、光源、材质、绘制属性）捕获成
//! 后端无关的快照。快照只做取值与矩阵组装，不关心内存布局；
//! 布局与字节序排布由 [`super::adapter`] 的值适配器负责。
//!
//! # 裁剪空间重映射
//!
//! 深度 pass 的矩阵按后端差异重映射：
//! - OpenGL：不变（Z ∈ [-1,1]）
//! - Vulkan：Z 压到 [0,1]
//! - Direct3D 11/12：Z 压到 [0,1]，且 Y 行取反

use crate::component::drawable::Drawable;
use crate::component::light::LightSource;
use crate::component::material::SpecularTerms;
use crate::component::Camera;
use crate::core::math::{matrix, Matrix4, Vector2, Vector3, Vector4};
use crate::core::{GraphicsApi, MAX_LIGHT_SOURCES, MAX_TEXTURES};

/// 聚光内角的有效阈值（弧度）
const SPOT_INNER_ANGLE_THRESHOLD: f32 = 0.1;

/// 单次绘制的属性
#[derive(Debug, Clone, Copy)]
pub struct DrawProperties {
    /// 深度 pass 的光源索引
    pub light: Option<usize>,
    /// 裁剪盒下界
    pub clip_min: Vector3,
    /// 裁剪盒上界
    pub clip_max: Vector3,
    pub enable_clipping: bool,
    /// 深度贴图数组层（立方体贴图的面）
    pub depth_layer: u32,
}

impl Default for DrawProperties {
    fn default() -> Self {
        Self {
            light: None,
            clip_min: Vector3::zeros(),
            clip_max: Vector3::zeros(),
            enable_clipping: false,
            depth_layer: 0,
        }
    }
}

/// 后端的裁剪空间重映射矩阵
///
/// 返回 `None` 表示无需重映射（OpenGL）。
pub fn clip_space_remap(api: GraphicsApi) -> Option<Matrix4> {
    if !api.clip_space_z_zero_to_one() {
        return None;
    }
    let mut remap = Matrix4::identity();
    remap[(2, 2)] = 0.5;
    remap[(2, 3)] = 0.5;
    if api.flips_clip_space_y() {
        remap[(1, 1)] = -1.0;
    }
    Some(remap)
}

/// 矩阵常量块快照
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixSnapshot {
    pub model: Matrix4,
    pub normal: Matrix4,
    pub mvp: Matrix4,
    /// 深度 pass 的视图投影矩阵（点光源六个面）
    pub vp: [Matrix4; MAX_TEXTURES],
}

impl MatrixSnapshot {
    /// 场景 pass 的矩阵组装
    pub fn for_scene(camera: &Camera, model: &Matrix4, remove_translation: bool) -> Self {
        Self {
            model: *model,
            normal: matrix::normal_matrix(model),
            mvp: camera.mvp(model, remove_translation),
            vp: [camera.view_projection(); MAX_TEXTURES],
        }
    }

    /// 深度 pass 的矩阵组装
    ///
    /// MVP 在 Vulkan 与 Direct3D 上重映射；逐面 VP 只在 Direct3D 上
    /// 重映射（Vulkan 的面矩阵由阴影采样端补偿）。
    pub fn for_depth(light: &LightSource, model: &Matrix4, api: GraphicsApi) -> Self {
        let remap = clip_space_remap(api);
        let pv0 = light.projection() * light.view(0);
        let mvp = match remap {
            Some(r) => r * pv0 * model,
            None => pv0 * model,
        };

        let mut vp = [Matrix4::identity(); MAX_TEXTURES];
        for (i, slot) in vp.iter_mut().enumerate() {
            let pv = light.projection() * light.view(i);
            *slot = if api.flips_clip_space_y() {
                match remap {
                    Some(r) => r * pv,
                    None => pv,
                }
            } else {
                pv
            };
        }

        Self {
            model: *model,
            normal: matrix::normal_matrix(model),
            mvp,
            vp,
        }
    }
}

/// 单个光源的快照（一组 vec4 通道 + 阴影矩阵）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSnapshot {
    /// (是否激活, 种类编码, 0, 0)
    pub active_and_kind: Vector4,
    pub ambient: Vector4,
    /// (constant, linear, quadratic, 0)
    pub attenuation: Vector4,
    pub diffuse: Vector4,
    pub direction: Vector4,
    pub position: Vector4,
    /// (强度 rgb, 高光指数)
    pub specular: Vector4,
    /// 聚光角通道：(cos 内角, cos 外角, 0, 0)，无效时全零
    pub angles: Vector4,
    pub view_projection: Matrix4,
}

impl LightSnapshot {
    /// 空槽位：全零，着色器按未激活处理
    pub fn empty() -> Self {
        Self {
            active_and_kind: Vector4::zeros(),
            ambient: Vector4::zeros(),
            attenuation: Vector4::zeros(),
            diffuse: Vector4::zeros(),
            direction: Vector4::zeros(),
            position: Vector4::zeros(),
            specular: Vector4::zeros(),
            angles: Vector4::zeros(),
            view_projection: Matrix4::zeros(),
        }
    }

    pub fn capture(light: &LightSource) -> Self {
        let mat = &light.material;
        // 聚光角通道：内角超过阈值且外角严格更大时才有效
        let angles = if light.inner_angle > SPOT_INNER_ANGLE_THRESHOLD
            && light.outer_angle > light.inner_angle
        {
            Vector4::new(light.inner_angle.cos(), light.outer_angle.cos(), 0.0, 0.0)
        } else {
            Vector4::zeros()
        };

        Self {
            active_and_kind: Vector4::new(
                if light.active { 1.0 } else { 0.0 },
                light.kind.as_index(),
                0.0,
                0.0,
            ),
            ambient: widen(&mat.ambient, 0.0),
            attenuation: Vector4::new(
                light.attenuation.constant,
                light.attenuation.linear,
                light.attenuation.quadratic,
                0.0,
            ),
            diffuse: mat.diffuse,
            direction: widen(&light.direction, 0.0),
            position: widen(&light.position, 0.0),
            specular: widen(&mat.specular.intensity, mat.specular.shininess),
            angles,
            view_projection: light.view_projection(),
        }
    }
}

/// 颜色常量块快照（Color / Wireframe 身份）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSnapshot {
    pub color: Vector4,
}

impl ColorSnapshot {
    /// 有包围体的对象用自身漫反射色，否则回退到父对象材质
    pub fn capture(drawable: &dyn Drawable) -> Self {
        let color = if drawable.as_bounded_volume().is_some() {
            drawable.material().diffuse
        } else {
            drawable.owner_material().diffuse
        };
        Self { color }
    }
}

/// Default 常量块快照（标准光照 pass）
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultSnapshot {
    pub lights: [LightSnapshot; MAX_LIGHT_SOURCES],
    pub is_textured: [bool; MAX_TEXTURES],
    pub texture_scales: [Vector2; MAX_TEXTURES],
    pub camera_position: Vector3,
    pub mesh_specular: SpecularTerms,
    pub mesh_diffuse: Vector4,
    pub clip_min: Vector3,
    pub clip_max: Vector3,
    pub enable_clipping: bool,
    /// 组件种类编码
    pub component_type: f32,
    pub enable_srgb: bool,
    /// (波纹相位, 扰动强度)，非水面为零
    pub water_props: Vector2,
}

impl DefaultSnapshot {
    pub fn capture(
        drawable: &dyn Drawable,
        props: &DrawProperties,
        lights: &[Option<LightSource>; MAX_LIGHT_SOURCES],
        camera_position: Vector3,
        enable_srgb: bool,
    ) -> Self {
        let mut light_snaps = [LightSnapshot::empty(); MAX_LIGHT_SOURCES];
        for (snap, slot) in light_snaps.iter_mut().zip(lights.iter()) {
            if let Some(light) = slot {
                *snap = LightSnapshot::capture(light);
            }
        }

        let slots = drawable.texture_slots();
        let mut is_textured = [false; MAX_TEXTURES];
        let mut texture_scales = [Vector2::new(1.0, 1.0); MAX_TEXTURES];
        for i in 0..MAX_TEXTURES {
            is_textured[i] = slots[i].texture.is_some();
            texture_scales[i] = slots[i].scale;
        }

        let material = drawable.material();
        let water_props = match drawable.as_water_surface() {
            Some(w) => Vector2::new(w.move_factor, w.wave_strength),
            None => Vector2::zeros(),
        };

        Self {
            lights: light_snaps,
            is_textured,
            texture_scales,
            camera_position,
            mesh_specular: material.specular,
            mesh_diffuse: material.diffuse,
            clip_min: props.clip_min,
            clip_max: props.clip_max,
            enable_clipping: props.enable_clipping,
            component_type: drawable.kind().as_lane(),
            enable_srgb,
            water_props,
        }
    }
}

/// HUD 常量块快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudSnapshot {
    pub transparent: bool,
    pub diffuse: Vector4,
}

impl HudSnapshot {
    pub fn capture(drawable: &dyn Drawable) -> Self {
        Self {
            transparent: drawable
                .as_hud_element()
                .map(|h| h.transparent)
                .unwrap_or(false),
            diffuse: drawable.material().diffuse,
        }
    }
}

/// 深度常量块快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthSnapshot {
    /// 光源位置，w 为数组层
    pub light_position: Vector4,
}

impl DepthSnapshot {
    pub fn capture(light: &LightSource, props: &DrawProperties) -> Self {
        Self {
            light_position: widen(&light.position, props.depth_layer as f32),
        }
    }
}

fn widen(v: &Vector3, w: f32) -> Vector4 {
    Vector4::new(v.x, v.y, v.z, w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::light::Attenuation;
    use crate::component::{Material, Mesh};

    fn spot_with_angles(inner: f32, outer: f32) -> LightSource {
        LightSource::spot(
            Vector3::zeros(),
            Vector3::new(0.0, -1.0, 0.0),
            Material::default(),
            inner,
            outer,
        )
    }

    #[test]
    fn test_cone_angles_populated_when_valid() {
        let snap = LightSnapshot::capture(&spot_with_angles(0.3, 0.6));
        assert!((snap.angles.x - 0.3f32.cos()).abs() < 1e-6);
        assert!((snap.angles.y - 0.6f32.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_cone_angles_zero_at_threshold() {
        // 内角恰好等于阈值：无效
        let snap = LightSnapshot::capture(&spot_with_angles(0.1, 0.6));
        assert_eq!(snap.angles, Vector4::zeros());
    }

    #[test]
    fn test_cone_angles_zero_when_outer_not_greater() {
        let snap = LightSnapshot::capture(&spot_with_angles(0.5, 0.5));
        assert_eq!(snap.angles, Vector4::zeros());

        let snap = LightSnapshot::capture(&spot_with_angles(0.5, 0.4));
        assert_eq!(snap.angles, Vector4::zeros());
    }

    #[test]
    fn test_empty_light_slot_all_zero() {
        let snap = LightSnapshot::empty();
        assert_eq!(snap.active_and_kind, Vector4::zeros());
        assert_eq!(snap.view_projection, Matrix4::zeros());
    }

    #[test]
    fn test_remap_per_backend() {
        assert!(clip_space_remap(GraphicsApi::OpenGl).is_none());

        let vk = clip_space_remap(GraphicsApi::Vulkan).unwrap();
        assert_eq!(vk[(2, 2)], 0.5);
        assert_eq!(vk[(2, 3)], 0.5);
        assert_eq!(vk[(1, 1)], 1.0);

        let dx = clip_space_remap(GraphicsApi::Dx12).unwrap();
        assert_eq!(dx[(1, 1)], -1.0);
        assert_eq!(dx[(2, 2)], 0.5);
    }

    #[test]
    fn test_depth_matrices_differ_per_backend() {
        let light = LightSource::point(
            Vector3::new(0.0, 5.0, 0.0),
            Material::default(),
            Attenuation::default(),
        );
        let model = Matrix4::identity();

        let gl = MatrixSnapshot::for_depth(&light, &model, GraphicsApi::OpenGl);
        let vk = MatrixSnapshot::for_depth(&light, &model, GraphicsApi::Vulkan);
        let dx = MatrixSnapshot::for_depth(&light, &model, GraphicsApi::Dx11);

        assert_ne!(gl.mvp, vk.mvp);
        assert_ne!(vk.mvp, dx.mvp);
        // 逐面矩阵只在 Direct3D 上重映射
        assert_eq!(gl.vp, vk.vp);
        assert_ne!(gl.vp, dx.vp);
    }

    #[test]
    fn test_depth_snapshot_capture_is_idempotent() {
        let light = spot_with_angles(0.3, 0.6);
        let props = DrawProperties {
            depth_layer: 4,
            ..DrawProperties::default()
        };
        let a = DepthSnapshot::capture(&light, &props);
        let b = DepthSnapshot::capture(&light, &props);
        assert_eq!(a, b);
        assert_eq!(a.light_position.w, 4.0);
    }

    #[test]
    fn test_color_snapshot_parent_fallback() {
        let mut mesh = Mesh::quad();
        let mut owner = Material::default();
        owner.diffuse = Vector4::new(0.0, 1.0, 0.0, 1.0);
        mesh.material.diffuse = Vector4::new(1.0, 0.0, 0.0, 1.0);
        mesh.owner_material = Some(owner);

        // 无包围体：用父材质
        assert_eq!(ColorSnapshot::capture(&mesh).color, owner.diffuse);

        // 有包围体：用自身材质
        mesh.bounding = Some(crate::component::BoundingVolume {
            min: Vector3::zeros(),
            max: Vector3::new(1.0, 1.0, 1.0),
        });
        assert_eq!(ColorSnapshot::capture(&mesh).color, mesh.material.diffuse);
    }

    #[test]
    fn test_default_snapshot_captures_water_and_textures() {
        let mut mesh = Mesh::quad();
        mesh.water = Some(crate::component::WaterTraits {
            move_factor: 0.25,
            wave_strength: 0.04,
        });
        mesh.texture_slots[2].texture = Some(crate::gfx::handle::TextureHandle(9));
        mesh.texture_slots[2].scale = Vector2::new(4.0, 4.0);

        let lights: [Option<LightSource>; MAX_LIGHT_SOURCES] = Default::default();
        let snap = DefaultSnapshot::capture(
            &mesh,
            &DrawProperties::default(),
            &lights,
            Vector3::zeros(),
            true,
        );

        assert!(snap.is_textured[2]);
        assert!(!snap.is_textured[0]);
        assert_eq!(snap.texture_scales[2], Vector2::new(4.0, 4.0));
        assert_eq!(snap.water_props, Vector2::new(0.25, 0.04));
        assert!(snap.enable_srgb);
        assert!(snap.lights.iter().all(|l| l.active_and_kind.x == 0.0));
    }
}
