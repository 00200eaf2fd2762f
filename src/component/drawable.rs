//! 可绘制对象
//!
//! [`Drawable`] 是绑定子系统对场景对象的唯一视角：模型矩阵、材质、
//! 纹理槽、组件种类，以及一组能力访问器。能力访问器取代向下转型：
//! 需要水面属性的代码调用 `as_water_surface()`，拿到 `None` 就走
//! 默认路径，而不是判断具体类型再强转。

use crate::core::math::{Matrix4, Vector3};

use super::material::{Material, TextureSlots};

/// 组件种类
///
/// 判别值会作为浮点数写进 Default 常量块的组件类型通道。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ComponentKind {
    Unknown = 0,
    Camera = 1,
    Hud = 2,
    Mesh = 3,
    Model = 4,
    Skybox = 5,
    Terrain = 6,
    Water = 7,
    LightSource = 8,
}

impl ComponentKind {
    /// 常量块通道里的编码
    pub fn as_lane(&self) -> f32 {
        (*self as u8) as f32
    }
}

/// 水面专有属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterTraits {
    /// 波纹相位（每帧推进）
    pub move_factor: f32,
    /// 扰动强度
    pub wave_strength: f32,
}

/// HUD 元素专有属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HudTraits {
    pub transparent: bool,
}

/// 包围体（轴对齐盒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub min: Vector3,
    pub max: Vector3,
}

/// 绑定子系统可绘制的对象
pub trait Drawable {
    /// 模型矩阵
    fn matrix(&self) -> Matrix4;

    /// 自身材质
    fn material(&self) -> &Material;

    /// 所属父对象的材质（没有父对象时就是自身材质）
    fn owner_material(&self) -> &Material {
        self.material()
    }

    /// 固定槽位的纹理绑定
    fn texture_slots(&self) -> &TextureSlots;

    fn kind(&self) -> ComponentKind;

    /// 水面能力
    fn as_water_surface(&self) -> Option<&WaterTraits> {
        None
    }

    /// HUD 能力
    fn as_hud_element(&self) -> Option<&HudTraits> {
        None
    }

    /// 包围体能力
    fn as_bounded_volume(&self) -> Option<&BoundingVolume> {
        None
    }
}

/// 网格：携带几何数据的基础可绘制对象
#[derive(Debug, Clone)]
pub struct Mesh {
    pub transform: Matrix4,
    pub material: Material,
    /// 父模型的材质（独立网格为 `None`）
    pub owner_material: Option<Material>,
    pub texture_slots: TextureSlots,
    pub kind: ComponentKind,
    pub water: Option<WaterTraits>,
    pub hud: Option<HudTraits>,
    pub bounding: Option<BoundingVolume>,

    /// 顶点位置（xyz 连续）
    pub vertices: Vec<f32>,
    /// 法线（xyz 连续）
    pub normals: Vec<f32>,
    /// 纹理坐标（uv 连续）
    pub tex_coords: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            transform: Matrix4::identity(),
            material: Material::default(),
            owner_material: None,
            texture_slots: TextureSlots::default(),
            kind,
            water: None,
            hud: None,
            bounding: None,
            vertices: Vec::new(),
            normals: Vec::new(),
            tex_coords: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// 单位正方形（测试与 HUD 用）
    pub fn quad() -> Self {
        let mut mesh = Self::new(ComponentKind::Mesh);
        mesh.vertices = vec![
            -0.5, -0.5, 0.0, //
            0.5, -0.5, 0.0, //
            0.5, 0.5, 0.0, //
            -0.5, 0.5, 0.0,
        ];
        mesh.normals = vec![
            0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0, //
            0.0, 0.0, 1.0,
        ];
        mesh.tex_coords = vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        mesh.indices = vec![0, 1, 2, 2, 3, 0];
        mesh
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn has_geometry(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }
}

impl Drawable for Mesh {
    fn matrix(&self) -> Matrix4 {
        self.transform
    }

    fn material(&self) -> &Material {
        &self.material
    }

    fn owner_material(&self) -> &Material {
        self.owner_material.as_ref().unwrap_or(&self.material)
    }

    fn texture_slots(&self) -> &TextureSlots {
        &self.texture_slots
    }

    fn kind(&self) -> ComponentKind {
        self.kind
    }

    fn as_water_surface(&self) -> Option<&WaterTraits> {
        self.water.as_ref()
    }

    fn as_hud_element(&self) -> Option<&HudTraits> {
        self.hud.as_ref()
    }

    fn as_bounded_volume(&self) -> Option<&BoundingVolume> {
        self.bounding.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::Vector4;

    #[test]
    fn test_component_kind_lanes() {
        assert_eq!(ComponentKind::Unknown.as_lane(), 0.0);
        assert_eq!(ComponentKind::Water.as_lane(), 7.0);
    }

    #[test]
    fn test_owner_material_fallback() {
        let mut mesh = Mesh::quad();
        assert_eq!(mesh.owner_material().diffuse, mesh.material.diffuse);

        let mut owner = Material::default();
        owner.diffuse = Vector4::new(1.0, 0.0, 0.0, 1.0);
        mesh.owner_material = Some(owner);
        assert_eq!(mesh.owner_material().diffuse, owner.diffuse);
    }

    #[test]
    fn test_capability_accessors_default_none() {
        let mut mesh = Mesh::quad();
        assert!(mesh.as_water_surface().is_none());
        assert!(mesh.as_hud_element().is_none());

        mesh.water = Some(WaterTraits {
            move_factor: 0.3,
            wave_strength: 0.02,
        });
        assert!(mesh.as_water_surface().is_some());
    }
}
