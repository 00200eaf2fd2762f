//! 光源组件
//!
//! 三种光源：方向光、点光源、聚光灯。每个光源携带自己的投影矩阵与
//! 深度 pass 视图矩阵：方向光/聚光一个视图，点光源六个面各一个。
//! 深度贴图附件是可选的；没有附件的光源不参与阴影采样。
//!
//! # 聚光角约定
//!
//! 内外角以弧度存储；快照阶段只有当内角大于阈值且外角严格大于内角
//! 时才写入余弦对，否则该通道保持全零（着色器据此关闭软边缘）。

use crate::core::math::{matrix, Matrix4, Vector3};
use crate::core::MAX_TEXTURES;
use crate::gfx::handle::TextureHandle;
use crate::gfx::TextureKind;

use super::material::Material;

/// 光源种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

impl LightKind {
    /// 快照通道里的种类编码
    pub fn as_index(&self) -> f32 {
        match self {
            LightKind::Directional => 0.0,
            LightKind::Point => 1.0,
            LightKind::Spot => 2.0,
        }
    }
}

/// 距离衰减系数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

/// 光源的深度贴图附件
#[derive(Debug, Clone, Copy)]
pub struct DepthMapTarget {
    pub texture: TextureHandle,
    /// `TwoDimArray`（方向光/聚光）或 `CubeArray`（点光源）
    pub kind: TextureKind,
}

/// 场景光源
#[derive(Debug, Clone)]
pub struct LightSource {
    pub kind: LightKind,
    pub active: bool,
    pub position: Vector3,
    pub direction: Vector3,
    pub material: Material,
    pub attenuation: Attenuation,
    /// 聚光内角（弧度）
    pub inner_angle: f32,
    /// 聚光外角（弧度）
    pub outer_angle: f32,
    projection: Matrix4,
    views: [Matrix4; MAX_TEXTURES],
    pub depth_map: Option<DepthMapTarget>,
}

impl LightSource {
    /// 创建方向光（正交投影，单视图）
    pub fn directional(direction: Vector3, material: Material) -> Self {
        let position = -direction * 20.0;
        let projection = matrix::orthographic(-20.0, 20.0, -20.0, 20.0, 0.1, 50.0);
        let view = matrix::look_at(&position, &(position + direction), &Vector3::y());
        Self {
            kind: LightKind::Directional,
            active: true,
            position,
            direction,
            material,
            attenuation: Attenuation::default(),
            inner_angle: 0.0,
            outer_angle: 0.0,
            projection,
            views: [view; MAX_TEXTURES],
            depth_map: None,
        }
    }

    /// 创建点光源（90° 透视投影，六个面视图）
    pub fn point(position: Vector3, material: Material, attenuation: Attenuation) -> Self {
        let projection = matrix::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 50.0);
        let views = cube_face_views(&position);
        Self {
            kind: LightKind::Point,
            active: true,
            position,
            direction: Vector3::zeros(),
            material,
            attenuation,
            inner_angle: 0.0,
            outer_angle: 0.0,
            projection,
            views,
            depth_map: None,
        }
    }

    /// 创建聚光灯（按外角的透视投影，单视图）
    pub fn spot(
        position: Vector3,
        direction: Vector3,
        material: Material,
        inner_angle: f32,
        outer_angle: f32,
    ) -> Self {
        let fov = (outer_angle * 2.0).max(0.1);
        let projection = matrix::perspective(fov, 1.0, 0.1, 50.0);
        let up = spot_up(&direction);
        let view = matrix::look_at(&position, &(position + direction), &up);
        Self {
            kind: LightKind::Spot,
            active: true,
            position,
            direction,
            material,
            attenuation: Attenuation::default(),
            inner_angle,
            outer_angle,
            projection,
            views: [view; MAX_TEXTURES],
            depth_map: None,
        }
    }

    pub fn projection(&self) -> &Matrix4 {
        &self.projection
    }

    /// 深度 pass 的第 `face` 个视图矩阵
    ///
    /// 非点光源所有面返回同一视图。越界返回第 0 面。
    pub fn view(&self, face: usize) -> &Matrix4 {
        &self.views[face.min(MAX_TEXTURES - 1)]
    }

    /// 主视图的视图投影矩阵（阴影采样用）
    pub fn view_projection(&self) -> Matrix4 {
        self.projection * self.views[0]
    }

    /// 挂上深度贴图附件
    pub fn attach_depth_map(&mut self, texture: TextureHandle) {
        let kind = match self.kind {
            LightKind::Point => TextureKind::CubeArray,
            _ => TextureKind::TwoDimArray,
        };
        self.depth_map = Some(DepthMapTarget { texture, kind });
    }
}

/// 点光源六个面的视图矩阵（+X -X +Y -Y +Z -Z）
fn cube_face_views(position: &Vector3) -> [Matrix4; MAX_TEXTURES] {
    let dirs = [
        (Vector3::x(), -Vector3::y()),
        (-Vector3::x(), -Vector3::y()),
        (Vector3::y(), Vector3::z()),
        (-Vector3::y(), -Vector3::z()),
        (Vector3::z(), -Vector3::y()),
        (-Vector3::z(), -Vector3::y()),
    ];
    dirs.map(|(dir, up)| matrix::look_at(position, &(position + dir), &up))
}

/// 聚光方向接近竖直时换一个 up 向量避免退化
fn spot_up(direction: &Vector3) -> Vector3 {
    if direction.x.abs() < 1e-4 && direction.z.abs() < 1e-4 {
        Vector3::z()
    } else {
        Vector3::y()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_light_has_six_distinct_faces() {
        let light = LightSource::point(
            Vector3::new(1.0, 2.0, 3.0),
            Material::default(),
            Attenuation::default(),
        );
        for i in 1..MAX_TEXTURES {
            assert_ne!(light.view(0), light.view(i), "face {} equals face 0", i);
        }
    }

    #[test]
    fn test_directional_light_single_view() {
        let light = LightSource::directional(Vector3::new(0.0, -1.0, -0.5), Material::default());
        assert_eq!(light.view(0), light.view(5));
        // 越界夹到最后一面
        assert_eq!(light.view(100), light.view(5));
    }

    #[test]
    fn test_depth_map_kind_follows_light_kind() {
        let mut point = LightSource::point(
            Vector3::zeros(),
            Material::default(),
            Attenuation::default(),
        );
        point.attach_depth_map(TextureHandle(1));
        assert_eq!(point.depth_map.unwrap().kind, TextureKind::CubeArray);

        let mut spot = LightSource::spot(
            Vector3::zeros(),
            Vector3::new(0.0, -1.0, 0.0),
            Material::default(),
            0.3,
            0.6,
        );
        spot.attach_depth_map(TextureHandle(2));
        assert_eq!(spot.depth_map.unwrap().kind, TextureKind::TwoDimArray);
    }
}
