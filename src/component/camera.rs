//! 相机组件
//!
//! 持有视图与投影矩阵，提供 MVP 组装。天空盒绘制时去掉视图矩阵的
//! 平移分量，使天空盒始终以相机为中心。

use crate::core::math::{matrix, Matrix4, Vector3};

/// 场景相机
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vector3,
    view: Matrix4,
    projection: Matrix4,
}

impl Camera {
    /// 创建透视投影相机
    pub fn new(position: Vector3, target: Vector3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            view: matrix::look_at(&position, &target, &Vector3::y()),
            projection: matrix::perspective(fov_y, aspect, near, far),
        }
    }

    pub fn view(&self) -> &Matrix4 {
        &self.view
    }

    pub fn projection(&self) -> &Matrix4 {
        &self.projection
    }

    pub fn view_projection(&self) -> Matrix4 {
        self.projection * self.view
    }

    /// 重新对准相机
    pub fn look_at(&mut self, position: Vector3, target: Vector3) {
        self.position = position;
        self.view = matrix::look_at(&position, &target, &Vector3::y());
    }

    /// 组装 MVP
    ///
    /// `remove_translation` 为 true 时去掉视图矩阵的平移分量（天空盒）。
    pub fn mvp(&self, model: &Matrix4, remove_translation: bool) -> Matrix4 {
        let view = if remove_translation {
            matrix::strip_translation(&self.view)
        } else {
            self.view
        };
        self.projection * view * model
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Vector3::new(0.0, 2.0, 5.0),
            Vector3::zeros(),
            std::f32::consts::FRAC_PI_4,
            4.0 / 3.0,
            0.1,
            100.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::math::Vector4;

    #[test]
    fn test_mvp_translation_strip() {
        let camera = Camera::default();
        let model = Matrix4::identity();

        let with = camera.mvp(&model, false);
        let without = camera.mvp(&model, true);
        assert_ne!(with, without);

        // 去平移后的视图只含旋转：两个仅平移不同的相机给出相同的天空盒 MVP
        let mut moved = camera.clone();
        let offset = Vector3::new(3.0, 0.0, 0.0);
        moved.look_at(camera.position + offset, offset);
        let a = camera.mvp(&model, true);
        let b = moved.mvp(&model, true);
        assert!((a - b).abs().max() < 1e-5);
    }

    #[test]
    fn test_view_projection_composes() {
        let camera = Camera::default();
        let vp = camera.view_projection();
        let origin = vp * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(origin.w.abs() > 0.0);
    }
}
