//! 统一的数学库模块
//!
//! 提供渲染核心常用的数学类型和函数，基于 `nalgebra`。
//!
//! # 模块组织
//!
//! - **基础类型**：Vector2/3/4, Matrix3/4
//! - **工具函数**：clamp, approx_eq 等
//! - **矩阵辅助函数**：translation, projection, look_at, 法线矩阵等
//!
//! nalgebra 的矩阵按列主序存储，`[[f32; 4]; 4]` 转换因此天然是列主序
//! 排布；行主序（Direct3D 族）排布由 `renderer::adapter` 在转码时转置得到。

#![allow(dead_code)]

pub use nalgebra::{
    Matrix3 as Mat3, Matrix4 as Mat4, Point3,
    Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4,
};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix3 = Mat3<f32>;
pub type Matrix4 = Mat4<f32>;

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-6;
}

/// 数学工具函数
pub mod utils {
    /// 限制值在范围内
    pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }
}

/// 矩阵辅助函数
pub mod matrix {
    use super::*;

    /// 创建平移矩阵
    pub fn translation(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// 创建缩放矩阵
    pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z))
    }

    /// 创建透视投影矩阵
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        Matrix4::new_perspective(aspect, fov_y, near, far)
    }

    /// 创建正交投影矩阵
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Matrix4 {
        Matrix4::new_orthographic(left, right, bottom, top, near, far)
    }

    /// 创建 Look-At 视图矩阵
    pub fn look_at(eye: &Vector3, target: &Vector3, up: &Vector3) -> Matrix4 {
        Matrix4::look_at_rh(&Point3::from(*eye), &Point3::from(*target), up)
    }

    /// 去掉矩阵的平移分量（保留旋转/缩放的左上 3x3 部分）
    ///
    /// 用于天空盒：mat4(mat3(view))。
    pub fn strip_translation(m: &Matrix4) -> Matrix4 {
        let rot: Matrix3 = m.fixed_view::<3, 3>(0, 0).into();
        rot.to_homogeneous()
    }

    /// 计算法线矩阵：mat4(transpose(inverse(mat3(model))))
    ///
    /// 模型矩阵不可逆时退化为单位矩阵。
    pub fn normal_matrix(model: &Matrix4) -> Matrix4 {
        let m3: Matrix3 = model.fixed_view::<3, 3>(0, 0).into();
        let inv = m3.try_inverse().unwrap_or_else(Matrix3::identity);
        inv.transpose().to_homogeneous()
    }

    /// 矩阵转列主序的 `[[f32; 4]; 4]`（每个内层数组是一列）
    pub fn to_float4x4(m: &Matrix4) -> [[f32; 4]; 4] {
        *m.as_ref()
    }

    /// 从列主序的 `[[f32; 4]; 4]` 重建矩阵
    pub fn from_float4x4(columns: &[[f32; 4]; 4]) -> Matrix4 {
        Matrix4::from(*columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_translation() {
        let mat = matrix::translation(1.0, 2.0, 3.0);
        let point = Vector4::new(0.0, 0.0, 0.0, 1.0);
        let result = mat * point;

        assert!((result.x - 1.0).abs() < 1e-6);
        assert!((result.y - 2.0).abs() < 1e-6);
        assert!((result.z - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_strip_translation() {
        let mat = matrix::translation(5.0, -4.0, 3.0) * matrix::scaling(2.0, 2.0, 2.0);
        let stripped = matrix::strip_translation(&mat);

        // 平移列被清零，缩放保留
        assert_eq!(stripped[(0, 3)], 0.0);
        assert_eq!(stripped[(1, 3)], 0.0);
        assert_eq!(stripped[(2, 3)], 0.0);
        assert!((stripped[(0, 0)] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_normal_matrix_of_uniform_scale() {
        // 均匀缩放 2 的法线矩阵是 0.5 倍缩放（逆的转置）
        let model = matrix::scaling(2.0, 2.0, 2.0);
        let normal = matrix::normal_matrix(&model);
        assert!((normal[(0, 0)] - 0.5).abs() < 1e-6);
        assert!((normal[(1, 1)] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_float4x4_round_trip() {
        let rotation = Matrix4::new_rotation(Vector3::new(0.3, -1.1, 0.7));
        let mat = matrix::translation(1.0, 2.0, 3.0) * rotation;
        let cols = matrix::to_float4x4(&mat);
        let back = matrix::from_float4x4(&cols);
        assert_eq!(mat, back);
    }
}
