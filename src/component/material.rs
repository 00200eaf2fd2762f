//! 材质与纹理槽
//!
//! 材质是常量块快照的输入之一：环境光、漫反射、镜面反射项。
//! 纹理槽描述网格在固定槽位上的纹理绑定与 UV 缩放。

use crate::core::math::{Vector2, Vector3, Vector4};
use crate::core::MAX_TEXTURES;
use crate::gfx::handle::TextureHandle;
use crate::gfx::TextureKind;

/// 镜面反射项
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecularTerms {
    /// 各通道反射强度
    pub intensity: Vector3,
    /// 高光指数
    pub shininess: f32,
}

impl Default for SpecularTerms {
    fn default() -> Self {
        Self {
            intensity: Vector3::zeros(),
            shininess: 20.0,
        }
    }
}

/// 材质
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: Vector3,
    pub diffuse: Vector4,
    pub specular: SpecularTerms,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ambient: Vector3::new(0.2, 0.2, 0.2),
            diffuse: Vector4::new(0.8, 0.8, 0.8, 1.0),
            specular: SpecularTerms::default(),
        }
    }
}

/// 单个纹理槽
#[derive(Debug, Clone, Copy)]
pub struct TextureSlot {
    /// 槽位纹理；`None` 表示未设置，绑定时用占位纹理替代
    pub texture: Option<TextureHandle>,
    /// UV 缩放
    pub scale: Vector2,
    /// 纹理维度（2D 采样器拒绝立方体纹理）
    pub kind: TextureKind,
}

impl Default for TextureSlot {
    fn default() -> Self {
        Self {
            texture: None,
            scale: Vector2::new(1.0, 1.0),
            kind: TextureKind::TwoDim,
        }
    }
}

/// 网格的全部纹理槽
pub type TextureSlots = [TextureSlot; MAX_TEXTURES];
