//! 常量块值适配器
//!
//! 把后端无关的快照转码成各后端原生的常量缓冲内存布局。
//! 布局结构体都是 `#[repr(C)]` 的 Pod 类型，可直接按字节上传。
//!
//! 布局规则：
//! - 标量与布尔一律加宽到一个 vec4 通道（std140 兼容）
//! - OpenGL / Vulkan 列主序，Direct3D 族行主序（转置）
//! - Direct3D 的矩阵块嵌在载荷块前部，共用一个常量缓冲

use bytemuck::{Pod, Zeroable};

use crate::core::math::{Matrix4, Vector2, Vector3, Vector4};
use crate::core::{GraphicsApi, MAX_LIGHT_SOURCES, MAX_TEXTURES};

use super::snapshot::{
    ColorSnapshot, DefaultSnapshot, DepthSnapshot, HudSnapshot, LightSnapshot, MatrixSnapshot,
};

/// 矩阵常量块布局
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MatrixBlock {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub mvp: [[f32; 4]; 4],
    pub vp: [[[f32; 4]; 4]; MAX_TEXTURES],
}

/// 单个光源的块内布局
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightBlock {
    pub active_and_kind: [f32; 4],
    pub ambient: [f32; 4],
    pub attenuation: [f32; 4],
    pub diffuse: [f32; 4],
    pub direction: [f32; 4],
    pub position: [f32; 4],
    pub specular: [f32; 4],
    pub angles: [f32; 4],
    pub view_projection: [[f32; 4]; 4],
}

/// 颜色常量块布局
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ColorBlock {
    pub color: [f32; 4],
}

/// Default 常量块布局
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DefaultBlock {
    pub lights: [LightBlock; MAX_LIGHT_SOURCES],
    pub is_textured: [[f32; 4]; MAX_TEXTURES],
    pub texture_scales: [[f32; 4]; MAX_TEXTURES],
    pub camera_position: [f32; 4],
    pub mesh_specular: [f32; 4],
    pub mesh_diffuse: [f32; 4],
    pub clip_max: [f32; 4],
    pub clip_min: [f32; 4],
    pub enable_clipping: [f32; 4],
    pub component_type: [f32; 4],
    pub enable_srgb: [f32; 4],
    pub water_props: [f32; 4],
}

/// HUD 常量块布局
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct HudBlock {
    pub transparent: [f32; 4],
    pub diffuse: [f32; 4],
}

/// 深度常量块布局
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DepthBlock {
    pub light_position: [f32; 4],
}

/// 矩阵元素顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixOrder {
    /// OpenGL / Vulkan
    ColumnMajor,
    /// Direct3D 族
    RowMajor,
}

/// 值适配器：快照 → 原生布局
#[derive(Debug, Clone, Copy)]
pub struct ValueAdapter {
    pub order: MatrixOrder,
}

impl ValueAdapter {
    pub fn for_api(api: GraphicsApi) -> Self {
        let order = match api {
            GraphicsApi::Dx11 | GraphicsApi::Dx12 => MatrixOrder::RowMajor,
            GraphicsApi::OpenGl | GraphicsApi::Vulkan => MatrixOrder::ColumnMajor,
        };
        Self { order }
    }

    /// 反方向的适配器（转置是对合，正反相同）
    pub fn inverse(&self) -> Self {
        *self
    }

    pub fn encode_matrix(&self, m: &Matrix4) -> [[f32; 4]; 4] {
        match self.order {
            MatrixOrder::ColumnMajor => *m.as_ref(),
            MatrixOrder::RowMajor => *m.transpose().as_ref(),
        }
    }

    /// 从原生布局读回矩阵（测试与调试用）
    pub fn decode_matrix(&self, cells: &[[f32; 4]; 4]) -> Matrix4 {
        let m = Matrix4::from(*cells);
        match self.order {
            MatrixOrder::ColumnMajor => m,
            MatrixOrder::RowMajor => m.transpose(),
        }
    }

    pub fn encode_matrices(&self, snap: &MatrixSnapshot) -> MatrixBlock {
        let mut vp = [[[0.0f32; 4]; 4]; MAX_TEXTURES];
        for (dst, src) in vp.iter_mut().zip(snap.vp.iter()) {
            *dst = self.encode_matrix(src);
        }
        MatrixBlock {
            model: self.encode_matrix(&snap.model),
            normal: self.encode_matrix(&snap.normal),
            mvp: self.encode_matrix(&snap.mvp),
            vp,
        }
    }

    pub fn encode_light(&self, snap: &LightSnapshot) -> LightBlock {
        LightBlock {
            active_and_kind: lane(&snap.active_and_kind),
            ambient: lane(&snap.ambient),
            attenuation: lane(&snap.attenuation),
            diffuse: lane(&snap.diffuse),
            direction: lane(&snap.direction),
            position: lane(&snap.position),
            specular: lane(&snap.specular),
            angles: lane(&snap.angles),
            view_projection: self.encode_matrix(&snap.view_projection),
        }
    }

    pub fn encode_color(&self, snap: &ColorSnapshot) -> ColorBlock {
        ColorBlock {
            color: lane(&snap.color),
        }
    }

    pub fn encode_default(&self, snap: &DefaultSnapshot) -> DefaultBlock {
        let mut lights = [LightBlock::zeroed(); MAX_LIGHT_SOURCES];
        for (dst, src) in lights.iter_mut().zip(snap.lights.iter()) {
            *dst = self.encode_light(src);
        }

        let mut is_textured = [[0.0f32; 4]; MAX_TEXTURES];
        let mut texture_scales = [[0.0f32; 4]; MAX_TEXTURES];
        for i in 0..MAX_TEXTURES {
            is_textured[i] = scalar_lane(if snap.is_textured[i] { 1.0 } else { 0.0 });
            texture_scales[i] = vec2_lane(&snap.texture_scales[i]);
        }

        DefaultBlock {
            lights,
            is_textured,
            texture_scales,
            camera_position: vec3_lane(&snap.camera_position, 0.0),
            mesh_specular: [
                snap.mesh_specular.intensity.x,
                snap.mesh_specular.intensity.y,
                snap.mesh_specular.intensity.z,
                snap.mesh_specular.shininess,
            ],
            mesh_diffuse: lane(&snap.mesh_diffuse),
            clip_max: vec3_lane(&snap.clip_max, 0.0),
            clip_min: vec3_lane(&snap.clip_min, 0.0),
            enable_clipping: scalar_lane(if snap.enable_clipping { 1.0 } else { 0.0 }),
            component_type: scalar_lane(snap.component_type),
            enable_srgb: scalar_lane(if snap.enable_srgb { 1.0 } else { 0.0 }),
            water_props: vec2_lane(&snap.water_props),
        }
    }

    pub fn encode_hud(&self, snap: &HudSnapshot) -> HudBlock {
        HudBlock {
            transparent: scalar_lane(if snap.transparent { 1.0 } else { 0.0 }),
            diffuse: lane(&snap.diffuse),
        }
    }

    pub fn encode_depth(&self, snap: &DepthSnapshot) -> DepthBlock {
        DepthBlock {
            light_position: lane(&snap.light_position),
        }
    }
}

fn lane(v: &Vector4) -> [f32; 4] {
    [v.x, v.y, v.z, v.w]
}

fn vec3_lane(v: &Vector3, w: f32) -> [f32; 4] {
    [v.x, v.y, v.z, w]
}

fn vec2_lane(v: &Vector2) -> [f32; 4] {
    [v.x, v.y, 0.0, 0.0]
}

fn scalar_lane(s: f32) -> [f32; 4] {
    [s, 0.0, 0.0, 0.0]
}
