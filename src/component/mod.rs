//! 场景组件模块
//!
//! 渲染所需的最小组件集合：相机、光源、材质与可绘制对象。
//! 场景图、资源加载与物理都在引擎核心之外。

pub mod camera;
pub mod drawable;
pub mod light;
pub mod material;

pub use camera::Camera;
pub use drawable::{BoundingVolume, ComponentKind, Drawable, HudTraits, Mesh, WaterTraits};
pub use light::{Attenuation, DepthMapTarget, LightKind, LightSource};
pub use material::{Material, SpecularTerms, TextureSlot, TextureSlots};
