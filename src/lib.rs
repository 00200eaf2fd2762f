//! PolyRender —— 多后端渲染引擎核心
//!
//! 在 OpenGL、Direct3D 11、Direct3D 12 与 Vulkan 四种结构不同的图形后端
//! 之上，提供统一的着色器程序与 uniform 绑定子系统。
//!
//! # 架构分层
//!
//! - [`core`]: 配置、日志、错误、数学等基础设施
//! - [`component`]: 相机、光源、材质与可绘制对象
//! - [`gfx`]: 各后端的设备上下文（句柄级资源模型）
//! - [`renderer`]: 着色器身份、常量块快照、值转码、程序与缓冲生命周期
//!
//! # 设计原则
//!
//! 1. **后端差异显式化**：每个后端差异点都是带标签的枚举分支，
//!    不存在"全后端并集"的资源结构
//! 2. **快照与转码分离**：常量块先捕获为后端无关快照，再由各后端的
//!    值适配器转码为原生内存布局
//! 3. **无全局状态**：相机、光源、占位纹理等共享状态都通过
//!    [`renderer::RenderContext`] 显式传递
//! 4. **可恢复与致命分离**：单次绘制失败跳过并记录日志，设备丢失
//!    一路冒泡到渲染循环顶层

pub mod component;
pub mod core;
pub mod gfx;
pub mod renderer;

pub use crate::core::{Config, GraphicsApi, PolyRenderError, Result};
pub use crate::renderer::RenderContext;
