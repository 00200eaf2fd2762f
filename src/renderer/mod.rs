//! 渲染器模块
//!
//! 着色器与 uniform 绑定子系统的核心：
//! - **identity**: 程序名 → 稳定着色器身份
//! - **snapshot**: 后端无关的常量块快照
//! - **adapter**: 快照 → 各后端原生内存布局的值转码
//! - **program**: 程序加载状态机与 `update_uniforms`
//! - **buffer**: 每网格的 GPU 缓冲与管线生命周期
//! - **sync**: fence 型后端的帧同步
//! - **context**: 显式传递的渲染上下文与 `draw` 动词

pub mod adapter;
pub mod buffer;
pub mod context;
pub mod identity;
pub mod program;
pub mod snapshot;
pub mod sync;

pub use adapter::{MatrixOrder, ValueAdapter};
pub use buffer::{GpuBuffer, PipelineKind};
pub use context::RenderContext;
pub use identity::ShaderIdentity;
pub use program::{FrameInputs, ProgramState, ShaderProgram};
pub use snapshot::{
    ColorSnapshot, DefaultSnapshot, DepthSnapshot, DrawProperties, HudSnapshot, LightSnapshot,
    MatrixSnapshot,
};
pub use sync::FrameFence;
