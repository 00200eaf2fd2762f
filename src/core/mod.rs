//! 核心模块
//!
//! 包含引擎的基础设施：
//! - **config**: 配置加载与命令行覆盖
//! - **error**: 统一错误类型
//! - **log**: 日志系统初始化
//! - **math**: 数学类型与工具
//!
//! 同时定义整个引擎共享的容量常量。

pub mod config;
pub mod error;
pub mod log;
pub mod math;

pub use config::{Config, GraphicsApi, LogLevel};
pub use error::{ConfigError, DrawError, PolyRenderError, Result, ShaderError};

/// 每个网格最多可绑定的纹理槽数
pub const MAX_TEXTURES: usize = 6;

/// 场景中光源的最大数量
pub const MAX_LIGHT_SOURCES: usize = 13;

/// 组合纹理槽总数：网格纹理 + 2D 深度贴图 + 立方体深度贴图
pub const MAX_TEXTURE_SLOTS: usize = MAX_TEXTURES + 2 * MAX_LIGHT_SOURCES;

/// 内置着色器程序的数量（不含 Unknown）
pub const NR_OF_SHADERS: usize = 6;
