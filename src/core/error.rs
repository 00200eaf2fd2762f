//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型，区分着色器构建期错误、
//! 每次绘制（per-draw）可恢复错误与致命的设备丢失。
//!
//! # 分类原则
//!
//! - `ShaderError`：程序构建期（编译/链接/验证），可恢复 —— 程序停留在 Failed 状态
//! - `DrawError`：单次绘制失败（上传/绑定/跳过），可恢复 —— 跳过该绘制并继续
//! - `DrawError::DeviceLost`：致命 —— 一路冒泡到渲染循环顶层，由其重建设备
//! - `ConfigError`：配置加载/校验失败

use std::fmt;

/// 引擎统一的 Result 类型
///
/// 所有可能返回错误的函数都应该使用这个类型。
pub type Result<T> = std::result::Result<T, PolyRenderError>;

/// PolyRender 引擎的错误类型
///
/// 包含了引擎运行过程中可能遇到的各种错误情况。
#[derive(Debug)]
pub enum PolyRenderError {
    /// 配置错误
    Config(ConfigError),

    /// 着色器程序构建期错误
    Shader(ShaderError),

    /// 绘制期错误
    Draw(DrawError),

    /// IO 错误
    Io(std::io::Error),

    /// 初始化错误
    Initialization(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 着色器程序构建期的错误
///
/// 程序构建失败后停留在 Failed 状态，永远不会被绘制；
/// 调用方可在资源重载时重试。
#[derive(Debug)]
pub enum ShaderError {
    /// 某个着色阶段编译失败
    Compile(String),

    /// 程序链接失败
    Link(String),

    /// 链接后验证失败（仅 debug 构建执行验证）
    Validation(String),
}

/// 绘制期的错误
#[derive(Debug)]
pub enum DrawError {
    /// 几何/常量资源上传失败
    Upload(String),

    /// 绑定失败：缺少常驻几何资源，或所需的原生缓冲/描述符句柄为空
    Binding(String),

    /// 网格或着色器程序未就绪，本次绘制被跳过（非致命，已记录日志）
    Skipped(String),

    /// 设备丢失/移除 —— 致命，必须重建设备与全部依赖资源
    DeviceLost,
}

impl fmt::Display for PolyRenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolyRenderError::Config(e) => write!(f, "Configuration error: {}", e),
            PolyRenderError::Shader(e) => write!(f, "Shader error: {}", e),
            PolyRenderError::Draw(e) => write!(f, "Draw error: {}", e),
            PolyRenderError::Io(e) => write!(f, "IO error: {}", e),
            PolyRenderError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Compile(msg) => write!(f, "Shader compilation failed: {}", msg),
            ShaderError::Link(msg) => write!(f, "Program link failed: {}", msg),
            ShaderError::Validation(msg) => write!(f, "Program validation failed: {}", msg),
        }
    }
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawError::Upload(msg) => write!(f, "Resource upload failed: {}", msg),
            DrawError::Binding(msg) => write!(f, "Resource binding failed: {}", msg),
            DrawError::Skipped(msg) => write!(f, "Draw skipped: {}", msg),
            DrawError::DeviceLost => write!(f, "Graphics device lost"),
        }
    }
}

impl std::error::Error for PolyRenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PolyRenderError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for ShaderError {}
impl std::error::Error for DrawError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for PolyRenderError {
    fn from(err: std::io::Error) -> Self {
        PolyRenderError::Io(err)
    }
}

impl From<ConfigError> for PolyRenderError {
    fn from(err: ConfigError) -> Self {
        PolyRenderError::Config(err)
    }
}

impl From<ShaderError> for PolyRenderError {
    fn from(err: ShaderError) -> Self {
        PolyRenderError::Shader(err)
    }
}

impl From<DrawError> for PolyRenderError {
    fn from(err: DrawError) -> Self {
        PolyRenderError::Draw(err)
    }
}

impl PolyRenderError {
    /// 是否为致命错误（设备丢失）
    ///
    /// 致命错误不得在中间层被吞掉，必须冒泡到渲染循环顶层。
    pub fn is_fatal(&self) -> bool {
        matches!(self, PolyRenderError::Draw(DrawError::DeviceLost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PolyRenderError::from(ShaderError::Compile("bad token".to_string()));
        assert_eq!(err.to_string(), "Shader error: Shader compilation failed: bad token");

        let err = PolyRenderError::from(DrawError::DeviceLost);
        assert_eq!(err.to_string(), "Draw error: Graphics device lost");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(PolyRenderError::from(DrawError::DeviceLost).is_fatal());
        assert!(!PolyRenderError::from(DrawError::Binding("x".into())).is_fatal());
        assert!(!PolyRenderError::from(ShaderError::Link("x".into())).is_fatal());
    }
}
