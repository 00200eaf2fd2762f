//! 配置管理模块
//!
//! 提供引擎配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 800
//! height = 600
//! title = "PolyRender"
//!
//! [graphics]
//! backend = "opengl"  # opengl, dx11, dx12, vulkan
//! vsync = true
//! srgb = true
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};

/// 引擎配置
///
/// 包含了引擎运行所需的所有配置项。
/// 可以从配置文件加载，也可以通过代码构建。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    pub window: WindowConfig,

    /// 图形配置
    pub graphics: GraphicsConfig,

    /// 日志配置
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择（进程启动时选定一次，运行期不可切换）
    #[serde(default = "default_backend")]
    pub backend: GraphicsApi,

    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 是否启用 sRGB gamma 校正（写入 Default 常量块）
    #[serde(default = "default_srgb")]
    pub srgb: bool,

    /// 允许的在途帧数（fence 型后端）
    #[serde(default = "default_frames_in_flight")]
    pub frames_in_flight: u32,
}

/// 图形 API 类型
///
/// 四种结构不同的后端：立即模式（OpenGL）、两种命令列表/fence 型
/// （Direct3D 11/12）、描述符集型（Vulkan）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphicsApi {
    /// OpenGL 后端（立即模式，隐式同步）
    OpenGl,
    /// Direct3D 11 后端（映射常量缓冲）
    Dx11,
    /// Direct3D 12 后端（命令列表 + fence）
    Dx12,
    /// Vulkan 后端（描述符集）
    Vulkan,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }
fn default_title() -> String { "PolyRender".to_string() }
fn default_backend() -> GraphicsApi { GraphicsApi::OpenGl }
fn default_vsync() -> bool { true }
fn default_srgb() -> bool { true }
fn default_frames_in_flight() -> u32 { 2 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "polyrender.log".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            graphics: GraphicsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            vsync: default_vsync(),
            srgb: default_srgb(),
            frames_in_flight: default_frames_in_flight(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    #[allow(dead_code)]
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--opengl` / `--dx11` / `--dx12` / `--vulkan`: 选择图形后端
    /// - `--width <value>` / `--height <value>`: 设置窗口尺寸
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--opengl") {
            self.graphics.backend = GraphicsApi::OpenGl;
        }
        if args.iter().any(|a| a == "--dx11") {
            self.graphics.backend = GraphicsApi::Dx11;
        }
        if args.iter().any(|a| a == "--dx12") {
            self.graphics.backend = GraphicsApi::Dx12;
        }
        if args.iter().any(|a| a == "--vulkan") {
            self.graphics.backend = GraphicsApi::Vulkan;
        }

        if let Some(idx) = args.iter().position(|a| a == "--width") {
            if let Some(width_str) = args.get(idx + 1) {
                if let Ok(width) = width_str.parse() {
                    self.window.width = width;
                }
            }
        }

        if let Some(idx) = args.iter().position(|a| a == "--height") {
            if let Some(height_str) = args.get(idx + 1) {
                if let Ok(height) = height_str.parse() {
                    self.window.height = height;
                }
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if !matches!(self.graphics.frames_in_flight, 1..=3) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.frames_in_flight".to_string(),
                reason: "Frames in flight must be 1, 2 or 3".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl GraphicsApi {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            GraphicsApi::OpenGl => "OpenGL",
            GraphicsApi::Dx11 => "Direct3D 11",
            GraphicsApi::Dx12 => "Direct3D 12",
            GraphicsApi::Vulkan => "Vulkan",
        }
    }

    /// 该后端的裁剪空间 Y 轴是否翻转（相对 OpenGL 约定）
    ///
    /// Direct3D 族为翻转族：深度重映射矩阵的 Y 行需要取反。
    pub fn flips_clip_space_y(&self) -> bool {
        matches!(self, GraphicsApi::Dx11 | GraphicsApi::Dx12)
    }

    /// 该后端的原生裁剪空间 Z 范围是否为 [0,1]
    ///
    /// 为 true 的后端需要把 [-1,1] 的 Z 重映射到 [0,1]（深度 pass）。
    pub fn clip_space_z_zero_to_one(&self) -> bool {
        !matches!(self, GraphicsApi::OpenGl)
    }
}
