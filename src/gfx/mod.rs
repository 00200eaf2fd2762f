//! 图形后端模块
//!
//! 每个后端一个设备上下文类型，差异以带标签的枚举分支显式表达：
//! - **opengl**: 立即模式，隐式同步
//! - **dx11**: 映射常量缓冲 + 状态对象
//! - **dx12**: 命令列表 + fence + 延迟回收
//! - **vulkan**: 描述符集 + buffer/memory 成对分配
//!
//! [`GraphicsDevice`] 是四种上下文的标签联合，只提供真正后端无关的
//! 动词（清屏、呈现、等待空闲）；绑定路径上的差异由 `renderer` 层
//! 按分支显式处理。

pub mod dx11;
pub mod dx12;
pub mod handle;
pub mod opengl;
pub mod vulkan;

use tracing::info;

use crate::core::error::Result;
use crate::core::GraphicsApi;

use handle::TextureHandle;

/// 纹理维度种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureKind {
    /// 2D 纹理
    TwoDim,
    /// 2D 纹理数组（深度贴图集合）
    TwoDimArray,
    /// 立方体纹理
    Cube,
    /// 立方体纹理数组（点光源深度贴图集合）
    CubeArray,
}

impl TextureKind {
    /// 是否为立方体族（立方体采样器只接受立方体族纹理）
    pub fn is_cube(&self) -> bool {
        matches!(self, TextureKind::Cube | TextureKind::CubeArray)
    }
}

/// 渲染目标种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferKind {
    /// 默认交换链
    Screen,
    /// 离屏颜色附件（水面反射/折射等）
    Color2D,
    /// 2D 深度贴图（方向光/聚光）
    DepthMap2D,
    /// 立方体深度贴图（点光源，六个面）
    DepthMapCube,
}

impl FramebufferKind {
    /// 深度贴图目标只清深度，不清颜色
    pub fn is_depth_only(&self) -> bool {
        matches!(self, FramebufferKind::DepthMap2D | FramebufferKind::DepthMapCube)
    }
}

/// 当前绑定的渲染目标
#[derive(Debug, Clone, Copy)]
pub struct RenderTarget {
    pub kind: FramebufferKind,
    pub texture: Option<TextureHandle>,
    /// 数组层（2D 深度贴图的光源索引 / 立方体贴图的面）
    pub layer: u32,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self {
            kind: FramebufferKind::Screen,
            texture: None,
            layer: 0,
        }
    }
}

/// 图形设备：四种后端上下文的标签联合
#[derive(Debug)]
pub enum GraphicsDevice {
    OpenGl(opengl::GlContext),
    Dx11(dx11::Dx11Context),
    Dx12(dx12::Dx12Context),
    Vulkan(vulkan::VulkanContext),
}

impl GraphicsDevice {
    /// 按配置的后端创建设备
    pub fn new(api: GraphicsApi) -> Self {
        info!(backend = api.name(), "creating graphics device");
        match api {
            GraphicsApi::OpenGl => GraphicsDevice::OpenGl(opengl::GlContext::new()),
            GraphicsApi::Dx11 => GraphicsDevice::Dx11(dx11::Dx11Context::new()),
            GraphicsApi::Dx12 => GraphicsDevice::Dx12(dx12::Dx12Context::new()),
            GraphicsApi::Vulkan => GraphicsDevice::Vulkan(vulkan::VulkanContext::new()),
        }
    }

    pub fn api(&self) -> GraphicsApi {
        match self {
            GraphicsDevice::OpenGl(_) => GraphicsApi::OpenGl,
            GraphicsDevice::Dx11(_) => GraphicsApi::Dx11,
            GraphicsDevice::Dx12(_) => GraphicsApi::Dx12,
            GraphicsDevice::Vulkan(_) => GraphicsApi::Vulkan,
        }
    }

    pub fn create_texture(&mut self, kind: TextureKind) -> TextureHandle {
        match self {
            GraphicsDevice::OpenGl(ctx) => ctx.create_texture(kind),
            GraphicsDevice::Dx11(ctx) => ctx.create_texture(kind),
            GraphicsDevice::Dx12(ctx) => ctx.create_texture(kind),
            GraphicsDevice::Vulkan(ctx) => ctx.create_texture(kind),
        }
    }

    /// 设置 fence 型后端的在途帧上限（立即模式后端无此概念）
    pub fn set_frames_in_flight(&mut self, frames: u32) {
        match self {
            GraphicsDevice::OpenGl(_) | GraphicsDevice::Dx11(_) => {}
            GraphicsDevice::Dx12(ctx) => ctx.set_frames_in_flight(frames),
            GraphicsDevice::Vulkan(ctx) => ctx.set_frames_in_flight(frames),
        }
    }

    /// 设备是否已丢失（立即模式后端永不丢失）
    pub fn is_lost(&self) -> bool {
        match self {
            GraphicsDevice::OpenGl(_) => false,
            GraphicsDevice::Dx11(ctx) => ctx.is_lost(),
            GraphicsDevice::Dx12(ctx) => ctx.is_lost(),
            GraphicsDevice::Vulkan(ctx) => ctx.is_lost(),
        }
    }

    /// 标记设备丢失（驱动回调）
    pub fn notify_device_removed(&mut self) {
        match self {
            GraphicsDevice::OpenGl(_) => {}
            GraphicsDevice::Dx11(ctx) => ctx.notify_device_removed(),
            GraphicsDevice::Dx12(ctx) => ctx.notify_device_removed(),
            GraphicsDevice::Vulkan(ctx) => ctx.notify_device_lost(),
        }
    }

    /// 等待设备空闲（销毁常驻资源前调用）
    pub fn wait_idle(&mut self) -> Result<()> {
        match self {
            GraphicsDevice::OpenGl(_) | GraphicsDevice::Dx11(_) => Ok(()),
            GraphicsDevice::Dx12(ctx) => ctx.wait_idle(),
            GraphicsDevice::Vulkan(ctx) => ctx.device_wait_idle(),
        }
    }

    /// 提交并呈现一帧（fence 型后端推进 fence 并回收延迟资源）
    pub fn present(&mut self) {
        match self {
            GraphicsDevice::OpenGl(_) | GraphicsDevice::Dx11(_) => {}
            GraphicsDevice::Dx12(ctx) => {
                let value = ctx.execute_command_lists();
                ctx.present(value);
            }
            GraphicsDevice::Vulkan(ctx) => {
                let value = ctx.submit();
                ctx.present(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_matches_api() {
        let device = GraphicsDevice::new(GraphicsApi::Vulkan);
        assert_eq!(device.api(), GraphicsApi::Vulkan);
        assert!(!device.is_lost());
    }

    #[test]
    fn test_depth_targets_are_depth_only() {
        assert!(FramebufferKind::DepthMap2D.is_depth_only());
        assert!(FramebufferKind::DepthMapCube.is_depth_only());
        assert!(!FramebufferKind::Screen.is_depth_only());
        assert!(!FramebufferKind::Color2D.is_depth_only());
    }

    #[test]
    fn test_cube_family() {
        assert!(TextureKind::Cube.is_cube());
        assert!(TextureKind::CubeArray.is_cube());
        assert!(!TextureKind::TwoDimArray.is_cube());
    }
}
