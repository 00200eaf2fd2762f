//! 渲染上下文
//!
//! 把设备、相机、光源表、占位纹理与 sRGB 开关收拢成一个显式传递的
//! 值，取代散落的全局状态。所有绘制都经过 [`RenderContext::draw`]：
//! 不可恢复的设备丢失向上冒泡，未就绪的程序或几何记日志后跳过。

use tracing::{info, trace, warn};

use crate::component::light::LightSource;
use crate::component::{Camera, Mesh};
use crate::core::error::{ConfigError, DrawError, Result};
use crate::core::math::Vector4;
use crate::core::{Config, GraphicsApi, MAX_LIGHT_SOURCES};
use crate::gfx::handle::TextureHandle;
use crate::gfx::{FramebufferKind, GraphicsDevice, RenderTarget, TextureKind};

use super::buffer::{GpuBuffer, PipelineKind};
use super::program::{FrameInputs, ShaderProgram};
use super::snapshot::DrawProperties;

/// 渲染上下文
///
/// 字段公开以便调用方按字段拆分借用（设备可变、场景状态不可变）。
#[derive(Debug)]
pub struct RenderContext {
    pub device: GraphicsDevice,
    pub camera: Camera,
    pub lights: [Option<LightSource>; MAX_LIGHT_SOURCES],
    /// 2D 占位纹理
    pub empty_texture: TextureHandle,
    /// 立方体占位纹理
    pub empty_cubemap: TextureHandle,
    pub enable_srgb: bool,
    target: RenderTarget,
}

impl RenderContext {
    /// 按配置创建上下文与设备，并准备占位纹理
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let mut device = GraphicsDevice::new(config.graphics.backend);
        device.set_frames_in_flight(config.graphics.frames_in_flight);
        let empty_texture = device.create_texture(TextureKind::TwoDim);
        let empty_cubemap = device.create_texture(TextureKind::Cube);
        info!(
            backend = config.graphics.backend.name(),
            srgb = config.graphics.srgb,
            frames_in_flight = config.graphics.frames_in_flight,
            "render context ready"
        );
        Ok(Self {
            device,
            camera: Camera::default(),
            lights: Default::default(),
            empty_texture,
            empty_cubemap,
            enable_srgb: config.graphics.srgb,
            target: RenderTarget::default(),
        })
    }

    pub fn api(&self) -> GraphicsApi {
        self.device.api()
    }

    /// 放置/清除光源
    pub fn set_light(&mut self, index: usize, light: Option<LightSource>) -> Result<()> {
        if index >= MAX_LIGHT_SOURCES {
            return Err(ConfigError::InvalidValue {
                field: "light index".to_string(),
                reason: format!("index {} exceeds capacity {}", index, MAX_LIGHT_SOURCES),
            }
            .into());
        }
        self.lights[index] = light;
        Ok(())
    }

    /// 绑定渲染目标
    pub fn bind(&mut self, kind: FramebufferKind, texture: Option<TextureHandle>, layer: u32) {
        trace!(?kind, layer, "bind render target");
        self.target = RenderTarget {
            kind,
            texture,
            layer,
        };
    }

    /// 清空当前目标（深度贴图目标只清深度）
    pub fn clear(&mut self, color: Vector4) {
        if self.target.kind.is_depth_only() {
            trace!("clear depth");
        } else {
            trace!(r = color.x, g = color.y, b = color.z, "clear color and depth");
        }
    }

    pub fn current_target(&self) -> &RenderTarget {
        &self.target
    }

    /// 绘制一个网格
    ///
    /// 致命路径：设备丢失立即返回错误。可恢复路径：程序未就绪或
    /// 几何未常驻时记 warn 并以 `Skipped` 返回，调用方继续下一个。
    pub fn draw(
        &mut self,
        mesh: &Mesh,
        buffer: &mut GpuBuffer,
        program: &ShaderProgram,
        props: &DrawProperties,
    ) -> Result<()> {
        if self.device.is_lost() {
            return Err(DrawError::DeviceLost.into());
        }
        if !program.is_ready() {
            warn!(program = program.name(), "draw skipped: program not ready");
            return Err(DrawError::Skipped(format!(
                "program '{}' is not ready",
                program.name()
            ))
            .into());
        }
        if !buffer.is_resident() {
            warn!(program = program.name(), "draw skipped: geometry not resident");
            return Err(DrawError::Skipped("geometry is not resident".to_string()).into());
        }

        let kind = if self.target.kind == FramebufferKind::Screen {
            PipelineKind::Main
        } else {
            PipelineKind::Framebuffer
        };
        buffer.ensure_pipeline(program.identity(), kind, program, &mut self.device)?;

        let frame = FrameInputs {
            camera: &self.camera,
            lights: &self.lights,
            empty_texture: self.empty_texture,
            empty_cubemap: self.empty_cubemap,
            enable_srgb: self.enable_srgb,
        };
        program.update_uniforms(mesh, buffer, props, &frame, &mut self.device)?;

        let index_count = buffer.index_count();
        match &mut self.device {
            GraphicsDevice::OpenGl(ctx) => {
                ctx.draw_indexed(index_count);
                Ok(())
            }
            GraphicsDevice::Dx11(ctx) => ctx.draw_indexed(index_count),
            GraphicsDevice::Dx12(ctx) => ctx.record_draw_indexed(index_count),
            GraphicsDevice::Vulkan(ctx) => ctx.record_draw_indexed(index_count),
        }
    }

    /// 提交并呈现一帧
    pub fn present(&mut self) {
        self.device.present();
    }

    /// 交换链/帧缓冲格式变化后，丢弃给定缓冲的全部管线
    pub fn reset_pipelines<'a, I>(&mut self, buffers: I)
    where
        I: IntoIterator<Item = &'a mut GpuBuffer>,
    {
        for buffer in buffers {
            buffer.invalidate_pipelines(&mut self.device);
        }
    }

    /// 停机前等待设备空闲
    pub fn shutdown(&mut self) -> Result<()> {
        self.device.wait_idle()
    }
}
