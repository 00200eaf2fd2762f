//! Direct3D 11 后端上下文
//!
//! 立即上下文模型：常量缓冲通过 Map(DISCARD)/拷贝/Unmap 更新，
//! 驱动负责同步。固定功能状态（光栅化/混合/深度）以状态对象的
//! 形式在管线创建时固化。
//!
//! 设备移除是粘滞状态：一旦置位，后续所有绘制请求都报告设备丢失。

use std::collections::HashMap;

use tracing::{debug, error};

use crate::core::error::{DrawError, Result, ShaderError};
use crate::core::MAX_TEXTURE_SLOTS;

use super::handle::{BufferHandle, HandleAllocator, ShaderModuleHandle, StateObjectHandle, TextureHandle};
use super::opengl::ShaderStage;
use super::TextureKind;

#[derive(Debug)]
struct Dx11Buffer {
    data: Vec<u8>,
    dynamic: bool,
}

/// 固定功能状态对象的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Rasterizer,
    Blend,
    DepthStencil,
    /// 输入布局：顶点属性到 VS 输入签名的映射
    InputLayout,
}

/// Direct3D 11 设备上下文
#[derive(Debug, Default)]
pub struct Dx11Context {
    ids: HandleAllocator,
    buffers: HashMap<BufferHandle, Dx11Buffer>,
    shaders: HashMap<ShaderModuleHandle, ShaderStage>,
    states: HashMap<StateObjectHandle, StateKind>,
    textures: HashMap<TextureHandle, TextureKind>,
    /// 着色器资源槽位的当前绑定
    pub bound_resource_slots: [Option<(TextureHandle, TextureKind)>; MAX_TEXTURE_SLOTS],
    /// VS/PS 常量缓冲槽位
    bound_constant_buffers: HashMap<u32, BufferHandle>,
    /// 当前绑定的 (顶点, 像素) 着色器
    bound_shaders: Option<(ShaderModuleHandle, ShaderModuleHandle)>,
    device_lost: bool,
    draw_calls: u64,
}

impl Dx11Context {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // 缓冲
    // ------------------------------------------------------------------

    /// 创建不可变缓冲（顶点/索引，初始数据一次写入）
    pub fn create_buffer(&mut self, data: &[u8]) -> BufferHandle {
        let handle = BufferHandle(self.ids.allocate());
        self.buffers.insert(
            handle,
            Dx11Buffer {
                data: data.to_vec(),
                dynamic: false,
            },
        );
        handle
    }

    /// 创建动态常量缓冲（CPU 每帧可写）
    pub fn create_constant_buffer(&mut self, size: usize) -> BufferHandle {
        let handle = BufferHandle(self.ids.allocate());
        self.buffers.insert(
            handle,
            Dx11Buffer {
                data: vec![0u8; size],
                dynamic: true,
            },
        );
        handle
    }

    /// Map(WRITE_DISCARD) + 拷贝 + Unmap
    ///
    /// 只允许写动态缓冲，且写入长度不得超过缓冲大小。
    pub fn map_write_discard(&mut self, buffer: BufferHandle, bytes: &[u8]) -> Result<()> {
        if self.device_lost {
            return Err(DrawError::DeviceLost.into());
        }
        let buf = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| DrawError::Upload(format!("unknown buffer handle {}", buffer.0)))?;
        if !buf.dynamic {
            return Err(DrawError::Upload("buffer is not CPU-writable".to_string()).into());
        }
        if bytes.len() > buf.data.len() {
            return Err(DrawError::Upload(format!(
                "write of {} bytes exceeds buffer size {}",
                bytes.len(),
                buf.data.len()
            ))
            .into());
        }
        buf.data[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn release_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    pub fn buffer_exists(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer)
    }

    pub fn buffer_bytes(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    /// 绑定常量缓冲到 VS/PS 槽位
    pub fn set_constant_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.bound_constant_buffers.insert(slot, buffer);
    }

    pub fn bound_constant_buffer(&self, slot: u32) -> Option<BufferHandle> {
        self.bound_constant_buffers.get(&slot).copied()
    }

    // ------------------------------------------------------------------
    // 着色器与状态对象
    // ------------------------------------------------------------------

    /// 编译着色器 blob
    pub fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderModuleHandle> {
        if source.trim().is_empty() {
            return Err(ShaderError::Compile(format!("{:?} stage: empty source", stage)).into());
        }
        let handle = ShaderModuleHandle(self.ids.allocate());
        self.shaders.insert(handle, stage);
        debug!(?stage, handle = handle.0, "compiled shader blob");
        Ok(handle)
    }

    pub fn release_shader(&mut self, shader: ShaderModuleHandle) {
        self.shaders.remove(&shader);
    }

    pub fn shader_exists(&self, shader: ShaderModuleHandle) -> bool {
        self.shaders.contains_key(&shader)
    }

    /// VSSetShader + PSSetShader
    pub fn set_shaders(&mut self, vs: ShaderModuleHandle, fs: ShaderModuleHandle) {
        self.bound_shaders = Some((vs, fs));
    }

    pub fn bound_shaders(&self) -> Option<(ShaderModuleHandle, ShaderModuleHandle)> {
        self.bound_shaders
    }

    pub fn create_state_object(&mut self, kind: StateKind) -> StateObjectHandle {
        let handle = StateObjectHandle(self.ids.allocate());
        self.states.insert(handle, kind);
        handle
    }

    pub fn release_state_object(&mut self, state: StateObjectHandle) {
        self.states.remove(&state);
    }

    pub fn state_object_kind(&self, state: StateObjectHandle) -> Option<StateKind> {
        self.states.get(&state).copied()
    }

    // ------------------------------------------------------------------
    // 纹理与绘制
    // ------------------------------------------------------------------

    pub fn create_texture(&mut self, kind: TextureKind) -> TextureHandle {
        let handle = TextureHandle(self.ids.allocate());
        self.textures.insert(handle, kind);
        handle
    }

    /// 绑定着色器资源视图到槽位
    pub fn set_shader_resource(&mut self, slot: usize, texture: TextureHandle, kind: TextureKind) {
        if slot < MAX_TEXTURE_SLOTS {
            self.bound_resource_slots[slot] = Some((texture, kind));
        }
    }

    pub fn draw_indexed(&mut self, _index_count: usize) -> Result<()> {
        if self.device_lost {
            return Err(DrawError::DeviceLost.into());
        }
        self.draw_calls += 1;
        Ok(())
    }

    pub fn draw_call_count(&self) -> u64 {
        self.draw_calls
    }

    /// 标记设备已移除（DXGI_ERROR_DEVICE_REMOVED）
    pub fn notify_device_removed(&mut self) {
        error!("Direct3D 11 device removed");
        self.device_lost = true;
    }

    pub fn is_lost(&self) -> bool {
        self.device_lost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_write_copies_into_constant_buffer() {
        let mut ctx = Dx11Context::new();
        let cb = ctx.create_constant_buffer(8);
        ctx.map_write_discard(cb, &[5, 6, 7]).unwrap();
        assert_eq!(ctx.buffer_bytes(cb), Some(&[5u8, 6, 7, 0, 0, 0, 0, 0][..]));
    }

    #[test]
    fn test_map_write_rejects_immutable_and_overflow() {
        let mut ctx = Dx11Context::new();
        let vb = ctx.create_buffer(&[0; 4]);
        assert!(ctx.map_write_discard(vb, &[1]).is_err());

        let cb = ctx.create_constant_buffer(2);
        assert!(ctx.map_write_discard(cb, &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_set_shaders_records_current_pair() {
        let mut ctx = Dx11Context::new();
        let vs = ctx.compile_shader(ShaderStage::Vertex, "vs").unwrap();
        let fs = ctx.compile_shader(ShaderStage::Fragment, "fs").unwrap();
        assert!(ctx.bound_shaders().is_none());
        ctx.set_shaders(vs, fs);
        assert_eq!(ctx.bound_shaders(), Some((vs, fs)));
    }

    #[test]
    fn test_device_removed_is_sticky() {
        let mut ctx = Dx11Context::new();
        assert!(ctx.draw_indexed(3).is_ok());
        ctx.notify_device_removed();
        assert!(matches!(
            ctx.draw_indexed(3),
            Err(crate::core::PolyRenderError::Draw(DrawError::DeviceLost))
        ));
        assert!(ctx.is_lost());
    }
}
