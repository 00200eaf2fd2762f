//! Direct3D 12 后端上下文
//!
//! 命令列表 + fence 模型：绘制记录进命令列表，提交时在队列上签发
//! fence 值；常量缓冲位于上传堆，按 Map/拷贝/Unmap 复写。资源释放
//! 必须尊重在途帧：fence 未越过签发值时进入延迟回收队列，
//! 呈现后统一回收。
//!
//! # 设计原则
//!
//! 1. 释放请求永不阻塞 —— 在途时延迟，空闲时立即
//! 2. 设备移除是粘滞状态，fence 等待不再重试
//! 3. PSO/根签名按着色器身份创建，几何缓冲不感知

use std::collections::HashMap;

use tracing::{debug, error, trace};

use crate::core::error::{DrawError, Result, ShaderError};
use crate::core::MAX_TEXTURE_SLOTS;
use crate::renderer::sync::FrameFence;

use super::handle::{
    BufferHandle, HandleAllocator, PipelineHandle, RootSignatureHandle, ShaderModuleHandle,
    TextureHandle,
};
use super::opengl::ShaderStage;
use super::TextureKind;

#[derive(Debug)]
struct Dx12Buffer {
    data: Vec<u8>,
    /// 上传堆缓冲可由 CPU 映射写入
    upload_heap: bool,
}

#[derive(Debug)]
struct Dx12Pipeline {
    #[allow(dead_code)]
    root_signature: RootSignatureHandle,
}

/// 延迟回收队列中的资源
#[derive(Debug, Clone, Copy)]
enum RetiredResource {
    Buffer(BufferHandle),
    Shader(ShaderModuleHandle),
}

/// Direct3D 12 设备上下文
#[derive(Debug)]
pub struct Dx12Context {
    ids: HandleAllocator,
    buffers: HashMap<BufferHandle, Dx12Buffer>,
    shaders: HashMap<ShaderModuleHandle, ShaderStage>,
    root_signatures: HashMap<RootSignatureHandle, ()>,
    pipelines: HashMap<PipelineHandle, Dx12Pipeline>,
    textures: HashMap<TextureHandle, TextureKind>,
    /// 帧 fence：提交签发，呈现推进
    pub fence: FrameFence,
    /// CPU 允许领先 GPU 的最大帧数，提交时据此等待 fence
    frames_in_flight: u64,
    /// 延迟回收队列：(签发时的 fence 值, 资源)
    pending_retire: Vec<(u64, RetiredResource)>,
    /// 描述符表槽位的当前绑定
    pub bound_resource_slots: [Option<(TextureHandle, TextureKind)>; MAX_TEXTURE_SLOTS],
    /// 根参数槽位的常量缓冲
    bound_constant_buffers: HashMap<u32, BufferHandle>,
    recorded_commands: u64,
    device_lost: bool,
}

impl Default for Dx12Context {
    fn default() -> Self {
        Self {
            ids: HandleAllocator::default(),
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            root_signatures: HashMap::new(),
            pipelines: HashMap::new(),
            textures: HashMap::new(),
            fence: FrameFence::default(),
            frames_in_flight: 2,
            pending_retire: Vec::new(),
            bound_resource_slots: [None; MAX_TEXTURE_SLOTS],
            bound_constant_buffers: HashMap::new(),
            recorded_commands: 0,
            device_lost: false,
        }
    }
}

impl Dx12Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 CPU 可领先 GPU 的帧数上限（至少 1）
    pub fn set_frames_in_flight(&mut self, frames: u32) {
        self.frames_in_flight = u64::from(frames.max(1));
    }

    pub fn frames_in_flight(&self) -> u64 {
        self.frames_in_flight
    }

    // ------------------------------------------------------------------
    // 缓冲
    // ------------------------------------------------------------------

    /// 创建默认堆缓冲（顶点/索引，初始数据经上传堆一次拷入）
    pub fn create_buffer(&mut self, data: &[u8]) -> BufferHandle {
        let handle = BufferHandle(self.ids.allocate());
        self.buffers.insert(
            handle,
            Dx12Buffer {
                data: data.to_vec(),
                upload_heap: false,
            },
        );
        handle
    }

    /// 创建上传堆常量缓冲
    pub fn create_constant_buffer(&mut self, size: usize) -> BufferHandle {
        let handle = BufferHandle(self.ids.allocate());
        self.buffers.insert(
            handle,
            Dx12Buffer {
                data: vec![0u8; size],
                upload_heap: true,
            },
        );
        handle
    }

    /// Map + 拷贝 + Unmap（仅上传堆缓冲）
    pub fn map_copy_unmap(&mut self, buffer: BufferHandle, bytes: &[u8]) -> Result<()> {
        if self.device_lost {
            return Err(DrawError::DeviceLost.into());
        }
        let buf = self
            .buffers
            .get_mut(&buffer)
            .ok_or_else(|| DrawError::Upload(format!("unknown buffer handle {}", buffer.0)))?;
        if !buf.upload_heap {
            return Err(DrawError::Upload("buffer is not on an upload heap".to_string()).into());
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

    /// 释放缓冲
    ///
    /// 存在在途帧时不立即销毁，而是带着当前 fence 值进入延迟回收
    /// 队列，等呈现推进 fence 后回收。
    pub fn release_buffer(&mut self, buffer: BufferHandle) {
        if !self.buffers.contains_key(&buffer) {
            return;
        }
        if self.fence.has_pending_work() {
            let value = self.fence.current_value();
            trace!(handle = buffer.0, fence = value, "deferring buffer retire");
            self.pending_retire
                .push((value, RetiredResource::Buffer(buffer)));
        } else {
            self.buffers.remove(&buffer);
        }
    }

    /// 回收 fence 已越过的延迟释放资源
    pub fn collect_garbage(&mut self) {
        let completed = self.fence.completed_value();
        let mut retired = 0usize;
        self.pending_retire.retain(|&(value, resource)| {
            if value <= completed {
                match resource {
                    RetiredResource::Buffer(handle) => {
                        self.buffers.remove(&handle);
                    }
                    RetiredResource::Shader(handle) => {
                        self.shaders.remove(&handle);
                    }
                }
                retired += 1;
                false
            } else {
                true
            }
        });
        if retired > 0 {
            debug!(retired, "collected retired resources");
        }
    }

    pub fn buffer_exists(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer)
    }

    pub fn buffer_bytes(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    pub fn pending_retire_count(&self) -> usize {
        self.pending_retire.len()
    }

    // ------------------------------------------------------------------
    // 着色器 / 根签名 / PSO
    // ------------------------------------------------------------------

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
        Ok(handle)
    }

    /// 释放着色器 blob，在途时与缓冲走同一条延迟回收队列
    pub fn release_shader(&mut self, shader: ShaderModuleHandle) {
        if !self.shaders.contains_key(&shader) {
            return;
        }
        if self.fence.has_pending_work() {
            let value = self.fence.current_value();
            trace!(handle = shader.0, fence = value, "deferring shader retire");
            self.pending_retire
                .push((value, RetiredResource::Shader(shader)));
        } else {
            self.shaders.remove(&shader);
        }
    }

    pub fn shader_exists(&self, shader: ShaderModuleHandle) -> bool {
        self.shaders.contains_key(&shader)
    }

    pub fn create_root_signature(&mut self) -> RootSignatureHandle {
        let handle = RootSignatureHandle(self.ids.allocate());
        self.root_signatures.insert(handle, ());
        handle
    }

    pub fn release_root_signature(&mut self, root: RootSignatureHandle) {
        self.root_signatures.remove(&root);
    }

    /// 创建图形管线状态对象
    pub fn create_pipeline_state(
        &mut self,
        vs: ShaderModuleHandle,
        fs: ShaderModuleHandle,
        root_signature: RootSignatureHandle,
    ) -> Result<PipelineHandle> {
        if !self.shaders.contains_key(&vs) || !self.shaders.contains_key(&fs) {
            return Err(
                ShaderError::Link("pipeline state references unknown shader blob".to_string())
                    .into(),
            );
        }
        if !self.root_signatures.contains_key(&root_signature) {
            return Err(
                ShaderError::Link("pipeline state references unknown root signature".to_string())
                    .into(),
            );
        }
        let handle = PipelineHandle(self.ids.allocate());
        self.pipelines.insert(handle, Dx12Pipeline { root_signature });
        Ok(handle)
    }

    pub fn release_pipeline_state(&mut self, pipeline: PipelineHandle) {
        self.pipelines.remove(&pipeline);
    }

    pub fn pipeline_exists(&self, pipeline: PipelineHandle) -> bool {
        self.pipelines.contains_key(&pipeline)
    }

    // ------------------------------------------------------------------
    // 纹理 / 绑定 / 命令
    // ------------------------------------------------------------------

    pub fn create_texture(&mut self, kind: TextureKind) -> TextureHandle {
        let handle = TextureHandle(self.ids.allocate());
        self.textures.insert(handle, kind);
        handle
    }

    /// 绑定描述符表中的纹理槽位
    pub fn set_descriptor_table_texture(
        &mut self,
        slot: usize,
        texture: TextureHandle,
        kind: TextureKind,
    ) {
        if slot < MAX_TEXTURE_SLOTS {
            self.bound_resource_slots[slot] = Some((texture, kind));
        }
    }

    /// 绑定根参数槽位的常量缓冲
    pub fn set_root_constant_buffer(&mut self, slot: u32, buffer: BufferHandle) {
        self.bound_constant_buffers.insert(slot, buffer);
    }

    pub fn bound_constant_buffer(&self, slot: u32) -> Option<BufferHandle> {
        self.bound_constant_buffers.get(&slot).copied()
    }

    /// 向命令列表记录一次索引绘制
    pub fn record_draw_indexed(&mut self, _index_count: usize) -> Result<()> {
        if self.device_lost {
            return Err(DrawError::DeviceLost.into());
        }
        self.recorded_commands += 1;
        Ok(())
    }

    pub fn recorded_command_count(&self) -> u64 {
        self.recorded_commands
    }

    /// 提交命令列表：在队列上签发 fence 值
    ///
    /// 签发前检查在途帧数：CPU 不得领先 GPU 超过 frames_in_flight 帧，
    /// 超出时等待最旧的 fence 值越过后再继续。
    pub fn execute_command_lists(&mut self) -> u64 {
        let current = self.fence.current_value();
        let completed = self.fence.completed_value();
        if current - completed >= self.frames_in_flight {
            let wait_for = current + 1 - self.frames_in_flight;
            trace!(wait_for, "throttling submit to frames-in-flight bound");
            self.fence.complete(wait_for);
            self.collect_garbage();
        }
        self.fence.signal()
    }

    /// 呈现：推进 fence 至指定值并回收延迟释放的资源
    pub fn present(&mut self, fence_value: u64) {
        self.fence.complete(fence_value);
        self.collect_garbage();
    }

    /// 等待队列排空
    pub fn wait_idle(&mut self) -> Result<()> {
        if self.device_lost {
            return Err(DrawError::DeviceLost.into());
        }
        self.fence.flush();
        self.collect_garbage();
        Ok(())
    }

    pub fn notify_device_removed(&mut self) {
        error!("Direct3D 12 device removed");
        self.device_lost = true;
    }

    pub fn is_lost(&self) -> bool {
        self.device_lost
    }
}
