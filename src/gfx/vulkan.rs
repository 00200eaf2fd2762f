//! Vulkan 后端上下文
//!
//! 描述符集模型：uniform 缓冲与采样器纹理都通过描述符写入更新，
//! 缓冲与设备内存成对分配，常量数据按 Map/拷贝/Unmap 写入主机
//! 可见内存。
//!
//! 绑定点约定（所有内置着色器共享同一套描述符集布局）：
//! - binding 0: 矩阵常量块
//! - binding 1: Default/材质常量块
//! - binding 2: 网格纹理数组
//! - binding 3: 2D 深度贴图数组
//! - binding 4: 立方体深度贴图数组

use std::collections::HashMap;

use tracing::{debug, error};

use crate::core::error::{DrawError, Result, ShaderError};
use crate::renderer::sync::FrameFence;

use super::handle::{
    BufferHandle, DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle,
    HandleAllocator, MemoryHandle, PipelineHandle, PipelineLayoutHandle, ShaderModuleHandle,
    TextureHandle,
};
use super::TextureKind;

/// 矩阵常量块绑定点
pub const BINDING_MATRIX: u32 = 0;
/// Default/材质常量块绑定点
pub const BINDING_DEFAULT: u32 = 1;
/// 网格纹理数组绑定点
pub const BINDING_TEXTURES: u32 = 2;
/// 2D 深度贴图数组绑定点
pub const BINDING_DEPTH_2D: u32 = 3;
/// 立方体深度贴图数组绑定点
pub const BINDING_DEPTH_CUBE: u32 = 4;

/// 一次描述符写入
#[derive(Debug, Clone)]
pub enum DescriptorWrite {
    /// uniform 缓冲绑定
    UniformBuffer {
        set: DescriptorSetHandle,
        binding: u32,
        buffer: BufferHandle,
    },
    /// 组合图像采样器数组绑定
    CombinedImageSamplers {
        set: DescriptorSetHandle,
        binding: u32,
        images: Vec<(TextureHandle, TextureKind)>,
    },
}

/// 描述符绑定的记录值（供查询/测试）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedBinding {
    UniformBuffer(BufferHandle),
    CombinedImageSamplers(Vec<(TextureHandle, TextureKind)>),
}

#[derive(Debug)]
struct VkBuffer {
    memory: MemoryHandle,
    size: usize,
}

/// Vulkan 设备上下文
#[derive(Debug)]
pub struct VulkanContext {
    ids: HandleAllocator,
    buffers: HashMap<BufferHandle, VkBuffer>,
    memories: HashMap<MemoryHandle, Vec<u8>>,
    shader_modules: HashMap<ShaderModuleHandle, ()>,
    set_layouts: HashMap<DescriptorSetLayoutHandle, ()>,
    pipeline_layouts: HashMap<PipelineLayoutHandle, ()>,
    pools: HashMap<DescriptorPoolHandle, Vec<DescriptorSetHandle>>,
    sets: HashMap<DescriptorSetHandle, HashMap<u32, RecordedBinding>>,
    pipelines: HashMap<PipelineHandle, ()>,
    textures: HashMap<TextureHandle, TextureKind>,
    /// 队列 fence：提交签发，呈现推进
    pub fence: FrameFence,
    /// CPU 允许领先 GPU 的最大帧数，提交时据此等待 fence
    frames_in_flight: u64,
    device_lost: bool,
    recorded_draws: u64,
}

impl Default for VulkanContext {
    fn default() -> Self {
        Self {
            ids: HandleAllocator::default(),
            buffers: HashMap::new(),
            memories: HashMap::new(),
            shader_modules: HashMap::new(),
            set_layouts: HashMap::new(),
            pipeline_layouts: HashMap::new(),
            pools: HashMap::new(),
            sets: HashMap::new(),
            pipelines: HashMap::new(),
            textures: HashMap::new(),
            fence: FrameFence::default(),
            frames_in_flight: 2,
            device_lost: false,
            recorded_draws: 0,
        }
    }
}

impl VulkanContext {
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
    // 缓冲与内存
    // ------------------------------------------------------------------

    /// 分配缓冲及其背后的主机可见内存
    pub fn create_buffer(&mut self, size: usize) -> (BufferHandle, MemoryHandle) {
        let memory = MemoryHandle(self.ids.allocate());
        self.memories.insert(memory, vec![0u8; size]);

        let buffer = BufferHandle(self.ids.allocate());
        self.buffers.insert(buffer, VkBuffer { memory, size });
        (buffer, memory)
    }

    /// 分配并写入初始数据（顶点/索引缓冲）
    pub fn create_buffer_with_data(&mut self, data: &[u8]) -> (BufferHandle, MemoryHandle) {
        let (buffer, memory) = self.create_buffer(data.len());
        if let Some(mem) = self.memories.get_mut(&memory) {
            mem.copy_from_slice(data);
        }
        (buffer, memory)
    }

    /// Map + 拷贝 + Unmap
    pub fn update_memory(&mut self, memory: MemoryHandle, bytes: &[u8]) -> Result<()> {
        if self.device_lost {
            return Err(DrawError::DeviceLost.into());
        }
        let mem = self
            .memories
            .get_mut(&memory)
            .ok_or_else(|| DrawError::Upload(format!("unknown memory handle {}", memory.0)))?;
        if bytes.len() > mem.len() {
            return Err(DrawError::Upload(format!(
                "write of {} bytes exceeds allocation size {}",
                bytes.len(),
                mem.len()
            ))
            .into());
        }
        mem[..bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    /// 销毁缓冲并释放其内存
    pub fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buf) = self.buffers.remove(&buffer) {
            self.memories.remove(&buf.memory);
        }
    }

    pub fn buffer_exists(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer)
    }

    pub fn buffer_size(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(&buffer).map(|b| b.size)
    }

    pub fn memory_bytes(&self, memory: MemoryHandle) -> Option<&[u8]> {
        self.memories.get(&memory).map(|m| m.as_slice())
    }

    // ------------------------------------------------------------------
    // 着色器与管线
    // ------------------------------------------------------------------

    /// 创建着色器模块（SPIR-V）
    pub fn create_shader_module(&mut self, code: &str) -> Result<ShaderModuleHandle> {
        if code.trim().is_empty() {
            return Err(ShaderError::Compile("empty SPIR-V module".to_string()).into());
        }
        let handle = ShaderModuleHandle(self.ids.allocate());
        self.shader_modules.insert(handle, ());
        Ok(handle)
    }

    pub fn destroy_shader_module(&mut self, module: ShaderModuleHandle) {
        self.shader_modules.remove(&module);
    }

    pub fn shader_module_exists(&self, module: ShaderModuleHandle) -> bool {
        self.shader_modules.contains_key(&module)
    }

    pub fn create_pipeline_layout(
        &mut self,
        set_layout: DescriptorSetLayoutHandle,
    ) -> Result<PipelineLayoutHandle> {
        if !self.set_layouts.contains_key(&set_layout) {
            return Err(ShaderError::Link(
                "pipeline layout references unknown descriptor set layout".to_string(),
            )
            .into());
        }
        let handle = PipelineLayoutHandle(self.ids.allocate());
        self.pipeline_layouts.insert(handle, ());
        Ok(handle)
    }

    pub fn destroy_pipeline_layout(&mut self, layout: PipelineLayoutHandle) {
        self.pipeline_layouts.remove(&layout);
    }

    /// 创建图形管线
    pub fn create_graphics_pipeline(
        &mut self,
        vs: ShaderModuleHandle,
        fs: ShaderModuleHandle,
        layout: PipelineLayoutHandle,
    ) -> Result<PipelineHandle> {
        if !self.shader_modules.contains_key(&vs) || !self.shader_modules.contains_key(&fs) {
            return Err(
                ShaderError::Link("pipeline references unknown shader module".to_string()).into(),
            );
        }
        if !self.pipeline_layouts.contains_key(&layout) {
            return Err(
                ShaderError::Link("pipeline references unknown pipeline layout".to_string()).into(),
            );
        }
        let handle = PipelineHandle(self.ids.allocate());
        self.pipelines.insert(handle, ());
        debug!(handle = handle.0, "created graphics pipeline");
        Ok(handle)
    }

    pub fn destroy_pipeline(&mut self, pipeline: PipelineHandle) {
        self.pipelines.remove(&pipeline);
    }

    pub fn pipeline_exists(&self, pipeline: PipelineHandle) -> bool {
        self.pipelines.contains_key(&pipeline)
    }

    // ------------------------------------------------------------------
    // 描述符
    // ------------------------------------------------------------------

    pub fn create_descriptor_set_layout(&mut self) -> DescriptorSetLayoutHandle {
        let handle = DescriptorSetLayoutHandle(self.ids.allocate());
        self.set_layouts.insert(handle, ());
        handle
    }

    pub fn destroy_descriptor_set_layout(&mut self, layout: DescriptorSetLayoutHandle) {
        self.set_layouts.remove(&layout);
    }

    pub fn create_descriptor_pool(&mut self) -> DescriptorPoolHandle {
        let handle = DescriptorPoolHandle(self.ids.allocate());
        self.pools.insert(handle, Vec::new());
        handle
    }

    /// 销毁描述符池，连带回收由它分配的所有描述符集
    pub fn destroy_descriptor_pool(&mut self, pool: DescriptorPoolHandle) {
        if let Some(sets) = self.pools.remove(&pool) {
            for set in sets {
                self.sets.remove(&set);
            }
        }
    }

    /// 从池中分配描述符集
    pub fn allocate_descriptor_set(
        &mut self,
        pool: DescriptorPoolHandle,
        layout: DescriptorSetLayoutHandle,
    ) -> Result<DescriptorSetHandle> {
        if !self.set_layouts.contains_key(&layout) {
            return Err(DrawError::Binding(
                "descriptor set allocation references unknown layout".to_string(),
            )
            .into());
        }
        let handle = DescriptorSetHandle(self.ids.allocate());
        let pool_sets = self
            .pools
            .get_mut(&pool)
            .ok_or_else(|| DrawError::Binding(format!("unknown descriptor pool {}", pool.0)))?;
        pool_sets.push(handle);
        self.sets.insert(handle, HashMap::new());
        Ok(handle)
    }

    /// 批量更新描述符集
    pub fn update_descriptor_sets(&mut self, writes: &[DescriptorWrite]) -> Result<()> {
        for write in writes {
            match write {
                DescriptorWrite::UniformBuffer { set, binding, buffer } => {
                    if !self.buffers.contains_key(buffer) {
                        return Err(DrawError::Binding(format!(
                            "descriptor write references unknown buffer {}",
                            buffer.0
                        ))
                        .into());
                    }
                    let bindings = self.sets.get_mut(set).ok_or_else(|| {
                        DrawError::Binding(format!("unknown descriptor set {}", set.0))
                    })?;
                    bindings.insert(*binding, RecordedBinding::UniformBuffer(*buffer));
                }
                DescriptorWrite::CombinedImageSamplers { set, binding, images } => {
                    let bindings = self.sets.get_mut(set).ok_or_else(|| {
                        DrawError::Binding(format!("unknown descriptor set {}", set.0))
                    })?;
                    bindings.insert(
                        *binding,
                        RecordedBinding::CombinedImageSamplers(images.clone()),
                    );
                }
            }
        }
        Ok(())
    }

    /// 查询描述符集某绑定点的当前值
    pub fn descriptor_binding(
        &self,
        set: DescriptorSetHandle,
        binding: u32,
    ) -> Option<&RecordedBinding> {
        self.sets.get(&set)?.get(&binding)
    }

    // ------------------------------------------------------------------
    // 纹理 / 绘制 / 同步
    // ------------------------------------------------------------------

    pub fn create_texture(&mut self, kind: TextureKind) -> TextureHandle {
        let handle = TextureHandle(self.ids.allocate());
        self.textures.insert(handle, kind);
        handle
    }

    pub fn record_draw_indexed(&mut self, _index_count: usize) -> Result<()> {
        if self.device_lost {
            return Err(DrawError::DeviceLost.into());
        }
        self.recorded_draws += 1;
        Ok(())
    }

    pub fn recorded_draw_count(&self) -> u64 {
        self.recorded_draws
    }

    /// 提交命令缓冲，签发 fence 值
    ///
    /// 提交前等待帧 fence：在途帧数不得超过 frames_in_flight。
    pub fn submit(&mut self) -> u64 {
        let current = self.fence.current_value();
        let completed = self.fence.completed_value();
        if current - completed >= self.frames_in_flight {
            self.fence.complete(current + 1 - self.frames_in_flight);
        }
        self.fence.signal()
    }

    /// 呈现：推进 fence
    pub fn present(&mut self, fence_value: u64) {
        self.fence.complete(fence_value);
    }

    /// vkDeviceWaitIdle
    pub fn device_wait_idle(&mut self) -> Result<()> {
        if self.device_lost {
            return Err(DrawError::DeviceLost.into());
        }
        self.fence.flush();
        Ok(())
    }

    pub fn notify_device_lost(&mut self) {
        error!("Vulkan device lost");
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
    fn test_buffer_memory_pair_lifecycle() {
        let mut ctx = VulkanContext::new();
        let (buf, mem) = ctx.create_buffer(16);
        ctx.update_memory(mem, &[7; 8]).unwrap();
        assert_eq!(&ctx.memory_bytes(mem).unwrap()[..8], &[7; 8]);

        ctx.destroy_buffer(buf);
        assert!(!ctx.buffer_exists(buf));
        assert!(ctx.memory_bytes(mem).is_none());
    }

    #[test]
    fn test_descriptor_writes_recorded_per_binding() {
        let mut ctx = VulkanContext::new();
        let (buf, _) = ctx.create_buffer(64);
        let layout = ctx.create_descriptor_set_layout();
        let pool = ctx.create_descriptor_pool();
        let set = ctx.allocate_descriptor_set(pool, layout).unwrap();
        let tex = ctx.create_texture(TextureKind::TwoDim);

        ctx.update_descriptor_sets(&[
            DescriptorWrite::UniformBuffer {
                set,
                binding: BINDING_MATRIX,
                buffer: buf,
            },
            DescriptorWrite::CombinedImageSamplers {
                set,
                binding: BINDING_TEXTURES,
                images: vec![(tex, TextureKind::TwoDim)],
            },
        ])
        .unwrap();

        assert_eq!(
            ctx.descriptor_binding(set, BINDING_MATRIX),
            Some(&RecordedBinding::UniformBuffer(buf))
        );
        assert!(matches!(
            ctx.descriptor_binding(set, BINDING_TEXTURES),
            Some(RecordedBinding::CombinedImageSamplers(images)) if images.len() == 1
        ));
    }

    #[test]
    fn test_pool_destroy_recycles_sets() {
        let mut ctx = VulkanContext::new();
        let layout = ctx.create_descriptor_set_layout();
        let pool = ctx.create_descriptor_pool();
        let set = ctx.allocate_descriptor_set(pool, layout).unwrap();

        ctx.destroy_descriptor_pool(pool);
        assert!(ctx.descriptor_binding(set, BINDING_MATRIX).is_none());
    }

    #[test]
    fn test_empty_shader_module_rejected() {
        let mut ctx = VulkanContext::new();
        assert!(ctx.create_shader_module("").is_err());
    }

    #[test]
    fn test_submit_respects_frames_in_flight_bound() {
        let mut ctx = VulkanContext::new();
        ctx.set_frames_in_flight(2);

        ctx.submit();
        ctx.submit();
        ctx.submit();
        let pending = ctx.fence.current_value() - ctx.fence.completed_value();
        assert!(pending <= 2, "pending frames {} exceed bound", pending);
    }
}
