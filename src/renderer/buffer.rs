//! GPU 几何缓冲
//!
//! 每个网格对应一个 [`GpuBuffer`]：几何数据的原生缓冲、各身份的
//! 常量缓冲，以及 fence 型后端的管线对象。后端差异是带标签的
//! 枚举分支，不存在跨后端共用的句柄并集。
//!
//! # 生命周期
//!
//! - `create_geometry` 上传几何并建立常量资源，CPU 侧数组保留
//! - `ensure_pipeline` 按身份与目标变体惰性建管线，幂等
//! - `destroy` 按依赖逆序释放；fence 型后端先等待空闲或走延迟回收

use tracing::debug;

use crate::component::Mesh;
use crate::core::error::{DrawError, Result};
use crate::core::NR_OF_SHADERS;
use crate::gfx::dx11::StateKind;
use crate::gfx::handle::{
    BufferHandle, DescriptorPoolHandle, DescriptorSetHandle, DescriptorSetLayoutHandle,
    MemoryHandle, PipelineHandle, PipelineLayoutHandle, RootSignatureHandle, StateObjectHandle,
};
use crate::gfx::GraphicsDevice;

use super::adapter::{ColorBlock, DefaultBlock, DepthBlock, HudBlock, MatrixBlock};
use super::identity::ShaderIdentity;
use super::program::{ProgramBacking, ShaderProgram};

/// 管线变体：默认交换链或离屏帧缓冲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    Main,
    Framebuffer,
}

/// 身份对应的常量块载荷大小（不含矩阵块）
pub(crate) fn constant_payload_size(identity: ShaderIdentity) -> Option<usize> {
    match identity {
        ShaderIdentity::Color | ShaderIdentity::Wireframe => {
            Some(std::mem::size_of::<ColorBlock>())
        }
        ShaderIdentity::Default | ShaderIdentity::Skybox => {
            Some(std::mem::size_of::<DefaultBlock>())
        }
        ShaderIdentity::Hud => Some(std::mem::size_of::<HudBlock>()),
        ShaderIdentity::Depth => Some(std::mem::size_of::<DepthBlock>()),
        ShaderIdentity::Unknown => None,
    }
}

/// 身份的组合常量缓冲大小：矩阵块 + 载荷块
pub(crate) fn combined_constant_size(identity: ShaderIdentity) -> Option<usize> {
    constant_payload_size(identity).map(|p| std::mem::size_of::<MatrixBlock>() + p)
}

/// 后端专属的缓冲资源
#[derive(Debug)]
pub(crate) enum BufferBacking {
    None,
    OpenGl {
        vertex_buffer: BufferHandle,
        normal_buffer: BufferHandle,
        tex_coord_buffer: BufferHandle,
        index_buffer: BufferHandle,
    },
    Dx11 {
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        /// 按身份索引的组合常量缓冲（矩阵块 + 载荷块）
        constant_buffers: [Option<BufferHandle>; NR_OF_SHADERS],
        /// 以下均按身份索引，首个管线请求时建立
        input_layouts: [Option<StateObjectHandle>; NR_OF_SHADERS],
        rasterizer_states: [Option<StateObjectHandle>; NR_OF_SHADERS],
        blend_states: [Option<StateObjectHandle>; NR_OF_SHADERS],
        depth_stencil_states: [Option<StateObjectHandle>; NR_OF_SHADERS],
    },
    Dx12 {
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        constant_buffers: [Option<BufferHandle>; NR_OF_SHADERS],
        root_signatures: [Option<RootSignatureHandle>; NR_OF_SHADERS],
        pipelines: [Option<PipelineHandle>; NR_OF_SHADERS],
        pipelines_fbo: [Option<PipelineHandle>; NR_OF_SHADERS],
    },
    Vulkan {
        vertex_buffer: BufferHandle,
        vertex_memory: MemoryHandle,
        index_buffer: BufferHandle,
        index_memory: MemoryHandle,
        /// binding 0 的矩阵常量缓冲
        matrix_uniform: (BufferHandle, MemoryHandle),
        /// binding 1 的载荷常量缓冲，按身份索引
        payload_uniforms: [Option<(BufferHandle, MemoryHandle)>; NR_OF_SHADERS],
        set_layout: DescriptorSetLayoutHandle,
        pipeline_layout: PipelineLayoutHandle,
        pool: DescriptorPoolHandle,
        descriptor_set: DescriptorSetHandle,
        pipelines: [Option<PipelineHandle>; NR_OF_SHADERS],
        pipelines_fbo: [Option<PipelineHandle>; NR_OF_SHADERS],
    },
}

/// 一个网格的 GPU 缓冲集合
#[derive(Debug)]
pub struct GpuBuffer {
    pub(crate) backing: BufferBacking,
    /// 保留的 CPU 侧几何数据（设备重建时重新上传）
    pub vertices: Vec<f32>,
    pub normals: Vec<f32>,
    pub tex_coords: Vec<f32>,
    pub indices: Vec<u32>,
}

impl GpuBuffer {
    pub fn new() -> Self {
        Self {
            backing: BufferBacking::None,
            vertices: Vec::new(),
            normals: Vec::new(),
            tex_coords: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// 几何资源是否常驻（可参与绘制）
    pub fn is_resident(&self) -> bool {
        !matches!(self.backing, BufferBacking::None)
    }

    /// 上传几何并建立常量资源
    pub fn create_geometry(&mut self, mesh: &Mesh, device: &mut GraphicsDevice) -> Result<()> {
        if !mesh.has_geometry() {
            return Err(DrawError::Upload("mesh has no geometry".to_string()).into());
        }

        self.vertices = mesh.vertices.clone();
        self.normals = mesh.normals.clone();
        self.tex_coords = mesh.tex_coords.clone();
        self.indices = mesh.indices.clone();

        self.upload(device)
    }

    /// 设备级重置后重建全部动态资源
    ///
    /// 保留的 CPU 侧几何数组重新上传；设备已丢失时旧句柄直接丢弃
    /// （随设备一起失效），否则按正常顺序释放。
    pub fn reset_dynamic_resources(&mut self, device: &mut GraphicsDevice) -> Result<()> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err(DrawError::Upload("no retained geometry to restore".to_string()).into());
        }
        if device.is_lost() {
            self.backing = BufferBacking::None;
        } else {
            self.destroy(device)?;
        }
        self.upload(device)
    }

    /// 从保留的 CPU 数组建立原生资源
    fn upload(&mut self, device: &mut GraphicsDevice) -> Result<()> {
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        let normal_bytes: &[u8] = bytemuck::cast_slice(&self.normals);
        let tex_coord_bytes: &[u8] = bytemuck::cast_slice(&self.tex_coords);
        let index_bytes: &[u8] = bytemuck::cast_slice(&self.indices);

        self.backing = match device {
            GraphicsDevice::OpenGl(ctx) => {
                let vertex_buffer = ctx.gen_buffer();
                ctx.buffer_data(vertex_buffer, vertex_bytes);
                let normal_buffer = ctx.gen_buffer();
                ctx.buffer_data(normal_buffer, normal_bytes);
                let tex_coord_buffer = ctx.gen_buffer();
                ctx.buffer_data(tex_coord_buffer, tex_coord_bytes);
                let index_buffer = ctx.gen_buffer();
                ctx.buffer_data(index_buffer, index_bytes);
                BufferBacking::OpenGl {
                    vertex_buffer,
                    normal_buffer,
                    tex_coord_buffer,
                    index_buffer,
                }
            }
            GraphicsDevice::Dx11(ctx) => {
                let vertex_buffer = ctx.create_buffer(vertex_bytes);
                let index_buffer = ctx.create_buffer(index_bytes);
                let mut constant_buffers = [None; NR_OF_SHADERS];
                for (i, slot) in constant_buffers.iter_mut().enumerate() {
                    let identity = identity_at(i);
                    if let Some(size) = combined_constant_size(identity) {
                        *slot = Some(ctx.create_constant_buffer(size));
                    }
                }
                BufferBacking::Dx11 {
                    vertex_buffer,
                    index_buffer,
                    constant_buffers,
                    input_layouts: [None; NR_OF_SHADERS],
                    rasterizer_states: [None; NR_OF_SHADERS],
                    blend_states: [None; NR_OF_SHADERS],
                    depth_stencil_states: [None; NR_OF_SHADERS],
                }
            }
            GraphicsDevice::Dx12(ctx) => {
                let vertex_buffer = ctx.create_buffer(vertex_bytes);
                let index_buffer = ctx.create_buffer(index_bytes);
                let mut constant_buffers = [None; NR_OF_SHADERS];
                for (i, slot) in constant_buffers.iter_mut().enumerate() {
                    let identity = identity_at(i);
                    if let Some(size) = combined_constant_size(identity) {
                        *slot = Some(ctx.create_constant_buffer(size));
                    }
                }
                BufferBacking::Dx12 {
                    vertex_buffer,
                    index_buffer,
                    constant_buffers,
                    root_signatures: [None; NR_OF_SHADERS],
                    pipelines: [None; NR_OF_SHADERS],
                    pipelines_fbo: [None; NR_OF_SHADERS],
                }
            }
            GraphicsDevice::Vulkan(ctx) => {
                let (vertex_buffer, vertex_memory) = ctx.create_buffer_with_data(vertex_bytes);
                let (index_buffer, index_memory) = ctx.create_buffer_with_data(index_bytes);
                let matrix_uniform = ctx.create_buffer(std::mem::size_of::<MatrixBlock>());
                let mut payload_uniforms = [None; NR_OF_SHADERS];
                for (i, slot) in payload_uniforms.iter_mut().enumerate() {
                    if let Some(size) = constant_payload_size(identity_at(i)) {
                        *slot = Some(ctx.create_buffer(size));
                    }
                }
                let set_layout = ctx.create_descriptor_set_layout();
                let pipeline_layout = ctx.create_pipeline_layout(set_layout)?;
                let pool = ctx.create_descriptor_pool();
                let descriptor_set = ctx.allocate_descriptor_set(pool, set_layout)?;
                BufferBacking::Vulkan {
                    vertex_buffer,
                    vertex_memory,
                    index_buffer,
                    index_memory,
                    matrix_uniform,
                    payload_uniforms,
                    set_layout,
                    pipeline_layout,
                    pool,
                    descriptor_set,
                    pipelines: [None; NR_OF_SHADERS],
                    pipelines_fbo: [None; NR_OF_SHADERS],
                }
            }
        };

        debug!(
            backend = device.api().name(),
            indices = self.indices.len(),
            "geometry uploaded"
        );
        Ok(())
    }

    /// 确保指定身份与变体的管线存在
    ///
    /// 已存在时直接返回；立即模式后端不需要管线对象。
    pub fn ensure_pipeline(
        &mut self,
        identity: ShaderIdentity,
        kind: PipelineKind,
        program: &ShaderProgram,
        device: &mut GraphicsDevice,
    ) -> Result<()> {
        let index = identity
            .index()
            .ok_or_else(|| DrawError::Binding("unknown shader identity".to_string()))?;

        match (&mut self.backing, device) {
            (BufferBacking::None, _) => {
                Err(DrawError::Binding("geometry is not resident".to_string()).into())
            }
            (BufferBacking::OpenGl { .. }, GraphicsDevice::OpenGl(_)) => Ok(()),
            (
                BufferBacking::Dx11 {
                    input_layouts,
                    rasterizer_states,
                    blend_states,
                    depth_stencil_states,
                    ..
                },
                GraphicsDevice::Dx11(ctx),
            ) => {
                // 每个身份有自己的输入布局与固定功能状态
                if input_layouts[index].is_none() {
                    input_layouts[index] = Some(ctx.create_state_object(StateKind::InputLayout));
                }
                if rasterizer_states[index].is_none() {
                    rasterizer_states[index] =
                        Some(ctx.create_state_object(StateKind::Rasterizer));
                }
                if blend_states[index].is_none() {
                    blend_states[index] = Some(ctx.create_state_object(StateKind::Blend));
                }
                if depth_stencil_states[index].is_none() {
                    depth_stencil_states[index] =
                        Some(ctx.create_state_object(StateKind::DepthStencil));
                }
                Ok(())
            }
            (
                BufferBacking::Dx12 {
                    root_signatures,
                    pipelines,
                    pipelines_fbo,
                    ..
                },
                GraphicsDevice::Dx12(ctx),
            ) => {
                let slot = match kind {
                    PipelineKind::Main => &mut pipelines[index],
                    PipelineKind::Framebuffer => &mut pipelines_fbo[index],
                };
                if slot.is_some() {
                    return Ok(());
                }
                let (vs, fs) = match program.backing() {
                    ProgramBacking::Direct3D12 { vs, fs } => (*vs, *fs),
                    _ => {
                        return Err(DrawError::Binding(
                            "program was not built for Direct3D 12".to_string(),
                        )
                        .into())
                    }
                };
                let root = match root_signatures[index] {
                    Some(r) => r,
                    None => {
                        let r = ctx.create_root_signature();
                        root_signatures[index] = Some(r);
                        r
                    }
                };
                *slot = Some(ctx.create_pipeline_state(vs, fs, root)?);
                Ok(())
            }
            (
                BufferBacking::Vulkan {
                    pipeline_layout,
                    pipelines,
                    pipelines_fbo,
                    ..
                },
                GraphicsDevice::Vulkan(ctx),
            ) => {
                let slot = match kind {
                    PipelineKind::Main => &mut pipelines[index],
                    PipelineKind::Framebuffer => &mut pipelines_fbo[index],
                };
                if slot.is_some() {
                    return Ok(());
                }
                let (vs, fs) = match program.backing() {
                    ProgramBacking::Vulkan { vs, fs } => (*vs, *fs),
                    _ => {
                        return Err(DrawError::Binding(
                            "program was not built for Vulkan".to_string(),
                        )
                        .into())
                    }
                };
                *slot = Some(ctx.create_graphics_pipeline(vs, fs, *pipeline_layout)?);
                Ok(())
            }
            _ => Err(DrawError::Binding(
                "buffer backing does not match the active backend".to_string(),
            )
            .into()),
        }
    }

    /// 丢弃全部管线对象（交换链/帧缓冲格式变化后重建）
    pub fn invalidate_pipelines(&mut self, device: &mut GraphicsDevice) {
        match (&mut self.backing, device) {
            (
                BufferBacking::Dx12 {
                    pipelines,
                    pipelines_fbo,
                    ..
                },
                GraphicsDevice::Dx12(ctx),
            ) => {
                for slot in pipelines.iter_mut().chain(pipelines_fbo.iter_mut()) {
                    if let Some(pipeline) = slot.take() {
                        ctx.release_pipeline_state(pipeline);
                    }
                }
            }
            (
                BufferBacking::Vulkan {
                    pipelines,
                    pipelines_fbo,
                    ..
                },
                GraphicsDevice::Vulkan(ctx),
            ) => {
                for slot in pipelines.iter_mut().chain(pipelines_fbo.iter_mut()) {
                    if let Some(pipeline) = slot.take() {
                        ctx.destroy_pipeline(pipeline);
                    }
                }
            }
            _ => {}
        }
    }

    /// 按依赖逆序释放全部资源
    ///
    /// Vulkan 先等待设备空闲；Direct3D 12 依赖上下文的延迟回收队列，
    /// 在途帧存在时释放请求不会阻塞也不会过早销毁。
    pub fn destroy(&mut self, device: &mut GraphicsDevice) -> Result<()> {
        let backing = std::mem::replace(&mut self.backing, BufferBacking::None);
        match (backing, device) {
            (BufferBacking::None, _) => Ok(()),
            (
                BufferBacking::OpenGl {
                    vertex_buffer,
                    normal_buffer,
                    tex_coord_buffer,
                    index_buffer,
                },
                GraphicsDevice::OpenGl(ctx),
            ) => {
                ctx.delete_buffer(index_buffer);
                ctx.delete_buffer(tex_coord_buffer);
                ctx.delete_buffer(normal_buffer);
                ctx.delete_buffer(vertex_buffer);
                Ok(())
            }
            (
                BufferBacking::Dx11 {
                    vertex_buffer,
                    index_buffer,
                    constant_buffers,
                    input_layouts,
                    rasterizer_states,
                    blend_states,
                    depth_stencil_states,
                },
                GraphicsDevice::Dx11(ctx),
            ) => {
                for state in input_layouts
                    .into_iter()
                    .chain(rasterizer_states)
                    .chain(blend_states)
                    .chain(depth_stencil_states)
                    .flatten()
                {
                    ctx.release_state_object(state);
                }
                for buffer in constant_buffers.into_iter().flatten() {
                    ctx.release_buffer(buffer);
                }
                ctx.release_buffer(index_buffer);
                ctx.release_buffer(vertex_buffer);
                Ok(())
            }
            (
                BufferBacking::Dx12 {
                    vertex_buffer,
                    index_buffer,
                    constant_buffers,
                    root_signatures,
                    pipelines,
                    pipelines_fbo,
                },
                GraphicsDevice::Dx12(ctx),
            ) => {
                for pipeline in pipelines.into_iter().chain(pipelines_fbo).flatten() {
                    ctx.release_pipeline_state(pipeline);
                }
                for root in root_signatures.into_iter().flatten() {
                    ctx.release_root_signature(root);
                }
                for buffer in constant_buffers.into_iter().flatten() {
                    ctx.release_buffer(buffer);
                }
                ctx.release_buffer(index_buffer);
                ctx.release_buffer(vertex_buffer);
                Ok(())
            }
            (
                BufferBacking::Vulkan {
                    vertex_buffer,
                    index_buffer,
                    matrix_uniform,
                    payload_uniforms,
                    set_layout,
                    pipeline_layout,
                    pool,
                    pipelines,
                    pipelines_fbo,
                    ..
                },
                GraphicsDevice::Vulkan(ctx),
            ) => {
                ctx.device_wait_idle()?;
                for pipeline in pipelines.into_iter().chain(pipelines_fbo).flatten() {
                    ctx.destroy_pipeline(pipeline);
                }
                ctx.destroy_pipeline_layout(pipeline_layout);
                ctx.destroy_descriptor_pool(pool);
                ctx.destroy_descriptor_set_layout(set_layout);
                for (buffer, _) in payload_uniforms.into_iter().flatten() {
                    ctx.destroy_buffer(buffer);
                }
                ctx.destroy_buffer(matrix_uniform.0);
                ctx.destroy_buffer(index_buffer);
                ctx.destroy_buffer(vertex_buffer);
                Ok(())
            }
            _ => Err(DrawError::Binding(
                "buffer backing does not match the active backend".to_string(),
            )
            .into()),
        }
    }
}

impl Default for GpuBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// 索引 → 身份（与 `ShaderIdentity::index` 互逆）
fn identity_at(index: usize) -> ShaderIdentity {
    match index {
        0 => ShaderIdentity::Color,
        1 => ShaderIdentity::Default,
        2 => ShaderIdentity::Depth,
        3 => ShaderIdentity::Hud,
        4 => ShaderIdentity::Skybox,
        _ => ShaderIdentity::Wireframe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GraphicsApi;

    fn gl_device() -> GraphicsDevice {
        GraphicsDevice::new(GraphicsApi::OpenGl)
    }

    #[test]
    fn test_create_geometry_requires_data() {
        let mut device = gl_device();
        let empty = Mesh::new(crate::component::ComponentKind::Mesh);
        let mut buffer = GpuBuffer::new();
        assert!(buffer.create_geometry(&empty, &mut device).is_err());
        assert!(!buffer.is_resident());
    }

    #[test]
    fn test_gl_geometry_upload_and_destroy() {
        let mut device = gl_device();
        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();
        assert!(buffer.is_resident());
        assert_eq!(buffer.index_count(), 6);

        buffer.destroy(&mut device).unwrap();
        assert!(!buffer.is_resident());
    }

    #[test]
    fn test_reset_rebuilds_from_retained_geometry() {
        let mut device = gl_device();
        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();

        let old_vb = match &buffer.backing {
            BufferBacking::OpenGl { vertex_buffer, .. } => *vertex_buffer,
            _ => panic!("expected opengl backing"),
        };

        buffer.reset_dynamic_resources(&mut device).unwrap();
        assert!(buffer.is_resident());
        assert_eq!(buffer.index_count(), 6);
        match &buffer.backing {
            BufferBacking::OpenGl { vertex_buffer, .. } => assert_ne!(*vertex_buffer, old_vb),
            _ => panic!("expected opengl backing"),
        }
    }

    #[test]
    fn test_identity_index_round_trip() {
        for i in 0..NR_OF_SHADERS {
            assert_eq!(identity_at(i).index(), Some(i));
        }
    }

    #[test]
    fn test_dx11_states_are_per_identity() {
        let mut device = GraphicsDevice::new(GraphicsApi::Dx11);
        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();

        let mut program = ShaderProgram::new("default");
        program.load("vs", "fs", &mut device).unwrap();

        buffer
            .ensure_pipeline(ShaderIdentity::Default, PipelineKind::Main, &program, &mut device)
            .unwrap();
        let first = match &buffer.backing {
            BufferBacking::Dx11 { input_layouts, .. } => {
                input_layouts[ShaderIdentity::Default.index().unwrap()]
            }
            _ => panic!("expected dx11 backing"),
        };
        buffer
            .ensure_pipeline(ShaderIdentity::Hud, PipelineKind::Main, &program, &mut device)
            .unwrap();
        // 重复请求同一身份不得重建
        buffer
            .ensure_pipeline(ShaderIdentity::Default, PipelineKind::Main, &program, &mut device)
            .unwrap();

        match &buffer.backing {
            BufferBacking::Dx11 {
                input_layouts,
                rasterizer_states,
                blend_states,
                depth_stencil_states,
                ..
            } => {
                let d = ShaderIdentity::Default.index().unwrap();
                let h = ShaderIdentity::Hud.index().unwrap();
                assert_eq!(input_layouts[d], first);
                assert!(input_layouts[h].is_some());
                assert_ne!(input_layouts[d], input_layouts[h]);
                assert_ne!(rasterizer_states[d], rasterizer_states[h]);
                assert_ne!(blend_states[d], blend_states[h]);
                assert_ne!(depth_stencil_states[d], depth_stencil_states[h]);
                // 未请求过的身份没有任何状态对象
                let c = ShaderIdentity::Color.index().unwrap();
                assert!(input_layouts[c].is_none());

                let ctx = match &device {
                    GraphicsDevice::Dx11(ctx) => ctx,
                    _ => unreachable!(),
                };
                assert_eq!(
                    ctx.state_object_kind(input_layouts[d].unwrap()),
                    Some(StateKind::InputLayout)
                );
            }
            _ => panic!("expected dx11 backing"),
        }
    }

    #[test]
    fn test_vulkan_destroy_releases_everything() {
        let mut device = GraphicsDevice::new(GraphicsApi::Vulkan);
        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();

        let (vb, set) = match &buffer.backing {
            BufferBacking::Vulkan {
                vertex_buffer,
                descriptor_set,
                ..
            } => (*vertex_buffer, *descriptor_set),
            _ => panic!("expected vulkan backing"),
        };

        buffer.destroy(&mut device).unwrap();
        let ctx = match &device {
            GraphicsDevice::Vulkan(ctx) => ctx,
            _ => unreachable!(),
        };
        assert!(!ctx.buffer_exists(vb));
        assert!(ctx.descriptor_binding(set, 0).is_none());
    }

    #[test]
    fn test_dx12_destroy_defers_while_in_flight() {
        let mut device = GraphicsDevice::new(GraphicsApi::Dx12);
        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();

        let vb = match &buffer.backing {
            BufferBacking::Dx12 { vertex_buffer, .. } => *vertex_buffer,
            _ => panic!("expected dx12 backing"),
        };

        // 模拟在途帧：签发 fence 但不推进
        let value = match &mut device {
            GraphicsDevice::Dx12(ctx) => {
                ctx.record_draw_indexed(6).unwrap();
                ctx.execute_command_lists()
            }
            _ => unreachable!(),
        };

        buffer.destroy(&mut device).unwrap();
        let ctx = match &mut device {
            GraphicsDevice::Dx12(ctx) => ctx,
            _ => unreachable!(),
        };
        // 释放被延迟：缓冲仍存活，待 fence 越过后回收
        assert!(ctx.buffer_exists(vb));
        ctx.present(value);
        assert!(!ctx.buffer_exists(vb));
    }
}
