//! 着色器程序
//!
//! 程序按名字解析出稳定身份，经 编译 → 链接 → (验证) 的状态机加载；
//! `update_uniforms` 是绘制路径的核心：捕获快照、转码、写入原生
//! 常量缓冲并绑定纹理，四个后端各走自己的分支。
//!
//! # 纹理单元布局（所有后端一致）
//!
//! - `0 .. MAX_TEXTURES`: 网格纹理
//! - `MAX_TEXTURES .. MAX_TEXTURES + MAX_LIGHT_SOURCES`: 2D 深度贴图
//! - 其后 `MAX_LIGHT_SOURCES` 个: 立方体深度贴图
//!
//! 空槽位绑定占位纹理，从不绑空；2D 采样器拒绝立方体纹理
//! （反之亦然），维度不符时同样回退占位纹理。

use tracing::{debug, warn};

use crate::component::drawable::Drawable;
use crate::component::light::LightSource;
use crate::component::Camera;
use crate::core::error::{DrawError, Result, ShaderError};
use crate::core::{MAX_LIGHT_SOURCES, MAX_TEXTURES};
use crate::gfx::handle::{BufferHandle, ProgramHandle, ShaderModuleHandle, TextureHandle};
use crate::gfx::opengl::{GlContext, ShaderStage};
use crate::gfx::vulkan::{
    DescriptorWrite, BINDING_DEFAULT, BINDING_DEPTH_2D, BINDING_DEPTH_CUBE, BINDING_MATRIX,
    BINDING_TEXTURES,
};
use crate::gfx::{GraphicsDevice, TextureKind};

use super::adapter::{MatrixBlock, ValueAdapter};
use super::buffer::{BufferBacking, GpuBuffer};
use super::identity::ShaderIdentity;
use super::snapshot::{
    ColorSnapshot, DefaultSnapshot, DepthSnapshot, DrawProperties, HudSnapshot, MatrixSnapshot,
};

/// 顶点属性名
const ATTRIB_NAMES: [&str; 3] = ["VertexNormal", "VertexPosition", "VertexTextureCoords"];

/// 矩阵常量块名
const BLOCK_MATRIX: &str = "MatrixBuffer";

/// 身份对应的载荷常量块名
fn payload_block_name(identity: ShaderIdentity) -> Option<&'static str> {
    match identity {
        ShaderIdentity::Color | ShaderIdentity::Wireframe => Some("ColorBuffer"),
        ShaderIdentity::Default | ShaderIdentity::Skybox => Some("DefaultBuffer"),
        ShaderIdentity::Hud => Some("HUDBuffer"),
        ShaderIdentity::Depth => Some("DepthBuffer"),
        ShaderIdentity::Unknown => None,
    }
}

/// 程序状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Unloaded,
    Compiling,
    Ready,
    Failed,
}

/// OpenGL 程序的槽位表（加载时反射一次）
#[derive(Debug)]
pub(crate) struct GlSlots {
    pub attribs: [Option<u32>; 3],
    pub matrix_block: Option<u32>,
    pub payload_block: Option<u32>,
    pub texture_locations: [Option<u32>; MAX_TEXTURES],
    pub depth_2d_locations: [Option<u32>; MAX_LIGHT_SOURCES],
    pub depth_cube_locations: [Option<u32>; MAX_LIGHT_SOURCES],
}

/// 后端专属的程序资源
#[derive(Debug)]
pub(crate) enum ProgramBacking {
    None,
    OpenGl {
        program: ProgramHandle,
        matrix_uniform: BufferHandle,
        payload_uniform: Option<BufferHandle>,
        slots: GlSlots,
    },
    Direct3D11 {
        vs: ShaderModuleHandle,
        fs: ShaderModuleHandle,
    },
    Direct3D12 {
        vs: ShaderModuleHandle,
        fs: ShaderModuleHandle,
    },
    Vulkan {
        vs: ShaderModuleHandle,
        fs: ShaderModuleHandle,
    },
}

/// 帧级共享输入（相机、光源、占位纹理）
#[derive(Debug, Clone, Copy)]
pub struct FrameInputs<'a> {
    pub camera: &'a Camera,
    pub lights: &'a [Option<LightSource>; MAX_LIGHT_SOURCES],
    /// 2D 占位纹理（空槽位绑定它，从不绑空）
    pub empty_texture: TextureHandle,
    /// 立方体占位纹理
    pub empty_cubemap: TextureHandle,
    pub enable_srgb: bool,
}

/// 收集好的纹理绑定（所有槽位都已填充，占位纹理兜底）
struct TextureBindings {
    mesh: [(TextureHandle, TextureKind); MAX_TEXTURES],
    depth_2d: [(TextureHandle, TextureKind); MAX_LIGHT_SOURCES],
    depth_cube: [(TextureHandle, TextureKind); MAX_LIGHT_SOURCES],
}

/// 着色器程序
#[derive(Debug)]
pub struct ShaderProgram {
    name: String,
    identity: ShaderIdentity,
    state: ProgramState,
    backing: ProgramBacking,
}

impl ShaderProgram {
    /// 按程序名创建（身份由名字解析）
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            identity: ShaderIdentity::resolve(name),
            state: ProgramState::Unloaded,
            backing: ProgramBacking::None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn identity(&self) -> ShaderIdentity {
        self.identity
    }

    pub fn state(&self) -> ProgramState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ProgramState::Ready
    }

    pub(crate) fn backing(&self) -> &ProgramBacking {
        &self.backing
    }

    /// 编译并链接程序
    ///
    /// 失败时程序停留在 `Failed` 状态，绘制请求会被跳过；
    /// 资源重载时可重新调用。
    pub fn load(
        &mut self,
        vs_source: &str,
        fs_source: &str,
        device: &mut GraphicsDevice,
    ) -> Result<()> {
        if self.identity == ShaderIdentity::Unknown {
            self.state = ProgramState::Failed;
            return Err(
                ShaderError::Validation(format!("unknown program name '{}'", self.name)).into(),
            );
        }

        self.state = ProgramState::Compiling;
        let result = self.load_inner(vs_source, fs_source, device);
        match &result {
            Ok(()) => {
                self.state = ProgramState::Ready;
                debug!(program = %self.name, "program linked");
            }
            Err(e) => {
                self.state = ProgramState::Failed;
                warn!(program = %self.name, error = %e, "program build failed");
            }
        }
        result
    }

    fn load_inner(
        &mut self,
        vs_source: &str,
        fs_source: &str,
        device: &mut GraphicsDevice,
    ) -> Result<()> {
        self.backing = match device {
            GraphicsDevice::OpenGl(ctx) => self.load_gl(vs_source, fs_source, ctx)?,
            GraphicsDevice::Dx11(ctx) => {
                let vs = ctx.compile_shader(ShaderStage::Vertex, vs_source)?;
                let fs = ctx.compile_shader(ShaderStage::Fragment, fs_source)?;
                ProgramBacking::Direct3D11 { vs, fs }
            }
            GraphicsDevice::Dx12(ctx) => {
                let vs = ctx.compile_shader(ShaderStage::Vertex, vs_source)?;
                let fs = ctx.compile_shader(ShaderStage::Fragment, fs_source)?;
                ProgramBacking::Direct3D12 { vs, fs }
            }
            GraphicsDevice::Vulkan(ctx) => {
                let vs = ctx.create_shader_module(vs_source)?;
                let fs = ctx.create_shader_module(fs_source)?;
                ProgramBacking::Vulkan { vs, fs }
            }
        };
        Ok(())
    }

    /// OpenGL 路径：链接、验证、反射槽位、建 UBO、预设 sampler 单元
    fn load_gl(
        &self,
        vs_source: &str,
        fs_source: &str,
        ctx: &mut GlContext,
    ) -> Result<ProgramBacking> {
        let vs = ctx.compile_shader(ShaderStage::Vertex, vs_source)?;
        let fs = ctx.compile_shader(ShaderStage::Fragment, fs_source)?;
        let program = ctx.link_program(&[vs, fs])?;
        ctx.validate_program(program)?;
        // 链接后阶段对象不再需要
        ctx.delete_shader(vs);
        ctx.delete_shader(fs);

        let mut attribs = [None; 3];
        for (i, name) in ATTRIB_NAMES.iter().enumerate() {
            attribs[i] = ctx.attrib_location(program, name);
        }

        let matrix_block = ctx.uniform_block_index(program, BLOCK_MATRIX);
        let payload_block = payload_block_name(self.identity)
            .and_then(|name| ctx.uniform_block_index(program, name));

        // 常量块绑定点：0 = 矩阵，1 = 载荷
        let matrix_uniform = ctx.gen_buffer();
        ctx.buffer_data(
            matrix_uniform,
            &vec![0u8; std::mem::size_of::<MatrixBlock>()],
        );
        if let Some(index) = matrix_block {
            ctx.uniform_block_binding(program, index, 0);
        }

        let payload_uniform = match payload_block {
            Some(index) => {
                let size = super::buffer::constant_payload_size(self.identity)
                    .unwrap_or(std::mem::size_of::<MatrixBlock>());
                let ubo = ctx.gen_buffer();
                ctx.buffer_data(ubo, &vec![0u8; size]);
                ctx.uniform_block_binding(program, index, 1);
                Some(ubo)
            }
            None => None,
        };

        // sampler 单元一次性赋值，之后只换纹理
        let mut texture_locations = [None; MAX_TEXTURES];
        let mut depth_2d_locations = [None; MAX_LIGHT_SOURCES];
        let mut depth_cube_locations = [None; MAX_LIGHT_SOURCES];
        for i in 0..MAX_TEXTURES {
            texture_locations[i] = ctx.uniform_location(program, &format!("Textures[{}]", i));
            if let Some(loc) = texture_locations[i] {
                ctx.set_sampler_unit(program, loc, i as u32);
            }
        }
        for i in 0..MAX_LIGHT_SOURCES {
            depth_2d_locations[i] =
                ctx.uniform_location(program, &format!("DepthMapTextures2D[{}]", i));
            if let Some(loc) = depth_2d_locations[i] {
                ctx.set_sampler_unit(program, loc, (MAX_TEXTURES + i) as u32);
            }
            depth_cube_locations[i] =
                ctx.uniform_location(program, &format!("DepthMapTexturesCube[{}]", i));
            if let Some(loc) = depth_cube_locations[i] {
                ctx.set_sampler_unit(program, loc, (MAX_TEXTURES + MAX_LIGHT_SOURCES + i) as u32);
            }
        }

        Ok(ProgramBacking::OpenGl {
            program,
            matrix_uniform,
            payload_uniform,
            slots: GlSlots {
                attribs,
                matrix_block,
                payload_block,
                texture_locations,
                depth_2d_locations,
                depth_cube_locations,
            },
        })
    }

    /// 释放程序持有的全部原生资源
    ///
    /// OpenGL 删除程序对象与程序自有的 UBO；Direct3D 12 的 blob 在途
    /// 时走上下文的延迟回收队列；Vulkan 先等待设备空闲。释放后程序
    /// 回到 `Unloaded`，可重新 `load`。
    pub fn destroy(&mut self, device: &mut GraphicsDevice) -> Result<()> {
        let backing = std::mem::replace(&mut self.backing, ProgramBacking::None);
        self.state = ProgramState::Unloaded;
        match (backing, device) {
            (ProgramBacking::None, _) => Ok(()),
            (
                ProgramBacking::OpenGl {
                    program,
                    matrix_uniform,
                    payload_uniform,
                    ..
                },
                GraphicsDevice::OpenGl(ctx),
            ) => {
                if let Some(ubo) = payload_uniform {
                    ctx.delete_buffer(ubo);
                }
                ctx.delete_buffer(matrix_uniform);
                ctx.delete_program(program);
                Ok(())
            }
            (ProgramBacking::Direct3D11 { vs, fs }, GraphicsDevice::Dx11(ctx)) => {
                ctx.release_shader(fs);
                ctx.release_shader(vs);
                Ok(())
            }
            (ProgramBacking::Direct3D12 { vs, fs }, GraphicsDevice::Dx12(ctx)) => {
                ctx.release_shader(fs);
                ctx.release_shader(vs);
                Ok(())
            }
            (ProgramBacking::Vulkan { vs, fs }, GraphicsDevice::Vulkan(ctx)) => {
                ctx.device_wait_idle()?;
                ctx.destroy_shader_module(fs);
                ctx.destroy_shader_module(vs);
                Ok(())
            }
            _ => Err(DrawError::Binding(
                "program backing does not match the active backend".to_string(),
            )
            .into()),
        }
    }

    /// 捕获快照、转码并写入原生常量缓冲，随后绑定纹理
    ///
    /// 任何原生写入发生之前完成全部校验：程序就绪、几何常驻、
    /// 深度 pass 的光源存在。
    pub fn update_uniforms(
        &self,
        drawable: &dyn Drawable,
        buffer: &mut GpuBuffer,
        props: &DrawProperties,
        frame: &FrameInputs<'_>,
        device: &mut GraphicsDevice,
    ) -> Result<()> {
        if self.identity == ShaderIdentity::Unknown {
            debug_assert!(false, "draw requested with unresolved program '{}'", self.name);
            return Ok(());
        }
        if !self.is_ready() {
            return Err(DrawError::Skipped(format!(
                "program '{}' is not ready",
                self.name
            ))
            .into());
        }
        if !buffer.is_resident() {
            return Err(DrawError::Binding("geometry is not resident".to_string()).into());
        }

        let api = device.api();
        let adapter = ValueAdapter::for_api(api);
        let model = drawable.matrix();

        // 深度 pass 的光源解析先于一切写入
        let depth_light = if self.identity.is_depth() {
            let index = props.light.ok_or_else(|| {
                DrawError::Binding("depth pass requires a light index".to_string())
            })?;
            let light = frame
                .lights
                .get(index)
                .and_then(|slot| slot.as_ref())
                .ok_or_else(|| {
                    DrawError::Binding(format!("no light source at index {}", index))
                })?;
            Some(light)
        } else {
            None
        };

        let matrices = match depth_light {
            Some(light) => MatrixSnapshot::for_depth(light, &model, api),
            None => MatrixSnapshot::for_scene(
                frame.camera,
                &model,
                self.identity == ShaderIdentity::Skybox,
            ),
        };
        let matrix_block = adapter.encode_matrices(&matrices);
        let matrix_bytes = bytemuck::bytes_of(&matrix_block);

        let payload_bytes = self.encode_payload(drawable, props, frame, depth_light, &adapter);
        let bindings = collect_texture_bindings(self.identity, drawable, frame);

        match (&self.backing, device) {
            (
                ProgramBacking::OpenGl {
                    matrix_uniform,
                    payload_uniform,
                    slots,
                    ..
                },
                GraphicsDevice::OpenGl(ctx),
            ) => {
                let attrib_sources = match &buffer.backing {
                    BufferBacking::OpenGl {
                        vertex_buffer,
                        normal_buffer,
                        tex_coord_buffer,
                        ..
                    } => [*normal_buffer, *vertex_buffer, *tex_coord_buffer],
                    _ => {
                        return Err(DrawError::Binding(
                            "buffer backing does not match the active backend".to_string(),
                        )
                        .into())
                    }
                };
                // 属性槽位与 ATTRIB_NAMES 同序
                for (slot, source) in slots.attribs.iter().zip(attrib_sources) {
                    if let Some(location) = slot {
                        ctx.bind_attrib_buffer(*location, source);
                    }
                }
                if slots.matrix_block.is_some() {
                    ctx.buffer_data(*matrix_uniform, matrix_bytes);
                    ctx.bind_buffer_base(0, *matrix_uniform);
                }
                if let (Some(_), Some(ubo)) = (slots.payload_block, payload_uniform) {
                    ctx.buffer_data(*ubo, &payload_bytes);
                    ctx.bind_buffer_base(1, *ubo);
                }
                if self.identity.samples_mesh_textures() {
                    for (i, (texture, kind)) in bindings.mesh.iter().enumerate() {
                        if slots.texture_locations[i].is_some() {
                            ctx.bind_texture(i, *texture, *kind);
                        }
                    }
                }
                if self.identity.samples_depth_maps() {
                    for (i, (texture, kind)) in bindings.depth_2d.iter().enumerate() {
                        if slots.depth_2d_locations[i].is_some() {
                            ctx.bind_texture(MAX_TEXTURES + i, *texture, *kind);
                        }
                    }
                    for (i, (texture, kind)) in bindings.depth_cube.iter().enumerate() {
                        if slots.depth_cube_locations[i].is_some() {
                            ctx.bind_texture(
                                MAX_TEXTURES + MAX_LIGHT_SOURCES + i,
                                *texture,
                                *kind,
                            );
                        }
                    }
                }
                Ok(())
            }
            (ProgramBacking::Direct3D11 { vs, fs }, GraphicsDevice::Dx11(ctx)) => {
                ctx.set_shaders(*vs, *fs);
                let cb = match &buffer.backing {
                    BufferBacking::Dx11 {
                        constant_buffers, ..
                    } => constant_buffers[self.index()].ok_or_else(|| {
                        DrawError::Binding("missing native constant buffer".to_string())
                    })?,
                    _ => {
                        return Err(DrawError::Binding(
                            "buffer backing does not match the active backend".to_string(),
                        )
                        .into())
                    }
                };
                // 矩阵块嵌在载荷块前部，共用一个常量缓冲
                let mut combined = Vec::with_capacity(matrix_bytes.len() + payload_bytes.len());
                combined.extend_from_slice(matrix_bytes);
                combined.extend_from_slice(&payload_bytes);
                ctx.map_write_discard(cb, &combined)?;
                ctx.set_constant_buffer(0, cb);
                self.bind_texture_slots_dx11(ctx, &bindings);
                Ok(())
            }
            (ProgramBacking::Direct3D12 { .. }, GraphicsDevice::Dx12(ctx)) => {
                let cb = match &buffer.backing {
                    BufferBacking::Dx12 {
                        constant_buffers, ..
                    } => constant_buffers[self.index()].ok_or_else(|| {
                        DrawError::Binding("missing native constant buffer".to_string())
                    })?,
                    _ => {
                        return Err(DrawError::Binding(
                            "buffer backing does not match the active backend".to_string(),
                        )
                        .into())
                    }
                };
                let mut combined = Vec::with_capacity(matrix_bytes.len() + payload_bytes.len());
                combined.extend_from_slice(matrix_bytes);
                combined.extend_from_slice(&payload_bytes);
                ctx.map_copy_unmap(cb, &combined)?;
                ctx.set_root_constant_buffer(0, cb);
                if self.identity.samples_mesh_textures() {
                    for (i, (texture, kind)) in bindings.mesh.iter().enumerate() {
                        ctx.set_descriptor_table_texture(i, *texture, *kind);
                    }
                }
                if self.identity.samples_depth_maps() {
                    for (i, (texture, kind)) in bindings.depth_2d.iter().enumerate() {
                        ctx.set_descriptor_table_texture(MAX_TEXTURES + i, *texture, *kind);
                    }
                    for (i, (texture, kind)) in bindings.depth_cube.iter().enumerate() {
                        ctx.set_descriptor_table_texture(
                            MAX_TEXTURES + MAX_LIGHT_SOURCES + i,
                            *texture,
                            *kind,
                        );
                    }
                }
                Ok(())
            }
            (ProgramBacking::Vulkan { .. }, GraphicsDevice::Vulkan(ctx)) => {
                let (matrix_uniform, payload_uniform, set) = match &buffer.backing {
                    BufferBacking::Vulkan {
                        matrix_uniform,
                        payload_uniforms,
                        descriptor_set,
                        ..
                    } => {
                        let payload = payload_uniforms[self.index()].ok_or_else(|| {
                            DrawError::Binding("missing native uniform buffer".to_string())
                        })?;
                        (*matrix_uniform, payload, *descriptor_set)
                    }
                    _ => {
                        return Err(DrawError::Binding(
                            "buffer backing does not match the active backend".to_string(),
                        )
                        .into())
                    }
                };

                ctx.update_memory(matrix_uniform.1, matrix_bytes)?;
                ctx.update_memory(payload_uniform.1, &payload_bytes)?;

                let mut writes = vec![
                    DescriptorWrite::UniformBuffer {
                        set,
                        binding: BINDING_MATRIX,
                        buffer: matrix_uniform.0,
                    },
                    DescriptorWrite::UniformBuffer {
                        set,
                        binding: BINDING_DEFAULT,
                        buffer: payload_uniform.0,
                    },
                ];
                if self.identity.samples_mesh_textures() {
                    writes.push(DescriptorWrite::CombinedImageSamplers {
                        set,
                        binding: BINDING_TEXTURES,
                        images: bindings.mesh.to_vec(),
                    });
                }
                if self.identity.samples_depth_maps() {
                    writes.push(DescriptorWrite::CombinedImageSamplers {
                        set,
                        binding: BINDING_DEPTH_2D,
                        images: bindings.depth_2d.to_vec(),
                    });
                    writes.push(DescriptorWrite::CombinedImageSamplers {
                        set,
                        binding: BINDING_DEPTH_CUBE,
                        images: bindings.depth_cube.to_vec(),
                    });
                }
                ctx.update_descriptor_sets(&writes)
            }
            _ => Err(DrawError::Binding(
                "program backing does not match the active backend".to_string(),
            )
            .into()),
        }
    }

    /// 身份的数组索引（Unknown 已在调用方拦截）
    fn index(&self) -> usize {
        self.identity.index().unwrap_or(0)
    }

    /// 身份对应的载荷块编码
    fn encode_payload(
        &self,
        drawable: &dyn Drawable,
        props: &DrawProperties,
        frame: &FrameInputs<'_>,
        depth_light: Option<&LightSource>,
        adapter: &ValueAdapter,
    ) -> Vec<u8> {
        match self.identity {
            ShaderIdentity::Color | ShaderIdentity::Wireframe => {
                let block = adapter.encode_color(&ColorSnapshot::capture(drawable));
                bytemuck::bytes_of(&block).to_vec()
            }
            ShaderIdentity::Default | ShaderIdentity::Skybox => {
                let snap = DefaultSnapshot::capture(
                    drawable,
                    props,
                    frame.lights,
                    frame.camera.position,
                    frame.enable_srgb,
                );
                let block = adapter.encode_default(&snap);
                bytemuck::bytes_of(&block).to_vec()
            }
            ShaderIdentity::Hud => {
                let block = adapter.encode_hud(&HudSnapshot::capture(drawable));
                bytemuck::bytes_of(&block).to_vec()
            }
            ShaderIdentity::Depth => match depth_light {
                Some(light) => {
                    let block = adapter.encode_depth(&DepthSnapshot::capture(light, props));
                    bytemuck::bytes_of(&block).to_vec()
                }
                None => Vec::new(),
            },
            ShaderIdentity::Unknown => Vec::new(),
        }
    }

    fn bind_texture_slots_dx11(
        &self,
        ctx: &mut crate::gfx::dx11::Dx11Context,
        bindings: &TextureBindings,
    ) {
        if self.identity.samples_mesh_textures() {
            for (i, (texture, kind)) in bindings.mesh.iter().enumerate() {
                ctx.set_shader_resource(i, *texture, *kind);
            }
        }
        if self.identity.samples_depth_maps() {
            for (i, (texture, kind)) in bindings.depth_2d.iter().enumerate() {
                ctx.set_shader_resource(MAX_TEXTURES + i, *texture, *kind);
            }
            for (i, (texture, kind)) in bindings.depth_cube.iter().enumerate() {
                ctx.set_shader_resource(MAX_TEXTURES + MAX_LIGHT_SOURCES + i, *texture, *kind);
            }
        }
    }
}

/// 收集全部纹理槽位的绑定，占位纹理兜底
fn collect_texture_bindings(
    identity: ShaderIdentity,
    drawable: &dyn Drawable,
    frame: &FrameInputs<'_>,
) -> TextureBindings {
    // 网格槽位的期望维度：天空盒是立方体采样器，其余是 2D
    let wants_cube = identity == ShaderIdentity::Skybox;
    let placeholder = if wants_cube {
        (frame.empty_cubemap, TextureKind::Cube)
    } else {
        (frame.empty_texture, TextureKind::TwoDim)
    };

    let slots = drawable.texture_slots();
    let mut mesh = [placeholder; MAX_TEXTURES];
    for i in 0..MAX_TEXTURES {
        if let Some(texture) = slots[i].texture {
            // 维度不符的纹理回退占位，避免采样器/纹理类型错配
            if slots[i].kind.is_cube() == wants_cube {
                mesh[i] = (texture, slots[i].kind);
            }
        }
    }

    let mut depth_2d = [(frame.empty_texture, TextureKind::TwoDim); MAX_LIGHT_SOURCES];
    let mut depth_cube = [(frame.empty_cubemap, TextureKind::Cube); MAX_LIGHT_SOURCES];
    for i in 0..MAX_LIGHT_SOURCES {
        if let Some(light) = frame.lights[i].as_ref() {
            if let Some(target) = light.depth_map {
                if target.kind.is_cube() {
                    depth_cube[i] = (target.texture, target.kind);
                } else {
                    depth_2d[i] = (target.texture, target.kind);
                }
            }
        }
    }

    TextureBindings {
        mesh,
        depth_2d,
        depth_cube,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::light::Attenuation;
    use crate::component::{Material, Mesh};
    use crate::core::math::Vector3;
    use crate::core::GraphicsApi;
    use crate::gfx::vulkan::RecordedBinding;

    const VS: &str = "in vec3 VertexPosition; in vec3 VertexNormal; in vec2 VertexTextureCoords; \
                      uniform MatrixBuffer { mat4 MVP; };";
    const FS_DEFAULT: &str = "uniform DefaultBuffer { vec4 x; }; \
                              uniform sampler2D Textures[6]; \
                              uniform sampler2DArray DepthMapTextures2D[13]; \
                              uniform samplerCubeArray DepthMapTexturesCube[13];";

    fn frame_inputs<'a>(
        camera: &'a Camera,
        lights: &'a [Option<LightSource>; MAX_LIGHT_SOURCES],
        device: &mut GraphicsDevice,
    ) -> FrameInputs<'a> {
        FrameInputs {
            camera,
            lights,
            empty_texture: device.create_texture(TextureKind::TwoDim),
            empty_cubemap: device.create_texture(TextureKind::Cube),
            enable_srgb: true,
        }
    }

    #[test]
    fn test_unknown_name_fails_load() {
        let mut device = GraphicsDevice::new(GraphicsApi::OpenGl);
        let mut program = ShaderProgram::new("bloom");
        assert!(program.load(VS, FS_DEFAULT, &mut device).is_err());
        assert_eq!(program.state(), ProgramState::Failed);
    }

    #[test]
    fn test_load_state_machine() {
        let mut device = GraphicsDevice::new(GraphicsApi::OpenGl);
        let mut program = ShaderProgram::new("default");
        assert_eq!(program.state(), ProgramState::Unloaded);

        assert!(program.load("", FS_DEFAULT, &mut device).is_err());
        assert_eq!(program.state(), ProgramState::Failed);

        program.load(VS, FS_DEFAULT, &mut device).unwrap();
        assert!(program.is_ready());
    }

    #[test]
    fn test_update_without_geometry_is_binding_error() {
        let mut device = GraphicsDevice::new(GraphicsApi::Vulkan);
        let mut program = ShaderProgram::new("default");
        program.load(VS, FS_DEFAULT, &mut device).unwrap();

        let camera = Camera::default();
        let lights: [Option<LightSource>; MAX_LIGHT_SOURCES] = Default::default();
        let frame = frame_inputs(&camera, &lights, &mut device);

        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        let err = program
            .update_uniforms(
                &mesh,
                &mut buffer,
                &DrawProperties::default(),
                &frame,
                &mut device,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            crate::core::PolyRenderError::Draw(DrawError::Binding(_))
        ));
    }

    #[test]
    fn test_depth_pass_requires_light() {
        let mut device = GraphicsDevice::new(GraphicsApi::OpenGl);
        let mut program = ShaderProgram::new("depth");
        program
            .load(VS, "uniform DepthBuffer { vec4 p; };", &mut device)
            .unwrap();

        let camera = Camera::default();
        let lights: [Option<LightSource>; MAX_LIGHT_SOURCES] = Default::default();
        let frame = frame_inputs(&camera, &lights, &mut device);

        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();

        let err = program
            .update_uniforms(
                &mesh,
                &mut buffer,
                &DrawProperties::default(),
                &frame,
                &mut device,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            crate::core::PolyRenderError::Draw(DrawError::Binding(_))
        ));
    }

    #[test]
    fn test_default_identity_binds_all_slots_vk() {
        let mut device = GraphicsDevice::new(GraphicsApi::Vulkan);
        let mut program = ShaderProgram::new("default");
        program.load(VS, FS_DEFAULT, &mut device).unwrap();

        let camera = Camera::default();
        let mut lights: [Option<LightSource>; MAX_LIGHT_SOURCES] = Default::default();
        let mut point = LightSource::point(
            Vector3::new(0.0, 4.0, 0.0),
            Material::default(),
            Attenuation::default(),
        );
        let cube_map = device.create_texture(TextureKind::CubeArray);
        point.attach_depth_map(cube_map);
        lights[0] = Some(point);
        let frame = frame_inputs(&camera, &lights, &mut device);

        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();
        program
            .update_uniforms(
                &mesh,
                &mut buffer,
                &DrawProperties::default(),
                &frame,
                &mut device,
            )
            .unwrap();

        let set = match &buffer.backing {
            BufferBacking::Vulkan { descriptor_set, .. } => *descriptor_set,
            _ => panic!("expected vulkan backing"),
        };
        let ctx = match &device {
            GraphicsDevice::Vulkan(ctx) => ctx,
            _ => unreachable!(),
        };

        // 网格槽位：全部占位纹理，无空绑定
        match ctx.descriptor_binding(set, BINDING_TEXTURES) {
            Some(RecordedBinding::CombinedImageSamplers(images)) => {
                assert_eq!(images.len(), MAX_TEXTURES);
                assert!(images.iter().all(|(t, _)| t.is_valid()));
            }
            other => panic!("unexpected binding {:?}", other),
        }
        // 立方体深度槽位：槽 0 是光源的贴图，其余占位
        match ctx.descriptor_binding(set, BINDING_DEPTH_CUBE) {
            Some(RecordedBinding::CombinedImageSamplers(images)) => {
                assert_eq!(images.len(), MAX_LIGHT_SOURCES);
                assert_eq!(images[0].0, cube_map);
                assert!(images.iter().all(|(t, _)| t.is_valid()));
            }
            other => panic!("unexpected binding {:?}", other),
        }
        match ctx.descriptor_binding(set, BINDING_DEPTH_2D) {
            Some(RecordedBinding::CombinedImageSamplers(images)) => {
                assert_eq!(images.len(), MAX_LIGHT_SOURCES);
                assert!(images.iter().all(|(t, _)| t.is_valid()));
            }
            other => panic!("unexpected binding {:?}", other),
        }
    }

    #[test]
    fn test_gl_update_binds_vertex_attribs() {
        let mut device = GraphicsDevice::new(GraphicsApi::OpenGl);
        let mut program = ShaderProgram::new("default");
        program.load(VS, FS_DEFAULT, &mut device).unwrap();

        let camera = Camera::default();
        let lights: [Option<LightSource>; MAX_LIGHT_SOURCES] = Default::default();
        let frame = frame_inputs(&camera, &lights, &mut device);

        let mesh = Mesh::quad();
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();
        program
            .update_uniforms(
                &mesh,
                &mut buffer,
                &DrawProperties::default(),
                &frame,
                &mut device,
            )
            .unwrap();

        let (position_loc, normal_loc) = match program.backing() {
            ProgramBacking::OpenGl { slots, .. } => {
                (slots.attribs[1].unwrap(), slots.attribs[0].unwrap())
            }
            _ => panic!("expected opengl backing"),
        };
        let (vb, nb) = match &buffer.backing {
            BufferBacking::OpenGl {
                vertex_buffer,
                normal_buffer,
                ..
            } => (*vertex_buffer, *normal_buffer),
            _ => panic!("expected opengl backing"),
        };
        let ctx = match &device {
            GraphicsDevice::OpenGl(ctx) => ctx,
            _ => unreachable!(),
        };
        assert_eq!(ctx.bound_attrib_buffer(position_loc), Some(vb));
        assert_eq!(ctx.bound_attrib_buffer(normal_loc), Some(nb));
    }

    #[test]
    fn test_gl_destroy_releases_program_and_uniforms() {
        let mut device = GraphicsDevice::new(GraphicsApi::OpenGl);
        let mut program = ShaderProgram::new("default");
        program.load(VS, FS_DEFAULT, &mut device).unwrap();

        let (handle, matrix_ubo, payload_ubo) = match program.backing() {
            ProgramBacking::OpenGl {
                program,
                matrix_uniform,
                payload_uniform,
                ..
            } => (*program, *matrix_uniform, payload_uniform.unwrap()),
            _ => panic!("expected opengl backing"),
        };

        program.destroy(&mut device).unwrap();
        assert_eq!(program.state(), ProgramState::Unloaded);

        let ctx = match &device {
            GraphicsDevice::OpenGl(ctx) => ctx,
            _ => unreachable!(),
        };
        assert!(ctx.validate_program(handle).is_err());
        assert!(!ctx.buffer_exists(matrix_ubo));
        assert!(!ctx.buffer_exists(payload_ubo));

        // 释放后可重新加载
        program.load(VS, FS_DEFAULT, &mut device).unwrap();
        assert!(program.is_ready());
    }

    #[test]
    fn test_dx12_destroy_defers_blob_release() {
        let mut device = GraphicsDevice::new(GraphicsApi::Dx12);
        let mut program = ShaderProgram::new("default");
        program.load(VS, FS_DEFAULT, &mut device).unwrap();

        let (vs, fs) = match program.backing() {
            ProgramBacking::Direct3D12 { vs, fs } => (*vs, *fs),
            _ => panic!("expected dx12 backing"),
        };

        // 在途帧存在时 blob 进延迟回收队列
        let value = match &mut device {
            GraphicsDevice::Dx12(ctx) => ctx.execute_command_lists(),
            _ => unreachable!(),
        };
        program.destroy(&mut device).unwrap();

        let ctx = match &mut device {
            GraphicsDevice::Dx12(ctx) => ctx,
            _ => unreachable!(),
        };
        assert!(ctx.shader_exists(vs));
        assert!(ctx.shader_exists(fs));
        ctx.present(value);
        assert!(!ctx.shader_exists(vs));
        assert!(!ctx.shader_exists(fs));
    }

    #[test]
    fn test_vulkan_destroy_releases_modules() {
        let mut device = GraphicsDevice::new(GraphicsApi::Vulkan);
        let mut program = ShaderProgram::new("default");
        program.load(VS, FS_DEFAULT, &mut device).unwrap();

        let (vs, fs) = match program.backing() {
            ProgramBacking::Vulkan { vs, fs } => (*vs, *fs),
            _ => panic!("expected vulkan backing"),
        };
        program.destroy(&mut device).unwrap();

        let ctx = match &device {
            GraphicsDevice::Vulkan(ctx) => ctx,
            _ => unreachable!(),
        };
        assert!(!ctx.shader_module_exists(vs));
        assert!(!ctx.shader_module_exists(fs));
    }

    #[test]
    fn test_cube_texture_rejected_on_2d_sampler() {
        let mut device = GraphicsDevice::new(GraphicsApi::OpenGl);
        let camera = Camera::default();
        let lights: [Option<LightSource>; MAX_LIGHT_SOURCES] = Default::default();
        let frame = frame_inputs(&camera, &lights, &mut device);

        let mut mesh = Mesh::quad();
        let cube = TextureHandle(777);
        mesh.texture_slots[0].texture = Some(cube);
        mesh.texture_slots[0].kind = TextureKind::Cube;

        let bindings = collect_texture_bindings(ShaderIdentity::Default, &mesh, &frame);
        // 立方体纹理不进 2D 采样器：回退占位
        assert_eq!(bindings.mesh[0].0, frame.empty_texture);

        let skybox = collect_texture_bindings(ShaderIdentity::Skybox, &mesh, &frame);
        // 天空盒要立方体：命中
        assert_eq!(skybox.mesh[0].0, cube);
    }

    #[test]
    fn test_dx11_combined_buffer_write() {
        let mut device = GraphicsDevice::new(GraphicsApi::Dx11);
        let mut program = ShaderProgram::new("hud");
        program.load(VS, "hud fs", &mut device).unwrap();

        let camera = Camera::default();
        let lights: [Option<LightSource>; MAX_LIGHT_SOURCES] = Default::default();
        let frame = frame_inputs(&camera, &lights, &mut device);

        let mut mesh = Mesh::quad();
        mesh.hud = Some(crate::component::HudTraits { transparent: true });
        let mut buffer = GpuBuffer::new();
        buffer.create_geometry(&mesh, &mut device).unwrap();

        program
            .update_uniforms(
                &mesh,
                &mut buffer,
                &DrawProperties::default(),
                &frame,
                &mut device,
            )
            .unwrap();

        let cb = match &buffer.backing {
            BufferBacking::Dx11 {
                constant_buffers, ..
            } => constant_buffers[ShaderIdentity::Hud.index().unwrap()].unwrap(),
            _ => panic!("expected dx11 backing"),
        };
        let ctx = match &device {
            GraphicsDevice::Dx11(ctx) => ctx,
            _ => unreachable!(),
        };
        let bytes = ctx.buffer_bytes(cb).unwrap();
        // 载荷紧跟矩阵块：HUD 的 transparent 通道在矩阵块之后
        let offset = std::mem::size_of::<MatrixBlock>();
        let lane: [u8; 4] = bytes[offset..offset + 4].try_into().unwrap();
        assert_eq!(f32::from_ne_bytes(lane), 1.0);

        // 绘制前当前着色器对就是程序自己的 VS/PS
        let pair = match program.backing() {
            ProgramBacking::Direct3D11 { vs, fs } => (*vs, *fs),
            _ => panic!("expected dx11 backing"),
        };
        assert_eq!(ctx.bound_shaders(), Some(pair));
    }
}
