//! OpenGL 后端上下文
//!
//! 立即模式后端：没有命令列表与 fence，上传即生效，驱动隐式同步。
//! 资源以句柄注册表的形式管理，缓冲保留 CPU 侧字节副本，
//! 程序反射通过扫描着色器源码实现槽位解析。
//!
//! # 槽位解析
//!
//! 属性与 uniform 槽位按"首次查询时分配"的方式给出稳定编号；
//! 源码中不存在的名字返回 `None`，调用方静默跳过该槽位。

use std::collections::HashMap;

use tracing::debug;

use crate::core::error::{Result, ShaderError};
use crate::core::MAX_TEXTURE_SLOTS;

use super::handle::{
    BufferHandle, HandleAllocator, ProgramHandle, ShaderModuleHandle, TextureHandle,
};
use super::TextureKind;

/// 着色阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

#[derive(Debug)]
struct GlBuffer {
    data: Vec<u8>,
}

#[derive(Debug)]
struct GlShader {
    stage: ShaderStage,
    source: String,
}

#[derive(Debug)]
struct GlProgram {
    /// 各阶段源码拼接，供槽位反射扫描
    combined_source: String,
    /// 名称 → 已分配的槽位编号
    attrib_locations: HashMap<String, u32>,
    uniform_locations: HashMap<String, u32>,
    block_indices: HashMap<String, u32>,
    /// uniform block index → 绑定点
    block_bindings: HashMap<u32, u32>,
    /// sampler location → 纹理单元
    sampler_units: HashMap<u32, u32>,
}

/// OpenGL 设备上下文
#[derive(Debug, Default)]
pub struct GlContext {
    ids: HandleAllocator,
    buffers: HashMap<BufferHandle, GlBuffer>,
    shaders: HashMap<ShaderModuleHandle, GlShader>,
    programs: HashMap<ProgramHandle, GlProgram>,
    textures: HashMap<TextureHandle, TextureKind>,
    /// 纹理单元的当前绑定
    pub bound_texture_units: [Option<(TextureHandle, TextureKind)>; MAX_TEXTURE_SLOTS],
    /// uniform 绑定点的当前缓冲
    bound_uniform_buffers: HashMap<u32, BufferHandle>,
    /// 顶点属性槽位的当前缓冲
    attrib_buffer_bindings: HashMap<u32, BufferHandle>,
    draw_calls: u64,
}

impl GlContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // 缓冲
    // ------------------------------------------------------------------

    /// 生成缓冲对象（尚未分配存储）
    pub fn gen_buffer(&mut self) -> BufferHandle {
        let handle = BufferHandle(self.ids.allocate());
        self.buffers.insert(handle, GlBuffer { data: Vec::new() });
        handle
    }

    /// 上传缓冲数据（glBufferData：重新分配存储并写入）
    pub fn buffer_data(&mut self, buffer: BufferHandle, data: &[u8]) -> bool {
        match self.buffers.get_mut(&buffer) {
            Some(buf) => {
                buf.data = data.to_vec();
                true
            }
            None => false,
        }
    }

    /// 更新缓冲的一段（glBufferSubData）
    pub fn buffer_sub_data(&mut self, buffer: BufferHandle, offset: usize, data: &[u8]) -> bool {
        match self.buffers.get_mut(&buffer) {
            Some(buf) if offset + data.len() <= buf.data.len() => {
                buf.data[offset..offset + data.len()].copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    pub fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
    }

    pub fn buffer_exists(&self, buffer: BufferHandle) -> bool {
        self.buffers.contains_key(&buffer)
    }

    /// 读取缓冲的 CPU 侧副本（测试与调试用）
    pub fn buffer_bytes(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|b| b.data.as_slice())
    }

    /// 把缓冲绑定到 uniform 绑定点（glBindBufferBase）
    pub fn bind_buffer_base(&mut self, binding: u32, buffer: BufferHandle) {
        self.bound_uniform_buffers.insert(binding, buffer);
    }

    pub fn bound_uniform_buffer(&self, binding: u32) -> Option<BufferHandle> {
        self.bound_uniform_buffers.get(&binding).copied()
    }

    /// 绑定顶点缓冲到属性槽位（glBindBuffer + glVertexAttribPointer）
    pub fn bind_attrib_buffer(&mut self, location: u32, buffer: BufferHandle) {
        self.attrib_buffer_bindings.insert(location, buffer);
    }

    pub fn bound_attrib_buffer(&self, location: u32) -> Option<BufferHandle> {
        self.attrib_buffer_bindings.get(&location).copied()
    }

    // ------------------------------------------------------------------
    // 纹理
    // ------------------------------------------------------------------

    pub fn create_texture(&mut self, kind: TextureKind) -> TextureHandle {
        let handle = TextureHandle(self.ids.allocate());
        self.textures.insert(handle, kind);
        handle
    }

    /// 绑定纹理到指定纹理单元
    pub fn bind_texture(&mut self, unit: usize, texture: TextureHandle, kind: TextureKind) {
        if unit < MAX_TEXTURE_SLOTS {
            self.bound_texture_units[unit] = Some((texture, kind));
        }
    }

    // ------------------------------------------------------------------
    // 着色器程序
    // ------------------------------------------------------------------

    /// 编译单个着色阶段
    ///
    /// 空源码视为编译失败。
    pub fn compile_shader(
        &mut self,
        stage: ShaderStage,
        source: &str,
    ) -> Result<ShaderModuleHandle> {
        if source.trim().is_empty() {
            return Err(ShaderError::Compile(format!("{:?} stage: empty source", stage)).into());
        }

        let handle = ShaderModuleHandle(self.ids.allocate());
        self.shaders.insert(
            handle,
            GlShader {
                stage,
                source: source.to_string(),
            },
        );
        debug!(?stage, handle = handle.0, "compiled shader stage");
        Ok(handle)
    }

    /// 链接着色器程序
    ///
    /// 至少需要顶点和片元两个阶段。
    pub fn link_program(&mut self, stages: &[ShaderModuleHandle]) -> Result<ProgramHandle> {
        let mut combined = String::new();
        let mut has_vertex = false;
        let mut has_fragment = false;

        for &stage in stages {
            let shader = self.shaders.get(&stage).ok_or_else(|| {
                ShaderError::Link(format!("unknown shader stage handle {}", stage.0))
            })?;
            match shader.stage {
                ShaderStage::Vertex => has_vertex = true,
                ShaderStage::Fragment => has_fragment = true,
            }
            combined.push_str(&shader.source);
            combined.push('\n');
        }

        if !(has_vertex && has_fragment) {
            return Err(
                ShaderError::Link("program requires vertex and fragment stages".to_string()).into(),
            );
        }

        let handle = ProgramHandle(self.ids.allocate());
        self.programs.insert(
            handle,
            GlProgram {
                combined_source: combined,
                attrib_locations: HashMap::new(),
                uniform_locations: HashMap::new(),
                block_indices: HashMap::new(),
                block_bindings: HashMap::new(),
                sampler_units: HashMap::new(),
            },
        );
        Ok(handle)
    }

    /// 链接后验证（glValidateProgram）
    pub fn validate_program(&self, program: ProgramHandle) -> Result<()> {
        if self.programs.contains_key(&program) {
            Ok(())
        } else {
            Err(ShaderError::Validation(format!("unknown program handle {}", program.0)).into())
        }
    }

    pub fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
    }

    pub fn delete_shader(&mut self, shader: ShaderModuleHandle) {
        self.shaders.remove(&shader);
    }

    /// 查询顶点属性槽位
    ///
    /// 数组名（如 `Textures[3]`）先剥掉下标再匹配。
    pub fn attrib_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        let base = base_name(name);
        let prog = self.programs.get_mut(&program)?;
        if !prog.combined_source.contains(base) {
            return None;
        }
        let next = prog.attrib_locations.len() as u32;
        Some(*prog.attrib_locations.entry(base.to_string()).or_insert(next))
    }

    /// 查询 uniform block 索引
    pub fn uniform_block_index(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        let base = base_name(name);
        let prog = self.programs.get_mut(&program)?;
        if !prog.combined_source.contains(base) {
            return None;
        }
        let next = prog.block_indices.len() as u32;
        Some(*prog.block_indices.entry(base.to_string()).or_insert(next))
    }

    /// 查询 uniform（sampler）槽位
    ///
    /// 每个基础名占一段连续区间，数组下标作为区间内偏移。
    pub fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32> {
        let base = base_name(name);
        let prog = self.programs.get_mut(&program)?;
        if !prog.combined_source.contains(base) {
            return None;
        }
        let next = prog.uniform_locations.len() as u32 * MAX_TEXTURE_SLOTS as u32;
        let slot = *prog.uniform_locations.entry(base.to_string()).or_insert(next);
        Some(slot + array_index(name))
    }

    /// 把 uniform block 关联到绑定点（glUniformBlockBinding）
    pub fn uniform_block_binding(&mut self, program: ProgramHandle, index: u32, binding: u32) {
        if let Some(prog) = self.programs.get_mut(&program) {
            prog.block_bindings.insert(index, binding);
        }
    }

    /// 给 sampler uniform 赋纹理单元（glUniform1i）
    pub fn set_sampler_unit(&mut self, program: ProgramHandle, location: u32, unit: u32) {
        if let Some(prog) = self.programs.get_mut(&program) {
            prog.sampler_units.insert(location, unit);
        }
    }

    // ------------------------------------------------------------------
    // 绘制
    // ------------------------------------------------------------------

    pub fn draw_indexed(&mut self, _index_count: usize) {
        self.draw_calls += 1;
    }

    pub fn draw_call_count(&self) -> u64 {
        self.draw_calls
    }
}

/// 剥掉数组下标，返回基础名字
fn base_name(name: &str) -> &str {
    match name.find('[') {
        Some(pos) => &name[..pos],
        None => name,
    }
}

/// 数组名的下标（非数组名返回 0）
fn array_index(name: &str) -> u32 {
    let open = match name.find('[') {
        Some(p) => p,
        None => return 0,
    };
    let close = match name.find(']') {
        Some(p) => p,
        None => return 0,
    };
    name[open + 1..close].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "in vec3 VertexPosition; uniform MatrixBuffer { mat4 MVP; };";
    const FS: &str = "uniform DefaultBuffer { vec4 x; }; uniform sampler2D Textures[6];";

    #[test]
    fn test_compile_rejects_empty_source() {
        let mut ctx = GlContext::new();
        assert!(ctx.compile_shader(ShaderStage::Vertex, "   ").is_err());
    }

    #[test]
    fn test_link_requires_both_stages() {
        let mut ctx = GlContext::new();
        let vs = ctx.compile_shader(ShaderStage::Vertex, VS).unwrap();
        assert!(ctx.link_program(&[vs]).is_err());

        let fs = ctx.compile_shader(ShaderStage::Fragment, FS).unwrap();
        let prog = ctx.link_program(&[vs, fs]).unwrap();
        assert!(ctx.validate_program(prog).is_ok());
    }

    #[test]
    fn test_slot_resolution_by_reflection() {
        let mut ctx = GlContext::new();
        let vs = ctx.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = ctx.compile_shader(ShaderStage::Fragment, FS).unwrap();
        let prog = ctx.link_program(&[vs, fs]).unwrap();

        assert!(ctx.attrib_location(prog, "VertexPosition").is_some());
        assert!(ctx.attrib_location(prog, "VertexColor").is_none());
        assert!(ctx.uniform_block_index(prog, "MatrixBuffer").is_some());
        assert!(ctx.uniform_block_index(prog, "ColorBuffer").is_none());

        // 数组元素剥掉下标匹配，下标作为槽位偏移
        let t0 = ctx.uniform_location(prog, "Textures[0]").unwrap();
        let t3 = ctx.uniform_location(prog, "Textures[3]").unwrap();
        assert_eq!(t3, t0 + 3);
    }

    #[test]
    fn test_buffer_upload_round_trip() {
        let mut ctx = GlContext::new();
        let buf = ctx.gen_buffer();
        assert!(ctx.buffer_data(buf, &[1, 2, 3, 4]));
        assert_eq!(ctx.buffer_bytes(buf), Some(&[1u8, 2, 3, 4][..]));

        assert!(ctx.buffer_sub_data(buf, 2, &[9, 9]));
        assert_eq!(ctx.buffer_bytes(buf), Some(&[1u8, 2, 9, 9][..]));

        ctx.delete_buffer(buf);
        assert!(!ctx.buffer_exists(buf));
    }
}
