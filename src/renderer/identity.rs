//! 着色器身份
//!
//! 每个内置着色器程序有一个稳定身份，由程序名解析得到。身份决定
//! 绘制路径上的一切分支：用哪个常量块、是否采样网格纹理、
//! 是否采样深度贴图。未识别的名字解析为 [`ShaderIdentity::Unknown`]，
//! 绘制请求在 debug 构建断言、release 构建静默跳过。

use crate::core::NR_OF_SHADERS;

/// 内置着色器程序的身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderIdentity {
    /// 纯色（调试/选择高亮）
    Color,
    /// 标准光照 + 阴影
    Default,
    /// 深度 pass（阴影贴图生成）
    Depth,
    /// 屏幕空间 HUD
    Hud,
    /// 天空盒
    Skybox,
    /// 线框
    Wireframe,
    /// 未识别的程序名
    Unknown,
}

/// 程序名 → 身份的查找表，顺序即身份索引
const SHADER_NAMES: [(&str, ShaderIdentity); NR_OF_SHADERS] = [
    ("color", ShaderIdentity::Color),
    ("default", ShaderIdentity::Default),
    ("depth", ShaderIdentity::Depth),
    ("hud", ShaderIdentity::Hud),
    ("skybox", ShaderIdentity::Skybox),
    ("wireframe", ShaderIdentity::Wireframe),
];

impl ShaderIdentity {
    /// 由程序名解析身份
    pub fn resolve(name: &str) -> Self {
        SHADER_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, id)| *id)
            .unwrap_or(ShaderIdentity::Unknown)
    }

    /// 身份在各类每身份数组（管线、常量缓冲）中的索引
    pub fn index(&self) -> Option<usize> {
        SHADER_NAMES.iter().position(|(_, id)| id == self)
    }

    pub fn name(&self) -> &'static str {
        match self.index() {
            Some(i) => SHADER_NAMES[i].0,
            None => "unknown",
        }
    }

    /// 该身份是否采样网格纹理槽
    pub fn samples_mesh_textures(&self) -> bool {
        matches!(
            self,
            ShaderIdentity::Default | ShaderIdentity::Hud | ShaderIdentity::Skybox
        )
    }

    /// 该身份是否采样深度贴图（阴影）
    pub fn samples_depth_maps(&self) -> bool {
        matches!(self, ShaderIdentity::Default)
    }

    /// 该身份使用颜色常量块
    pub fn uses_color_block(&self) -> bool {
        matches!(self, ShaderIdentity::Color | ShaderIdentity::Wireframe)
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, ShaderIdentity::Depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_names() {
        assert_eq!(ShaderIdentity::resolve("color"), ShaderIdentity::Color);
        assert_eq!(ShaderIdentity::resolve("default"), ShaderIdentity::Default);
        assert_eq!(ShaderIdentity::resolve("depth"), ShaderIdentity::Depth);
        assert_eq!(ShaderIdentity::resolve("hud"), ShaderIdentity::Hud);
        assert_eq!(ShaderIdentity::resolve("skybox"), ShaderIdentity::Skybox);
        assert_eq!(ShaderIdentity::resolve("wireframe"), ShaderIdentity::Wireframe);
    }

    #[test]
    fn test_resolve_unknown_name() {
        assert_eq!(ShaderIdentity::resolve("bloom"), ShaderIdentity::Unknown);
        assert_eq!(ShaderIdentity::resolve(""), ShaderIdentity::Unknown);
        assert!(ShaderIdentity::Unknown.index().is_none());
    }

    #[test]
    fn test_indices_are_stable() {
        assert_eq!(ShaderIdentity::Color.index(), Some(0));
        assert_eq!(ShaderIdentity::Wireframe.index(), Some(NR_OF_SHADERS - 1));
    }

    #[test]
    fn test_sampling_predicates() {
        assert!(ShaderIdentity::Default.samples_mesh_textures());
        assert!(ShaderIdentity::Default.samples_depth_maps());
        assert!(ShaderIdentity::Skybox.samples_mesh_textures());
        assert!(!ShaderIdentity::Skybox.samples_depth_maps());
        assert!(ShaderIdentity::Wireframe.uses_color_block());
        assert!(!ShaderIdentity::Depth.samples_mesh_textures());
    }
}
