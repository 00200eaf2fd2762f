//! 句柄类型定义
//!
//! 所有后端资源都以不透明句柄的形式暴露，句柄只是一个单调递增的 id。
//! 每种资源类型有独立的新类型（newtype）包装，避免把缓冲句柄误当作
//! 纹理句柄使用的一类错误。
//!
//! 句柄为 0 表示"空"，有效句柄从 1 开始分配。

/// 为资源句柄生成新类型包装
macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// 空句柄
            pub const NULL: Self = Self(0);

            /// 句柄是否有效（非空）
            pub fn is_valid(&self) -> bool {
                self.0 != 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NULL
            }
        }
    };
}

define_handle!(
    /// GPU 缓冲句柄（顶点/索引/常量缓冲）
    BufferHandle
);
define_handle!(
    /// 设备内存分配句柄（Vulkan 的 buffer/memory 成对出现）
    MemoryHandle
);
define_handle!(
    /// 纹理句柄
    TextureHandle
);
define_handle!(
    /// 单个着色阶段句柄（编译后的 shader/blob/module）
    ShaderModuleHandle
);
define_handle!(
    /// 链接后的着色器程序句柄（OpenGL）
    ProgramHandle
);
define_handle!(
    /// 图形管线句柄（PSO / VkPipeline）
    PipelineHandle
);
define_handle!(
    /// 管线布局句柄
    PipelineLayoutHandle
);
define_handle!(
    /// 根签名句柄（Direct3D 12）
    RootSignatureHandle
);
define_handle!(
    /// 描述符集布局句柄（Vulkan）
    DescriptorSetLayoutHandle
);
define_handle!(
    /// 描述符池句柄（Vulkan）
    DescriptorPoolHandle
);
define_handle!(
    /// 描述符集句柄（Vulkan）
    DescriptorSetHandle
);
define_handle!(
    /// 固定功能状态对象句柄（Direct3D 11 的光栅化/混合/深度状态）
    StateObjectHandle
);

/// 句柄分配器
///
/// 单调递增，不复用已释放的 id，便于发现 use-after-free 性质的错误。
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self { next: 0 }
    }

    /// 分配下一个原始 id（从 1 开始）
    pub fn allocate(&mut self) -> u64 {
        self.next += 1;
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_start_at_one() {
        let mut alloc = HandleAllocator::new();
        assert_eq!(alloc.allocate(), 1);
        assert_eq!(alloc.allocate(), 2);
    }

    #[test]
    fn test_null_handle_invalid() {
        assert!(!BufferHandle::NULL.is_valid());
        assert!(BufferHandle(7).is_valid());
        assert_eq!(TextureHandle::default(), TextureHandle::NULL);
    }
}
