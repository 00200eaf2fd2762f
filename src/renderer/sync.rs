//! 帧同步原语
//!
//! fence 型后端（Direct3D 12 / Vulkan）的 CPU-GPU 同步：提交时在队列上
//! 签发单调递增的 fence 值，GPU 完成后推进已完成值。资源释放与
//! 常量缓冲复写都以"已完成值是否越过签发值"为判据。
//!
//! 句柄级模型中没有真实 GPU，`complete` 由呈现/测试代码显式推进。

use std::sync::atomic::{AtomicU64, Ordering};

/// 帧 fence
///
/// `current` 是最近一次签发的值，`completed` 是 GPU 已越过的值。
/// 两者都从 0 开始；`completed >= current` 时没有在途工作。
#[derive(Debug, Default)]
pub struct FrameFence {
    current: AtomicU64,
    completed: AtomicU64,
}

impl FrameFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在队列上签发下一个 fence 值，返回签发的值
    pub fn signal(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 推进已完成值（由驱动回调或测试代码调用）
    pub fn complete(&self, value: u64) {
        self.completed.fetch_max(value, Ordering::SeqCst);
    }

    /// 指定值的工作是否已完成
    pub fn is_completed(&self, value: u64) -> bool {
        self.completed.load(Ordering::SeqCst) >= value
    }

    /// 是否存在在途工作
    pub fn has_pending_work(&self) -> bool {
        self.completed.load(Ordering::SeqCst) < self.current.load(Ordering::SeqCst)
    }

    pub fn current_value(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// 完成全部在途工作（等价于 wait-idle 后的状态）
    pub fn flush(&self) {
        let current = self.current.load(Ordering::SeqCst);
        self.completed.fetch_max(current, Ordering::SeqCst);
    }
}
