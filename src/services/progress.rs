//! 进度统计 - 业务能力层

use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// 进度追踪器
///
/// 每次运行重新创建（计数归零），只由编排层推进。
/// 计数器是原子的，单元并行处理时同样安全。
#[derive(Debug)]
pub struct ProgressTracker {
    processed: AtomicUsize,
    total: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            processed: AtomicUsize::new(0),
            total,
        }
    }

    /// 完成一个单元，记录并返回当前百分比
    pub fn advance(&self) -> f64 {
        let processed = self.processed.fetch_add(1, Ordering::SeqCst) + 1;
        let percentage = Self::percentage_of(processed, self.total);
        info!("{:.2}% completed.", percentage);
        percentage
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn percentage(&self) -> f64 {
        Self::percentage_of(self.processed(), self.total)
    }

    fn percentage_of(processed: usize, total: usize) -> f64 {
        if total == 0 {
            return 100.0;
        }
        processed as f64 / total as f64 * 100.0
    }
}
