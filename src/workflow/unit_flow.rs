//! 单元处理流程 - 流程层
//!
//! 核心职责：定义"一个序列"的完整处理流程
//!
//! 流程顺序：
//! 1. 检查输入目录是否存在（不存在 → 跳过）
//! 2. 方向分类（失败 → 按不翻转处理）
//! 3. 加载 → 归一化 → 可选翻转 → 编码

use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::error::UnitError;
use crate::models::FlipDecision;
use crate::services::{FrameTransformEncoder, OrientationCheck};
use crate::workflow::processing_unit::ProcessingUnit;

/// 单元处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    /// 写入的视频文件
    pub output: PathBuf,
    /// 写入的帧数
    pub frames: usize,
    /// 是否应用了翻转
    pub flipped: bool,
}

/// 单元处理流程
///
/// - 编排单个序列的完整处理流程
/// - 决定何时分类、何时降级为不翻转
/// - 只依赖业务能力（services）
pub struct UnitFlow<C> {
    classifier: C,
    encoder: FrameTransformEncoder,
    input_root: PathBuf,
    output_root: PathBuf,
}

impl<C: OrientationCheck> UnitFlow<C> {
    /// 创建新的单元处理流程
    pub fn new(config: &BatchConfig, classifier: C) -> Self {
        Self {
            classifier,
            encoder: FrameTransformEncoder::new(config.frame_rate),
            input_root: config.input_folder.clone(),
            output_root: config.output_folder.clone(),
        }
    }

    pub async fn run(&self, unit: &ProcessingUnit) -> Result<UnitOutcome, UnitError> {
        let input_dir = unit.input_dir(&self.input_root);

        // ========== 步骤 1: 输入目录检查 ==========
        if !input_dir.is_dir() {
            return Err(UnitError::DirectoryMissing(input_dir));
        }
        debug!("{} 📂 输入目录: {}", unit, input_dir.display());

        // ========== 步骤 2: 方向分类 ==========
        let decision = match self.classifier.check(&input_dir).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("{} ⚠️ 方向分类失败，按不翻转处理: {}", unit, e);
                FlipDecision::NoFlip
            }
        };
        let flipped = decision.should_flip();

        // ========== 步骤 3: 加载 / 归一化 / 翻转 / 编码 ==========
        let output = unit.output_path(&self.output_root);
        let encoder = self.encoder;
        let (src, dst) = (input_dir.clone(), output.clone());
        let frames = tokio::task::spawn_blocking(move || encoder.transcode(&src, &dst, flipped))
            .await
            .map_err(|e| UnitError::Task(e.to_string()))??;

        info!(
            "{} ✅ 已写入 {} ({} 帧{})",
            unit,
            output.display(),
            frames,
            if flipped { "，已翻转" } else { "" }
        );
        Ok(UnitOutcome {
            output,
            frames,
            flipped,
        })
    }
}
