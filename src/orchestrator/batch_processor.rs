//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责整个批处理的调度和统计。
//!
//! ## 核心功能
//!
//! 1. **目录准备**：为 `CreateFolders` 中的每个孔位创建输出目录（失败即中止）
//! 2. **单元展开**：`ReadFolders × BrightFoldersPoint`，按配置顺序
//! 3. **并发控制**：`MaxConcurrentUnits` 限制同时处理的单元数（默认顺序执行）
//! 4. **失败隔离**：单元错误在单元边界被捕获并记录，批处理继续
//! 5. **全局统计**：汇总成功 / 跳过 / 失败
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单个序列的细节
//! - **向下委托**：委托 `UnitFlow` 处理单个单元

use futures::stream::{self, StreamExt};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::config::BatchConfig;
use crate::error::{AppError, UnitError};
use crate::services::{OrientationCheck, ProgressTracker};
use crate::workflow::{ProcessingUnit, UnitFlow, UnitOutcome};

/// 批处理上下文
///
/// 每次运行构造一次，以引用方式在编排层中传递
pub struct BatchContext<'a> {
    pub config: &'a BatchConfig,
    pub progress: ProgressTracker,
}

impl<'a> BatchContext<'a> {
    pub fn new(config: &'a BatchConfig) -> Self {
        Self {
            config,
            progress: ProgressTracker::new(config.total_units()),
        }
    }
}

/// 批处理统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, result: &Result<UnitOutcome, UnitError>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(e) if e.is_skip() => self.skipped += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// 批量处理器
pub struct BatchOrchestrator<C> {
    flow: UnitFlow<C>,
}

impl<C: OrientationCheck> BatchOrchestrator<C> {
    pub fn new(config: &BatchConfig, classifier: C) -> Self {
        Self {
            flow: UnitFlow::new(config, classifier),
        }
    }

    /// 运行整个批处理
    ///
    /// 只有输出目录创建失败会返回错误，单元错误只计入统计
    pub async fn run(&self, ctx: &BatchContext<'_>) -> Result<BatchReport, AppError> {
        let config = ctx.config;
        if config.viewer {
            warn!("⚠️ Visor=True：批处理模式不支持交互式查看器，已忽略");
        }

        prepare_output_folders(config)?;

        let units = plan_units(config);
        let mut report = BatchReport {
            total: units.len(),
            ..Default::default()
        };
        log_units_planned(report.total, config.max_concurrent_units);

        let mut results = stream::iter(units.iter())
            .map(|unit| async move { (unit, self.flow.run(unit).await) })
            .buffer_unordered(config.max_concurrent_units.max(1));

        while let Some((unit, result)) = results.next().await {
            match &result {
                Ok(_) => {}
                Err(e) if e.is_skip() => warn!("{} ⏭️ 跳过: {}", unit, e),
                Err(e) => error!("{} ❌ 处理失败: {}", unit, e),
            }
            report.record(&result);
            if config.progress {
                ctx.progress.advance();
            }
        }

        Ok(report)
    }
}

/// 按配置顺序展开所有处理单元（孔位在外层，采集点在内层）
pub fn plan_units(config: &BatchConfig) -> Vec<ProcessingUnit> {
    config
        .read_folders
        .iter()
        .flat_map(|well| {
            config
                .bright_points
                .iter()
                .map(move |point| ProcessingUnit::new(well.as_str(), point.as_str()))
        })
        .collect()
}

/// 创建输出根目录和 `CreateFolders` 中的每个孔位目录（已存在时不报错）
pub fn prepare_output_folders(config: &BatchConfig) -> Result<(), AppError> {
    ensure_dir(&config.output_folder)?;
    for well in &config.create_folders {
        ensure_dir(&config.output_folder.join(well))?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), AppError> {
    if path.is_dir() {
        debug!("{} already exist", path.display());
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|source| AppError::Bootstrap {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("{} created", path.display());
    Ok(())
}

// ========== 日志辅助函数 ==========

fn log_units_planned(total: usize, max_concurrent: usize) {
    info!("{}", "=".repeat(60));
    info!("✓ 共 {} 个待处理单元", total);
    if max_concurrent > 1 {
        info!("📋 最多同时处理 {} 个单元", max_concurrent);
    } else {
        info!("📋 按顺序逐个处理");
    }
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_key_values;

    fn config(extra: &str, root: &Path) -> BatchConfig {
        let text = format!(
            "InputFolder={}\nOutputFolder={}\nReadFolders=A02,A01\nCreateFolders=A01,A02,B01\n\
             BrightFoldersPoint=P1,P2\nDebug=False\nAvance=True\nVisor=False\nDev=False\n\
             ENDPOINT=http://127.0.0.1:9/x\nPREDICTION_KEY=k\n{}",
            root.join("in").display(),
            root.join("out").display(),
            extra
        );
        BatchConfig::from_map(&parse_key_values(&text), root).unwrap()
    }

    #[test]
    fn test_plan_units_keeps_config_order() {
        let dir = tempfile::tempdir().unwrap();
        let units = plan_units(&config("", dir.path()));
        let pairs: Vec<(&str, &str)> = units
            .iter()
            .map(|u| (u.well.as_str(), u.point.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("A02", "P1"), ("A02", "P2"), ("A01", "P1"), ("A01", "P2")]
        );
    }

    #[test]
    fn test_prepare_output_folders_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let config = config("", dir.path());
        prepare_output_folders(&config).unwrap();
        prepare_output_folders(&config).unwrap();
        for well in ["A01", "A02", "B01"] {
            assert!(dir.path().join("out").join(well).is_dir());
        }
    }

    #[test]
    fn test_prepare_output_folders_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // 输出根目录被同名文件占用
        std::fs::write(dir.path().join("out"), b"file").unwrap();
        let result = prepare_output_folders(&config("", dir.path()));
        assert!(matches!(result, Err(AppError::Bootstrap { .. })));
    }

    #[test]
    fn test_report_record() {
        let mut report = BatchReport::default();
        report.record(&Err(UnitError::DirectoryMissing("x".into())));
        report.record(&Err(UnitError::Task("boom".into())));
        report.record(&Ok(UnitOutcome {
            output: "a.avi".into(),
            frames: 1,
            flipped: false,
        }));
        assert_eq!((report.succeeded, report.skipped, report.failed), (1, 1, 1));
    }
}
