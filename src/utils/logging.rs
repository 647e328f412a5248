//! 日志工具模块
//!
//! 所有结果都追加写入按日期命名的日志文件；
//! Debug 模式下同样的信息也输出到控制台。

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::BatchConfig;
use crate::orchestrator::BatchReport;

/// `2024-05-01 10:00:00 || 消息`
struct PipeFormat;

impl<S, N> FormatEvent<S, N> for PipeFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{} || ", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        let level = *event.metadata().level();
        if level <= Level::WARN {
            write!(writer, "{}: ", level)?;
        }
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// 当天日志文件路径：`<log_folder>/Log_YYYY_MM_DD.txt`
pub fn log_file_path(log_folder: &Path) -> PathBuf {
    log_folder.join(format!("Log_{}.txt", Local::now().format("%Y_%m_%d")))
}

fn open_log_file(log_folder: &Path) -> Result<(File, PathBuf)> {
    fs::create_dir_all(log_folder)
        .with_context(|| format!("无法创建日志目录: {}", log_folder.display()))?;
    let path = log_file_path(log_folder);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("无法打开日志文件: {}", path.display()))?;
    Ok((file, path))
}

/// 控制台默认级别：Debug 模式为 DEBUG，否则只输出 WARN 及以上
pub fn console_default_level(debug: bool) -> &'static str {
    if debug {
        "debug"
    } else {
        "warn"
    }
}

/// 构造批处理日志订阅器（不安装为全局）
///
/// - 文件层：DEBUG 及以上，追加写入，Mutex 保证并发写入串行化
/// - 控制台层：见 [`console_default_level`]；`RUST_LOG` 优先
pub fn batch_subscriber(file: File, debug: bool) -> impl Subscriber + Send + Sync + 'static {
    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(PipeFormat)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .with_filter(LevelFilter::DEBUG);

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_default_level(debug)));
    let console_layer = tracing_subscriber::fmt::layer()
        .event_format(PipeFormat)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
}

/// 初始化批处理日志
///
/// # 返回
/// 返回日志文件路径
pub fn init_batch_logging(config: &BatchConfig) -> Result<PathBuf> {
    let (file, path) = open_log_file(&config.log_folder)?;

    batch_subscriber(file, config.debug)
        .try_init()
        .context("日志系统已初始化")?;

    Ok(path)
}

/// 仅控制台日志（用于不需要日志文件的子命令）
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .event_format(PipeFormat)
        .with_env_filter(filter)
        .try_init();
}

/// 记录程序启动信息
///
/// Debug 模式下额外输出当前配置
pub fn log_startup(config: &BatchConfig) {
    info!("{}", "*".repeat(50));
    info!("🚀 程序启动 - 孔板序列方向校正");
    info!("📊 计划处理单元数: {}", config.total_units());
    if config.debug {
        info!("🐞 DEBUG 模式已启用，当前配置:");
        for (key, value) in config.describe() {
            info!("{:<25}: {}", key, value);
        }
    }
    info!("{}", "*".repeat(50));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &BatchReport, log_file_path: &Path) {
    info!("{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", report.succeeded, report.total);
    info!("⏭️ 跳过: {}", report.skipped);
    info!("❌ 失败: {}", report.failed);
    info!("{}", "=".repeat(60));
    info!("日志已保存至: {}", log_file_path.display());
}
