use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use plate_stabilizer::config::{BatchConfig, DEFAULT_CONFIG_FILE};
use plate_stabilizer::services::config_editor;
use plate_stabilizer::services::plate_layout::{PlateLayout, PRESET_SIZES};
use plate_stabilizer::utils::logging;
use plate_stabilizer::{BatchContext, BatchOrchestrator, OrientationClassifier, PredictionClient};

/// 孔板图像序列方向校正与视频转换
#[derive(Parser, Debug)]
#[command(name = "plate-stabilizer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 按配置文件运行批处理
    Run {
        /// 配置文件路径
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// 设置板尺寸并改写配置中的 ReadFolders / CreateFolders
    Plate {
        /// 板尺寸，例如 "8 x 6"
        #[arg(long, required_unless_present = "list")]
        size: Option<String>,
        /// 只选择部分孔位，逗号分隔
        #[arg(long, value_delimiter = ',')]
        select: Vec<String>,
        /// 列出预设尺寸
        #[arg(long)]
        list: bool,
        /// 配置文件路径
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config } => run_batch(&config).await,
        Command::Plate {
            size,
            select,
            list,
            config,
        } => configure_plate(size.as_deref(), &select, list, &config),
    }
}

async fn run_batch(config_path: &Path) -> Result<()> {
    // 加载配置（缺项时直接中止）
    let config = BatchConfig::load(config_path)
        .with_context(|| format!("加载配置失败: {}", config_path.display()))?;

    // 初始化日志
    let log_path = logging::init_batch_logging(&config)?;
    logging::log_startup(&config);

    let client = PredictionClient::from_config(&config).context("无法创建分类服务客户端")?;
    let orchestrator = BatchOrchestrator::new(&config, OrientationClassifier::new(client));
    let ctx = BatchContext::new(&config);

    let report = orchestrator.run(&ctx).await?;
    logging::print_final_stats(&report, &log_path);

    println!(
        "完成: 成功 {} / 跳过 {} / 失败 {} (共 {})，日志: {}",
        report.succeeded,
        report.skipped,
        report.failed,
        report.total,
        log_path.display()
    );
    Ok(())
}

fn configure_plate(
    size: Option<&str>,
    select: &[String],
    list: bool,
    config_path: &Path,
) -> Result<()> {
    logging::init_console_logging();

    if list {
        for preset in PRESET_SIZES {
            println!("{}", preset);
        }
        return Ok(());
    }

    let size = size.context("缺少 --size 参数")?;
    let layout = PlateLayout::parse(size)?;
    let wells = if select.is_empty() {
        layout.wells()
    } else {
        layout.select(select)?
    };

    config_editor::update_well_selection(config_path, &wells)?;
    info!(
        "✓ 板尺寸 {} x {}，已写入 {} 个孔位到 {}",
        layout.rows,
        layout.cols,
        wells.len(),
        config_path.display()
    );
    Ok(())
}
