//! # Plate Stabilizer
//!
//! 把孔板显微镜图像序列批量转换为方向统一的灰度视频
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `PredictionClient` - 唯一的 HTTP 客户端，提交 JPEG 并解析预测
//! - `frame_io` / `avi_writer` - 读取编号图像序列、写入无压缩 AVI
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个序列
//! - `PlateLayout` - 板尺寸 → 孔位列表
//! - `OrientationClassifier` - 判断序列是否镜像
//! - `FrameTransformEncoder` - 加载 / 归一化 / 翻转 / 编码
//! - `ProgressTracker` - 进度百分比
//! - `config_editor` - 改写配置中的孔位选择
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个单元"的完整处理流程
//! - `ProcessingUnit` - 上下文封装（孔位 + 采集点）
//! - `UnitFlow` - 流程编排（目录检查 → 分类 → 编码）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量处理器，管理目录准备、并发和统计
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::BatchConfig;
pub use error::{AppError, AppResult};
pub use infrastructure::PredictionClient;
pub use models::{ClassificationResult, FlipDecision, Prediction, WellId};
pub use orchestrator::{BatchContext, BatchOrchestrator, BatchReport};
pub use services::{FrameTransformEncoder, OrientationCheck, OrientationClassifier, PlateLayout};
pub use workflow::{ProcessingUnit, UnitFlow, UnitOutcome};
