//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 ReadFolders × BrightFoldersPoint)
//!     ↓
//! workflow::UnitFlow (处理单个 ProcessingUnit)
//!     ↓
//! services (能力层：orientation / frame_encoder / progress)
//!     ↓
//! infrastructure (基础设施：PredictionClient / frame_io / avi_writer)
//! ```
//!
//! ## 设计原则
//!
//! 1. **失败隔离**：任何单元错误都不会中止批处理
//! 2. **显式上下文**：进度和配置通过 `BatchContext` 传递，没有全局状态
//! 3. **向下依赖**：编排层 → workflow → services → infrastructure
//! 4. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod batch_processor;

// 重新导出主要类型
pub use batch_processor::{BatchContext, BatchOrchestrator, BatchReport};
