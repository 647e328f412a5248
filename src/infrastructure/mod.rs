//! 基础设施层
//!
//! 持有稀缺资源（HTTP 连接池、文件句柄），只暴露能力

pub mod avi_writer;
pub mod frame_io;
pub mod prediction_client;

pub use frame_io::FrameStack;
pub use prediction_client::PredictionClient;
