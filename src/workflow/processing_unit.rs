//! 处理单元上下文
//!
//! 封装"我正在处理哪个孔位的哪个采集点"这一信息

use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::services::frame_encoder;

/// 处理单元：一个 (孔位, 采集点) 组合
///
/// 输入目录为 `<InputFolder>/<well>/<point>`，
/// 输出文件为 `<OutputFolder>/<well>/<point前11字符>.avi`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingUnit {
    /// 孔位标识
    pub well: String,

    /// 采集点标识（可能包含 `\` 或 `/`）
    pub point: String,
}

impl ProcessingUnit {
    pub fn new(well: impl Into<String>, point: impl Into<String>) -> Self {
        Self {
            well: well.into(),
            point: point.into(),
        }
    }

    /// 输入序列目录，采集点中的每个分隔符开始一个新的路径组件
    pub fn input_dir(&self, input_root: &Path) -> PathBuf {
        self.point
            .split(['\\', '/'])
            .filter(|part| !part.is_empty())
            .fold(input_root.join(&self.well), |dir, part| dir.join(part))
    }

    /// 输出视频路径
    pub fn output_path(&self, output_root: &Path) -> PathBuf {
        frame_encoder::output_path(output_root, &self.well, &self.point)
    }
}

impl Display for ProcessingUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[孔位 {} 采集点 {}]", self.well, self.point)
    }
}
