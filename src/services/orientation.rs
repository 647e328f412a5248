//! 方向分类服务 - 业务能力层
//!
//! 只负责"这个序列是否镜像"的判断，不关心流程。
//! 每个序列只用首帧 `00000.TIFF` 判断，单次尝试，不重试。

use image::ImageFormat;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ClassifierError;
use crate::infrastructure::frame_io::{self, FrameStack};
use crate::infrastructure::PredictionClient;
use crate::models::FlipDecision;
use crate::services::frame_encoder;

/// 序列首帧文件名
pub const FIRST_FRAME_NAME: &str = "00000.TIFF";
/// 导出的 JPEG 预览文件名（与序列放在同一目录）
pub const PREVIEW_NAME: &str = "_TIFF_JPG.jpg";

/// 方向判定能力
///
/// 编排层只依赖这个能力，便于替换为本地实现
pub trait OrientationCheck {
    /// 判断序列目录是否需要翻转
    fn check(
        &self,
        sequence_dir: &Path,
    ) -> impl Future<Output = Result<FlipDecision, ClassifierError>>;
}

/// 方向分类服务
///
/// 职责：
/// - 导出首帧 JPEG
/// - 提交到外部分类服务
/// - 把预测结果映射为 [`FlipDecision`]
pub struct OrientationClassifier {
    client: PredictionClient,
}

impl OrientationClassifier {
    pub fn new(client: PredictionClient) -> Self {
        Self { client }
    }

    /// 判定一个序列
    ///
    /// # 返回
    /// - `Ok(FlipNeeded | NoFlip | Inconclusive)`
    /// - `Err(_)`：首帧缺失、导出失败、网络/状态/解析错误（调用方按不翻转处理）
    pub async fn classify(&self, sequence_dir: &Path) -> Result<FlipDecision, ClassifierError> {
        let first_frame = sequence_dir.join(FIRST_FRAME_NAME);
        if !first_frame.is_file() {
            return Err(ClassifierError::FrameMissing(first_frame));
        }
        let preview = sequence_dir.join(PREVIEW_NAME);

        let image_bytes =
            tokio::task::spawn_blocking(move || export_preview(&first_frame, &preview))
                .await
                .map_err(|e| ClassifierError::Task(e.to_string()))??;

        let result = self.client.predict(image_bytes).await?;
        debug!("分类服务连接成功，共 {} 个预测", result.predictions.len());

        let decision = result.decide();
        let probability = result
            .leading()
            .or_else(|| result.predictions.first())
            .map(|p| p.probability * 100.0)
            .unwrap_or(0.0);
        info!("{}", decision_message(sequence_dir, decision, probability));
        Ok(decision)
    }
}

impl OrientationCheck for OrientationClassifier {
    fn check(
        &self,
        sequence_dir: &Path,
    ) -> impl Future<Output = Result<FlipDecision, ClassifierError>> {
        self.classify(sequence_dir)
    }
}

/// 判定日志，以序列目录作为前缀（并行处理时可区分单元）
pub fn decision_message(sequence_dir: &Path, decision: FlipDecision, probability: f64) -> String {
    let text = match decision {
        FlipDecision::FlipNeeded => "↔️ 图像为镜像（从右到左），需要翻转",
        FlipDecision::NoFlip => "✓ 方向正确",
        FlipDecision::Inconclusive => "❔ 方向无法确定，不翻转",
    };
    format!("[{}] {}。概率: {:.2}%", sequence_dir.display(), text, probability)
}

/// 把首帧转换为 8 位灰度并保存为 JPEG，返回 JPEG 字节
pub fn export_preview(first_frame: &Path, preview: &Path) -> Result<Vec<u8>, ClassifierError> {
    let export_error = |source: image::ImageError| ClassifierError::Export {
        path: PathBuf::from(first_frame),
        source,
    };

    let frame = frame_io::decode_image(first_frame).map_err(export_error)?;
    let gray = frame_encoder::normalize(&FrameStack::start_with(frame))
        .into_iter()
        .next()
        .ok_or_else(|| ClassifierError::FrameMissing(first_frame.to_path_buf()))?;

    gray.save_with_format(preview, ImageFormat::Jpeg)
        .map_err(|source| ClassifierError::Export {
            path: preview.to_path_buf(),
            source,
        })?;

    std::fs::read(preview).map_err(|source| ClassifierError::ReadPreview {
        path: preview.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::frame_io::Gray16Image;
    use image::Luma;
    use std::time::Duration;

    #[test]
    fn test_export_preview_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let tiff = dir.path().join(FIRST_FRAME_NAME);
        Gray16Image::from_fn(8, 8, |x, y| Luma([(x * y * 50) as u16]))
            .save_with_format(&tiff, ImageFormat::Tiff)
            .unwrap();

        let preview = dir.path().join(PREVIEW_NAME);
        let bytes = export_preview(&tiff, &preview).unwrap();
        assert!(preview.is_file());
        // JPEG SOI
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_decision_message_names_sequence() {
        let dir = Path::new("/in/A02/POINT 00001/BRIGHT");
        let flip = decision_message(dir, FlipDecision::FlipNeeded, 85.0);
        assert!(flip.starts_with("[/in/A02/POINT 00001/BRIGHT] "));
        assert!(flip.contains("需要翻转"));
        assert!(flip.ends_with("概率: 85.00%"));

        let upright = decision_message(dir, FlipDecision::NoFlip, 90.0);
        assert!(upright.contains("A02") && upright.contains("方向正确"));
        let unsure = decision_message(dir, FlipDecision::Inconclusive, 50.0);
        assert!(unsure.contains("A02") && unsure.contains("不翻转"));
    }

    #[tokio::test]
    async fn test_classify_without_first_frame() {
        let dir = tempfile::tempdir().unwrap();
        let client = PredictionClient::new("http://127.0.0.1:9/unused", "k", Duration::from_secs(1))
            .unwrap();
        let classifier = OrientationClassifier::new(client);

        assert!(matches!(
            classifier.classify(dir.path()).await,
            Err(ClassifierError::FrameMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_classify_unreachable_service_is_error() {
        let dir = tempfile::tempdir().unwrap();
        Gray16Image::from_pixel(4, 4, Luma([10]))
            .save_with_format(dir.path().join(FIRST_FRAME_NAME), ImageFormat::Tiff)
            .unwrap();

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = format!("http://{}/p", addr);
        let client = PredictionClient::new(url, "k", Duration::from_secs(2)).unwrap();
        let classifier = OrientationClassifier::new(client);

        assert!(matches!(
            classifier.check(dir.path()).await,
            Err(ClassifierError::Network { .. })
        ));
        // 预览仍然已导出
        assert!(dir.path().join(PREVIEW_NAME).is_file());
    }
}
