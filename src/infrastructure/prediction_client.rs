//! 预测服务客户端 - 基础设施层
//!
//! 持有唯一的 HTTP 客户端，只暴露"提交一张图片"的能力

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::BatchConfig;
use crate::error::ClassifierError;
use crate::models::ClassificationResult;

/// 预测服务客户端
///
/// 职责：
/// - 持有 `reqwest::Client`（连接池）
/// - 发送原始 JPEG 字节并解析响应
/// - 不认识孔位 / 采集点
/// - 单次尝试，不重试
pub struct PredictionClient {
    http: Client,
    endpoint: String,
    prediction_key: String,
}

impl PredictionClient {
    /// 创建新的预测客户端
    pub fn new(
        endpoint: impl Into<String>,
        prediction_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClassifierError> {
        let endpoint = endpoint.into();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClassifierError::Network {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok(Self {
            http,
            endpoint,
            prediction_key: prediction_key.into(),
        })
    }

    /// 从批处理配置创建
    pub fn from_config(config: &BatchConfig) -> Result<Self, ClassifierError> {
        Self::new(
            config.endpoint.clone(),
            config.prediction_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 提交图片并返回分类结果
    ///
    /// # 参数
    /// - `image_bytes`: 原始 JPEG 字节
    ///
    /// # 返回
    /// 非 2xx 状态返回 `Status`（附带响应体），非 JSON 响应返回 `Parse`
    pub async fn predict(
        &self,
        image_bytes: Vec<u8>,
    ) -> Result<ClassificationResult, ClassifierError> {
        debug!("提交图片到分类服务: {} ({} 字节)", self.endpoint, image_bytes.len());

        let response = self
            .http
            .post(&self.endpoint)
            .header("Prediction-Key", &self.prediction_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image_bytes)
            .send()
            .await
            .map_err(|source| self.network_error(source))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| self.network_error(source))?;

        if !status.is_success() {
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ClassifierError::Parse { body, source })
    }

    fn network_error(&self, source: reqwest::Error) -> ClassifierError {
        ClassifierError::Network {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}
