//! 分类服务响应与翻转判定

use serde::{Deserialize, Serialize};

/// 判定阈值（固定）
pub const PROBABILITY_THRESHOLD: f64 = 0.7;
/// 表示"镜像"（从右到左）的标签
pub const MIRRORED_TAG: &str = "Derecha";
/// 表示"方向正确"的标签
pub const CORRECT_TAG: &str = "Izquierda";

/// 单个预测项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "tagName")]
    pub tag_name: String,
    pub probability: f64,
}

impl Prediction {
    pub fn new(tag_name: impl Into<String>, probability: f64) -> Self {
        Self {
            tag_name: tag_name.into(),
            probability,
        }
    }

    fn crosses(&self, tag: &str) -> bool {
        self.tag_name == tag && self.probability > PROBABILITY_THRESHOLD
    }
}

/// 分类结果：按响应顺序排列的 (标签, 概率) 列表
///
/// 响应中的其它字段（id、project、iteration 等）被忽略
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub predictions: Vec<Prediction>,
}

/// 翻转判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDecision {
    /// 序列是镜像的，需要水平翻转
    FlipNeeded,
    /// 方向正确
    NoFlip,
    /// 没有任何标签越过阈值
    Inconclusive,
}

impl FlipDecision {
    /// 是否需要翻转（`Inconclusive` 按不翻转处理）
    pub fn should_flip(self) -> bool {
        matches!(self, FlipDecision::FlipNeeded)
    }
}

impl ClassificationResult {
    /// 根据预测列表得出判定
    ///
    /// 镜像标签优先：只要存在越过阈值的镜像预测即为 `FlipNeeded`，
    /// 否则看是否存在越过阈值的方向正确预测。
    pub fn decide(&self) -> FlipDecision {
        if self.predictions.iter().any(|p| p.crosses(MIRRORED_TAG)) {
            FlipDecision::FlipNeeded
        } else if self.predictions.iter().any(|p| p.crosses(CORRECT_TAG)) {
            FlipDecision::NoFlip
        } else {
            FlipDecision::Inconclusive
        }
    }

    /// 第一个越过阈值的预测（用于日志）
    pub fn leading(&self) -> Option<&Prediction> {
        self.predictions
            .iter()
            .find(|p| p.crosses(MIRRORED_TAG))
            .or_else(|| self.predictions.iter().find(|p| p.crosses(CORRECT_TAG)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(items: &[(&str, f64)]) -> ClassificationResult {
        ClassificationResult {
            predictions: items.iter().map(|(t, p)| Prediction::new(*t, *p)).collect(),
        }
    }

    #[test]
    fn test_decide_single_label() {
        assert_eq!(result(&[("Derecha", 0.85)]).decide(), FlipDecision::FlipNeeded);
        assert_eq!(result(&[("Izquierda", 0.9)]).decide(), FlipDecision::NoFlip);
        assert_eq!(result(&[("Derecha", 0.5)]).decide(), FlipDecision::Inconclusive);
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(result(&[("Derecha", 0.7)]).decide(), FlipDecision::Inconclusive);
        assert_eq!(result(&[("Izquierda", 0.7)]).decide(), FlipDecision::Inconclusive);
    }

    #[test]
    fn test_decide_scans_full_list() {
        let r = result(&[("Derecha", 0.2), ("Izquierda", 0.8)]);
        assert_eq!(r.decide(), FlipDecision::NoFlip);
        assert_eq!(r.leading().unwrap().tag_name, "Izquierda");

        let r = result(&[("Izquierda", 0.75), ("Derecha", 0.9)]);
        assert_eq!(r.decide(), FlipDecision::FlipNeeded);
    }

    #[test]
    fn test_unknown_tags_and_empty() {
        assert_eq!(result(&[("Otro", 0.99)]).decide(), FlipDecision::Inconclusive);
        assert_eq!(result(&[]).decide(), FlipDecision::Inconclusive);
        assert!(!FlipDecision::Inconclusive.should_flip());
    }

    #[test]
    fn test_deserialize_response() {
        let body = r#"{"id":"x","predictions":[
            {"probability":0.93,"tagId":"t","tagName":"Derecha"}
        ]}"#;
        let parsed: ClassificationResult = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.predictions, vec![Prediction::new("Derecha", 0.93)]);
    }
}
