// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/payload.rs - 检测服务原始响应
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use serde::{Deserialize, Serialize};

use crate::analysis::ValidationError;

/// 检测服务返回的单个检测项，字段全部可缺省，由归一化阶段校验
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bbox: Option<Vec<f64>>, // [x1, y1, x2, y2]，原图像素坐标
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stage1_confidence: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stage2_class: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stage2_confidence: Option<f64>,
}

/// 检测服务的完整响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInspectionPayload {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub weld_detected: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub num_detections: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub detections: Option<Vec<RawDetection>>,
}

impl RawInspectionPayload {
  pub fn from_json(text: &str) -> Result<Self, ValidationError> {
    Ok(serde_json::from_str(text)?)
  }

  pub fn from_value(value: serde_json::Value) -> Result<Self, ValidationError> {
    Ok(serde_json::from_value(value)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_payload() {
    let json = r#"{
      "weld_detected": true,
      "num_detections": 1,
      "detections": [
        {"bbox": [1, 2, 3, 4], "stage1_confidence": 0.7, "stage2_class": "Undercut", "stage2_confidence": 0.66}
      ]
    }"#;

    let payload = RawInspectionPayload::from_json(json).unwrap();
    assert_eq!(payload.weld_detected, Some(true));
    assert_eq!(payload.num_detections, Some(1));
    let detections = payload.detections.unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].bbox, Some(vec![1.0, 2.0, 3.0, 4.0]));
    assert_eq!(detections[0].stage2_class.as_deref(), Some("Undercut"));
  }

  #[test]
  fn test_missing_fields_parse_as_none() {
    let payload = RawInspectionPayload::from_json(r#"{"detections": [{}]}"#).unwrap();
    assert_eq!(payload.weld_detected, None);
    assert_eq!(payload.detections.unwrap()[0], RawDetection::default());
  }

  #[test]
  fn test_wrong_type_is_malformed() {
    let err = RawInspectionPayload::from_json(r#"{"weld_detected": "yes"}"#).unwrap_err();
    assert!(matches!(err, ValidationError::Malformed(_)));
  }
}
