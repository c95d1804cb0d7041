// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/analysis.rs - 检测结果归一化
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
use thiserror::Error;
use tracing::{debug, warn};

use crate::payload::{RawDetection, RawInspectionPayload};

/// 无缺陷时的整体置信度
pub const PASS_CONFIDENCE: u8 = 100;

#[derive(Error, Debug)]
pub enum ValidationError {
  #[error("缺少必需字段: {0}")]
  MissingField(String),
  #[error("字段 {field} 无效: {reason}")]
  InvalidField { field: String, reason: String },
  #[error("响应格式错误: {0}")]
  Malformed(#[from] serde_json::Error),
}

impl ValidationError {
  fn invalid(field: String, reason: &str) -> Self {
    ValidationError::InvalidField {
      field,
      reason: reason.to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
  Pass,
  Fail,
}

impl std::fmt::Display for Status {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Status::Pass => write!(f, "PASS"),
      Status::Fail => write!(f, "FAIL"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defect {
  #[serde(rename = "type")]
  pub kind: String,
  pub confidence: u8,
  pub bbox: [f64; 4], // [x1, y1, x2, y2]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
  pub status: Status,
  pub confidence: u8,
  pub defects: Vec<Defect>,
}

impl AnalysisResult {
  pub fn pass() -> Self {
    AnalysisResult {
      status: Status::Pass,
      confidence: PASS_CONFIDENCE,
      defects: Vec::new(),
    }
  }

  pub fn is_pass(&self) -> bool {
    self.status == Status::Pass
  }

  pub fn summary(&self) -> String {
    format!(
      "{} {}% ({} defects)",
      self.status,
      self.confidence,
      self.defects.len()
    )
  }
}

/// 将检测服务的原始响应转换为分析结果。
///
/// `weld_detected` 为假时忽略检测列表，直接判定通过；
/// 否则每个检测项对应一个缺陷，整体置信度取缺陷置信度的最大值。
pub fn normalize(payload: &RawInspectionPayload) -> Result<AnalysisResult, ValidationError> {
  let weld_detected = payload
    .weld_detected
    .ok_or_else(|| ValidationError::MissingField("weld_detected".to_string()))?;

  if !weld_detected {
    debug!("未检测到焊缝，忽略检测列表");
    return Ok(AnalysisResult::pass());
  }

  let detections = payload
    .detections
    .as_deref()
    .ok_or_else(|| ValidationError::MissingField("detections".to_string()))?;

  match payload.num_detections {
    Some(num) if num as usize != detections.len() => warn!(
      "检测数量不一致: num_detections = {}, 实际检测项 = {}",
      num,
      detections.len()
    ),
    Some(_) => {}
    None => debug!(
      "响应缺少 num_detections，按检测列表长度 {} 处理",
      detections.len()
    ),
  }

  let defects = detections
    .iter()
    .enumerate()
    .map(|(index, detection)| to_defect(index, detection))
    .collect::<Result<Vec<_>, _>>()?;

  let Some(confidence) = defects.iter().map(|d| d.confidence).max() else {
    return Ok(AnalysisResult::pass());
  };

  Ok(AnalysisResult {
    status: Status::Fail,
    confidence,
    defects,
  })
}

fn to_defect(index: usize, detection: &RawDetection) -> Result<Defect, ValidationError> {
  let field = |name: &str| format!("detections[{}].{}", index, name);

  let bbox = detection
    .bbox
    .as_deref()
    .ok_or_else(|| ValidationError::MissingField(field("bbox")))?;
  let bbox: [f64; 4] = bbox
    .try_into()
    .map_err(|_| ValidationError::invalid(field("bbox"), "需要 4 个坐标"))?;
  if bbox.iter().any(|v| !v.is_finite()) {
    return Err(ValidationError::invalid(field("bbox"), "坐标必须为有限数值"));
  }

  let kind = detection
    .stage2_class
    .clone()
    .ok_or_else(|| ValidationError::MissingField(field("stage2_class")))?;

  let score = detection
    .stage2_confidence
    .ok_or_else(|| ValidationError::MissingField(field("stage2_confidence")))?;
  if !score.is_finite() {
    return Err(ValidationError::invalid(
      field("stage2_confidence"),
      "置信度必须为有限数值",
    ));
  }

  debug!(
    "检测项 {}: {} stage1 = {:?}, stage2 = {:.4}",
    index, kind, detection.stage1_confidence, score
  );

  Ok(Defect {
    kind,
    confidence: to_percent(score),
    bbox,
  })
}

/// 0–1 置信度转百分比，四舍五入后截断到 [0, 100]
pub fn to_percent(score: f64) -> u8 {
  (score * 100.0 + 0.5).floor().clamp(0.0, 100.0) as u8
}

impl From<&Defect> for RawDetection {
  fn from(defect: &Defect) -> Self {
    RawDetection {
      bbox: Some(defect.bbox.to_vec()),
      stage1_confidence: None,
      stage2_class: Some(defect.kind.clone()),
      stage2_confidence: Some(defect.confidence as f64 / 100.0),
    }
  }
}

impl From<&AnalysisResult> for RawInspectionPayload {
  fn from(result: &AnalysisResult) -> Self {
    let detections: Vec<RawDetection> = result.defects.iter().map(RawDetection::from).collect();
    RawInspectionPayload {
      weld_detected: Some(true),
      num_detections: Some(detections.len() as u64),
      detections: Some(detections),
    }
  }
}
