// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/geometry.rs - 原图坐标到显示坐标的映射
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

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("尺寸无效: {dimension} = {value}，必须为正数")]
pub struct InvalidDimensionError {
  pub dimension: &'static str,
  pub value: f64,
}

/// 显示坐标系中的矩形框，仅在一次渲染中有效
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayBox {
  pub left: f64,
  pub top: f64,
  pub width: f64,
  pub height: f64,
}

impl DisplayBox {
  pub fn right(&self) -> f64 {
    self.left + self.width
  }

  pub fn bottom(&self) -> f64 {
    self.top + self.height
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
  pub width: f64,
  pub height: f64,
}

impl ImageSize {
  pub fn new(width: f64, height: f64) -> Self {
    Self { width, height }
  }
}

impl From<(u32, u32)> for ImageSize {
  fn from((width, height): (u32, u32)) -> Self {
    Self::new(width as f64, height as f64)
  }
}

fn check(dimension: &'static str, value: f64) -> Result<f64, InvalidDimensionError> {
  // NaN 同样视为无效
  if value > 0.0 && value.is_finite() {
    Ok(value)
  } else {
    Err(InvalidDimensionError { dimension, value })
  }
}

/// 将原图像素坐标 bbox `[x1, y1, x2, y2]` 投影到显示区域。
///
/// 横纵方向独立缩放，显示区域不必保持原图宽高比。
pub fn project(
  bbox: &[f64; 4],
  source_width: f64,
  source_height: f64,
  display_width: f64,
  display_height: f64,
) -> Result<DisplayBox, InvalidDimensionError> {
  let source_width = check("source_width", source_width)?;
  let source_height = check("source_height", source_height)?;
  let display_width = check("display_width", display_width)?;
  let display_height = check("display_height", display_height)?;

  let scale_x = display_width / source_width;
  let scale_y = display_height / source_height;
  let [x1, y1, x2, y2] = *bbox;

  Ok(DisplayBox {
    left: x1 * scale_x,
    top: y1 * scale_y,
    width: (x2 - x1) * scale_x,
    height: (y2 - y1) * scale_y,
  })
}

pub fn project_onto(
  bbox: &[f64; 4],
  source: ImageSize,
  display: ImageSize,
) -> Result<DisplayBox, InvalidDimensionError> {
  project(
    bbox,
    source.width,
    source.height,
    display.width,
    display.height,
  )
}
