// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/output/draw.rs - 检测结果叠加绘制
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage, imageops::FilterType};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut},
  rect::Rect,
};

use crate::{
  analysis::{AnalysisResult, Defect, Status},
  geometry::{DisplayBox, ImageSize, InvalidDimensionError, project_onto},
};

// 结果页图像区域的默认尺寸
pub const DEFAULT_DISPLAY_WIDTH: u32 = 300;
pub const DEFAULT_DISPLAY_HEIGHT: u32 = 300;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 12.0;
const LABEL_TEXT_HEIGHT: i32 = 16;
const LABEL_CHAR_WIDTH: f32 = 7.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_PADDING: i32 = 2;
const BORDER_THICKNESS: i32 = 2;

const BOX_COLOR: [u8; 3] = [0x00, 0xff, 0xff];
const LABEL_TEXT_COLOR: [u8; 3] = [0x00, 0x00, 0x00];
const PASS_COLOR: [u8; 3] = [0x39, 0xff, 0x14];
const FAIL_COLOR: [u8; 3] = [0xff, 0x33, 0x33];

/// 将分析结果叠加到缩放后的图像上
pub struct Overlay {
  display_width: u32,
  display_height: u32,
  font: Option<FontVec>,
}

impl Default for Overlay {
  fn default() -> Self {
    Self {
      display_width: DEFAULT_DISPLAY_WIDTH,
      display_height: DEFAULT_DISPLAY_HEIGHT,
      font: None,
    }
  }
}

impl Overlay {
  pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
    self.display_width = width;
    self.display_height = height;
    self
  }

  pub fn with_font(mut self, font: FontVec) -> Self {
    self.font = Some(font);
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn display_size(&self) -> (u32, u32) {
    (self.display_width, self.display_height)
  }

  /// 缩放原图到显示尺寸，绘制状态标记与每个缺陷框
  pub fn draw_result(
    &self,
    image: &RgbImage,
    result: &AnalysisResult,
  ) -> Result<RgbImage, InvalidDimensionError> {
    let source = ImageSize::from(image.dimensions());
    let display = ImageSize::from(self.display_size());
    if self.display_width == 0 || self.display_height == 0 {
      return Err(InvalidDimensionError {
        dimension: if self.display_width == 0 {
          "display_width"
        } else {
          "display_height"
        },
        value: 0.0,
      });
    }

    let mut canvas = image::imageops::resize(
      image,
      self.display_width,
      self.display_height,
      FilterType::Triangle,
    );

    for defect in result.defects.iter() {
      let projected = project_onto(&defect.bbox, source, display)?;
      self.draw_box_with_label(&mut canvas, &projected, defect);
    }

    self.draw_status(&mut canvas, result);

    Ok(canvas)
  }

  fn draw_text(&self, image: &mut RgbImage, x: i32, y: i32, text: &str) {
    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        Rgb(LABEL_TEXT_COLOR),
        x + LABEL_TEXT_PADDING,
        y + LABEL_TEXT_PADDING,
        PxScale::from(LABEL_FONT_SIZE),
        font,
        text,
      );
    }
  }

  fn text_width(&self, text: &str) -> i32 {
    (text.chars().count() as f32 * LABEL_CHAR_WIDTH) as i32 + 2 * LABEL_TEXT_PADDING
  }

  fn draw_box_with_label(&self, image: &mut RgbImage, display: &DisplayBox, defect: &Defect) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    let x_min = (display.left.floor() as i32).clamp(0, w - 1);
    let y_min = (display.top.floor() as i32).clamp(0, h - 1);
    let x_max = (display.right().ceil() as i32).clamp(0, w - 1);
    let y_max = (display.bottom().ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    for t in 0..BORDER_THICKNESS {
      let width = (x_max - x_min - 2 * t).max(1) as u32;
      let height = (y_max - y_min - 2 * t).max(1) as u32;
      let rect = Rect::at(x_min + t, y_min + t).of_size(width, height);
      draw_hollow_rect_mut(image, rect, Rgb(BOX_COLOR));
    }

    // 标签位于框的上方
    let label = format!("{} {}%", defect.kind, defect.confidence);
    let label_x = x_min;
    let label_y = (y_min - LABEL_TEXT_HEIGHT).max(0);
    let label_width = self.text_width(&label).min(w - label_x);

    if label_width > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_width as u32, LABEL_TEXT_HEIGHT as u32);
      draw_filled_rect_mut(image, rect, Rgb(BOX_COLOR));
      self.draw_text(image, label_x, label_y, &label);
    }
  }

  fn draw_status(&self, image: &mut RgbImage, result: &AnalysisResult) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let color = match result.status {
      Status::Pass => PASS_COLOR,
      Status::Fail => FAIL_COLOR,
    };

    let text = format!("{} {}%", result.status, result.confidence);
    let width = self.text_width(&text).min(w);
    let height = LABEL_TEXT_HEIGHT.min(h);
    let rect = Rect::at(0, h - height).of_size(width as u32, height as u32);
    draw_filled_rect_mut(image, rect, Rgb(color));
    self.draw_text(image, 0, h - height, &text);
  }
}
