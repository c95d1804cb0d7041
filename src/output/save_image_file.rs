// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/output/save_image_file.rs - 保存叠加结果图像
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

use std::path::PathBuf;

use ab_glyph::FontVec;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  analysis::AnalysisResult,
  geometry::InvalidDimensionError,
  input::CapturedImage,
  output::{Render, draw::Overlay},
  url_file_path,
};

pub struct SaveImageFileOutput {
  path: PathBuf,
  overlay: Overlay,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("文件路径解码失败: {0}")]
  PathError(std::string::FromUtf8Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("参数 {0} 无效: {1}")]
  InvalidParam(String, String),
  #[error("字体加载失败: {0}")]
  FontError(String),
  #[error("{0}")]
  Dimension(#[from] InvalidDimensionError),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

fn parse_size(key: &str, value: &str) -> Result<u32, SaveImageFileError> {
  value
    .parse()
    .ok()
    .filter(|v: &u32| *v > 0)
    .ok_or_else(|| SaveImageFileError::InvalidParam(key.to_string(), value.to_string()))
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let mut overlay = Overlay::default();
    let (mut width, mut height) = overlay.display_size();
    for (k, v) in uri.query_pairs() {
      match k.as_ref() {
        "width" => width = parse_size(&k, &v)?,
        "height" => height = parse_size(&k, &v)?,
        "font" => {
          let data = std::fs::read(&*v).map_err(SaveImageFileError::IoError)?;
          let font =
            FontVec::try_from_vec(data).map_err(|e| SaveImageFileError::FontError(e.to_string()))?;
          overlay = overlay.with_font(font);
        }
        _ => debug!("忽略未知参数: {}={}", k, v),
      }
    }

    if !overlay.has_font() {
      warn!("未指定 font= 参数，叠加图像中的标签将不显示文字");
    }

    Ok(SaveImageFileOutput {
      path: url_file_path(uri).map_err(SaveImageFileError::PathError)?,
      overlay: overlay.with_display_size(width, height),
    })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: image::RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<CapturedImage, AnalysisResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    frame: &CapturedImage,
    result: &AnalysisResult,
  ) -> Result<(), Self::Error> {
    let image = image::load_from_memory(&frame.bytes)
      .map_err(SaveImageFileError::ImageError)?
      .into_rgb8();
    let image = self.overlay.draw_result(&image, result)?;
    self.save_image(image)
  }
}
