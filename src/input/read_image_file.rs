// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::{io::Cursor, path::Path};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  url_file_path,
  input::{CapturedImage, DEFAULT_FILE_NAME},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("文件路径解码失败: {0}")]
  PathError(#[from] std::string::FromUtf8Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 从本地文件读取一张待检图像，作为单帧输入源
pub struct ImageFileInput {
  image: Option<CapturedImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Self::open(url_file_path(url)?)
  }
}

impl ImageFileInput {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    // 只读取头部获得原图像素尺寸，上传的仍是原始字节
    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
      .with_guessed_format()?
      .into_dimensions()?;
    let file_name = path
      .file_name()
      .and_then(|name| name.to_str())
      .unwrap_or(DEFAULT_FILE_NAME)
      .to_string();

    debug!(
      "读取图像 {}: {}x{}, {} 字节",
      path.display(),
      width,
      height,
      bytes.len()
    );

    Ok(ImageFileInput {
      image: Some(CapturedImage {
        bytes,
        file_name,
        width,
        height,
      }),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = CapturedImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}
