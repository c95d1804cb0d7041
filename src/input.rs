// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/input.rs - 待检图像输入
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

use crate::FromUrl;

/// 上传时缺省的文件名
pub const DEFAULT_FILE_NAME: &str = "weld.jpg";

/// 一张拍摄或选取的图像：编码后的原始字节及其像素尺寸
#[derive(Debug, Clone)]
pub struct CapturedImage {
  pub bytes: Vec<u8>,
  pub file_name: String,
  pub width: u32,
  pub height: u32,
}

impl CapturedImage {
  pub fn mime_type(&self) -> &'static str {
    let lower = self.file_name.to_lowercase();
    if lower.ends_with(".png") {
      "image/png"
    } else if lower.ends_with(".webp") {
      "image/webp"
    } else {
      "image/jpeg"
    }
  }

  pub fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }
}

#[cfg(feature = "read_image_file")]
mod read_image_file;

#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = CapturedImage;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next(),
    }
  }
}
