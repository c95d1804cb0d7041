// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/task.rs - 检测任务
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

use tracing::{error, info, warn};

use crate::{
  analysis::{AnalysisResult, normalize},
  input::CapturedImage,
  output::Render,
  transport::Inspector,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, inspector: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 取一张图像，发起一次检测请求，等待响应后归一化并输出
pub struct OneShotTask;

impl<
  IE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = CapturedImage>,
  M: Inspector<Error = IE>,
  O: Render<CapturedImage, AnalysisResult, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Output = AnalysisResult;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, inspector: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let image = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    let (width, height) = image.dimensions();
    info!(
      "输入图像获取成功: {} {}x{}，开始检测...",
      image.file_name, width, height
    );

    let now = std::time::Instant::now();
    let payload = inspector.inspect(&image).map_err(|e| {
      error!("分析失败，请重试: {}", e);
      anyhow::Error::new(e)
    })?;
    info!("检测完成，耗时: {:.2?}", now.elapsed());

    let result = normalize(&payload)?;
    if result.is_pass() {
      info!("分析结果: {}", result.summary());
    } else {
      warn!("分析结果: {}", result.summary());
    }
    for defect in result.defects.iter() {
      info!("  - {}: 置信度 {}% at {:?}", defect.kind, defect.confidence, defect.bbox);
    }

    output.render_result(&image, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analysis::Status;
  use crate::payload::{RawDetection, RawInspectionPayload};
  use std::cell::RefCell;
  use thiserror::Error;

  #[derive(Error, Debug)]
  #[error("fake failure")]
  struct FakeError;

  struct FakeInspector {
    payload: Option<RawInspectionPayload>,
  }

  impl Inspector for FakeInspector {
    type Error = FakeError;

    fn inspect(&self, _image: &CapturedImage) -> Result<RawInspectionPayload, Self::Error> {
      self.payload.clone().ok_or(FakeError)
    }
  }

  #[derive(Default)]
  struct FakeRender {
    rendered: RefCell<Vec<AnalysisResult>>,
  }

  impl Render<CapturedImage, AnalysisResult> for &FakeRender {
    type Error = FakeError;

    fn render_result(
      &self,
      _frame: &CapturedImage,
      result: &AnalysisResult,
    ) -> Result<(), Self::Error> {
      self.rendered.borrow_mut().push(result.clone());
      Ok(())
    }
  }

  fn image() -> CapturedImage {
    CapturedImage {
      bytes: vec![0; 4],
      file_name: "weld.jpg".to_string(),
      width: 640,
      height: 480,
    }
  }

  #[test]
  fn test_one_shot_renders_normalized_result() {
    let payload = RawInspectionPayload {
      weld_detected: Some(true),
      num_detections: Some(1),
      detections: Some(vec![RawDetection {
        bbox: Some(vec![1.0, 2.0, 3.0, 4.0]),
        stage1_confidence: Some(0.8),
        stage2_class: Some("Cracks".to_string()),
        stage2_confidence: Some(0.93),
      }]),
    };
    let render = FakeRender::default();
    let result = OneShotTask
      .run_task(
        std::iter::once(image()),
        FakeInspector {
          payload: Some(payload),
        },
        &render,
      )
      .unwrap();

    assert_eq!(result.status, Status::Fail);
    assert_eq!(result.confidence, 93);
    assert_eq!(render.rendered.borrow().as_slice(), &[result]);
  }

  #[test]
  fn test_transport_failure_skips_render() {
    let render = FakeRender::default();
    let err = OneShotTask
      .run_task(
        std::iter::once(image()),
        FakeInspector { payload: None },
        &render,
      )
      .unwrap_err();
    assert!(err.downcast_ref::<FakeError>().is_some());
    assert!(render.rendered.borrow().is_empty());
  }

  #[test]
  fn test_empty_input() {
    let render = FakeRender::default();
    let result = OneShotTask.run_task(
      std::iter::empty::<CapturedImage>(),
      FakeInspector { payload: None },
      &render,
    );
    assert!(result.is_err());
  }

  #[test]
  fn test_invalid_payload_skips_render() {
    let render = FakeRender::default();
    let result = OneShotTask.run_task(
      std::iter::once(image()),
      FakeInspector {
        payload: Some(RawInspectionPayload::default()),
      },
      &render,
    );
    assert!(result.is_err());
    assert!(render.rendered.borrow().is_empty());
  }
}
