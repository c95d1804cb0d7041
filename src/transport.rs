// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/transport.rs - 检测服务客户端
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

use std::time::Duration;

use reqwest::blocking::{
  Client,
  multipart::{Form, Part},
};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl,
  analysis::ValidationError,
  input::CapturedImage,
  payload::RawInspectionPayload,
};

const DEFAULT_INSPECT_PATH: &str = "/inspect/image";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const IMAGE_FIELD: &str = "image";

/// 将一张图像交给检测服务，取回原始响应
pub trait Inspector {
  type Error;

  fn inspect(&self, image: &CapturedImage) -> Result<RawInspectionPayload, Self::Error>;
}

#[derive(Error, Debug)]
pub enum TransportError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("超时参数无效: {0}")]
  InvalidTimeout(String),
  #[error("检测服务返回错误状态: {status}")]
  Status { status: u16 },
  #[error("请求失败: {0}")]
  Request(#[from] reqwest::Error),
  #[error("响应不是合法的 JSON: {0}")]
  Decode(serde_json::Error),
  #[error("响应内容无效: {0}")]
  Validation(#[from] ValidationError),
}

pub struct InspectClient {
  client: Client,
  endpoint: Url,
  timeout: Duration,
}

impl FromUrl for InspectClient {
  type Error = TransportError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != "http" && url.scheme() != "https" {
      return Err(TransportError::SchemeMismatch(format!(
        "检测服务地址必须使用 http 或 https, 实际为 '{}'",
        url.scheme()
      )));
    }

    let mut timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    let mut rest = Vec::new();
    for (k, v) in url.query_pairs() {
      if k == "timeout" {
        let secs: u64 = v
          .parse()
          .ok()
          .filter(|secs| *secs > 0)
          .ok_or_else(|| TransportError::InvalidTimeout(v.to_string()))?;
        timeout = Duration::from_secs(secs);
      } else {
        rest.push((k.into_owned(), v.into_owned()));
      }
    }

    let mut endpoint = url.clone();
    endpoint.set_query(None);
    if !rest.is_empty() {
      endpoint.query_pairs_mut().extend_pairs(rest);
    }
    if endpoint.path().is_empty() || endpoint.path() == "/" {
      endpoint.set_path(DEFAULT_INSPECT_PATH);
    }

    let client = Client::builder().timeout(timeout).build()?;

    Ok(InspectClient {
      client,
      endpoint,
      timeout,
    })
  }
}

impl InspectClient {
  pub fn endpoint(&self) -> &Url {
    &self.endpoint
  }

  pub fn timeout(&self) -> Duration {
    self.timeout
  }
}

impl Inspector for InspectClient {
  type Error = TransportError;

  fn inspect(&self, image: &CapturedImage) -> Result<RawInspectionPayload, Self::Error> {
    info!(
      "上传图像 {} ({} 字节) 到 {}",
      image.file_name,
      image.bytes.len(),
      self.endpoint
    );

    let part = Part::bytes(image.bytes.clone())
      .file_name(image.file_name.clone())
      .mime_str(image.mime_type())?;
    let form = Form::new().part(IMAGE_FIELD, part);

    let response = self
      .client
      .post(self.endpoint.clone())
      .multipart(form)
      .send()?;

    let status = response.status();
    if !status.is_success() {
      return Err(TransportError::Status {
        status: status.as_u16(),
      });
    }

    let body = response.bytes()?;
    debug!("检测服务响应 {} 字节", body.len());
    let value: serde_json::Value = serde_json::from_slice(&body).map_err(TransportError::Decode)?;

    Ok(RawInspectionPayload::from_value(value)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::{Read, Write};
  use std::net::{TcpListener, TcpStream};
  use std::thread::{self, JoinHandle};

  fn find(data: &[u8], pattern: &[u8]) -> Option<usize> {
    data.windows(pattern.len()).position(|w| w == pattern)
  }

  fn read_request(stream: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
      let n = stream.read(&mut buf).unwrap();
      if n == 0 {
        break;
      }
      data.extend_from_slice(&buf[..n]);
      let Some(end) = find(&data, b"\r\n\r\n") else {
        continue;
      };
      let head = String::from_utf8_lossy(&data[..end]).to_lowercase();
      let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok());
      match content_length {
        Some(len) if data.len() - end - 4 >= len => break,
        Some(_) => continue,
        None if head.contains("chunked") => {
          if data.ends_with(b"0\r\n\r\n") {
            break;
          }
        }
        None => break,
      }
    }
    String::from_utf8_lossy(&data).into_owned()
  }

  fn serve_once(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
      let (mut stream, _) = listener.accept().unwrap();
      let request = read_request(&mut stream);
      let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
      stream.write_all(response.as_bytes()).unwrap();
      request
    });
    (Url::parse(&format!("http://{}", addr)).unwrap(), handle)
  }

  fn weld_image() -> CapturedImage {
    CapturedImage {
      bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3],
      file_name: "weld.jpg".to_string(),
      width: 640,
      height: 480,
    }
  }

  #[test]
  fn test_default_path_and_timeout() {
    let url = Url::parse("http://127.0.0.1:8000?timeout=5&token=abc").unwrap();
    let client = InspectClient::from_url(&url).unwrap();
    assert_eq!(client.endpoint().path(), DEFAULT_INSPECT_PATH);
    assert_eq!(client.endpoint().query(), Some("token=abc"));
    assert_eq!(client.timeout(), Duration::from_secs(5));

    let url = Url::parse("https://inspect.local/api/v2/weld").unwrap();
    let client = InspectClient::from_url(&url).unwrap();
    assert_eq!(client.endpoint().path(), "/api/v2/weld");
    assert_eq!(client.endpoint().query(), None);
    assert_eq!(client.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
  }

  #[test]
  fn test_bad_config() {
    let url = Url::parse("ftp://127.0.0.1/inspect").unwrap();
    assert!(matches!(
      InspectClient::from_url(&url),
      Err(TransportError::SchemeMismatch(_))
    ));

    let url = Url::parse("http://127.0.0.1/inspect?timeout=soon").unwrap();
    assert!(matches!(
      InspectClient::from_url(&url),
      Err(TransportError::InvalidTimeout(_))
    ));

    let url = Url::parse("http://127.0.0.1/inspect?timeout=0").unwrap();
    assert!(matches!(
      InspectClient::from_url(&url),
      Err(TransportError::InvalidTimeout(ref v)) if v == "0"
    ));
  }

  #[test]
  fn test_inspect_posts_multipart_image() {
    let (url, server) = serve_once(
      "200 OK",
      r#"{"weld_detected":true,"num_detections":1,"detections":[{"bbox":[1,2,3,4],"stage1_confidence":0.5,"stage2_class":"Cracks","stage2_confidence":0.9}]}"#,
    );
    let client = InspectClient::from_url(&url).unwrap();
    let payload = client.inspect(&weld_image()).unwrap();

    assert_eq!(payload.weld_detected, Some(true));
    assert_eq!(payload.detections.unwrap().len(), 1);

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /inspect/image"));
    assert!(request.to_lowercase().contains("multipart/form-data"));
    assert!(request.contains(r#"name="image""#));
    assert!(request.contains(r#"filename="weld.jpg""#));
    assert!(request.contains("image/jpeg"));
  }

  #[test]
  fn test_non_success_status() {
    let (url, server) = serve_once("500 Internal Server Error", r#"{"detail":"boom"}"#);
    let client = InspectClient::from_url(&url).unwrap();
    let err = client.inspect(&weld_image()).unwrap_err();
    assert!(matches!(err, TransportError::Status { status: 500 }));
    server.join().unwrap();
  }

  #[test]
  fn test_body_is_not_json() {
    let (url, server) = serve_once("200 OK", "<html>oops</html>");
    let client = InspectClient::from_url(&url).unwrap();
    let err = client.inspect(&weld_image()).unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)));
    server.join().unwrap();
  }

  #[test]
  fn test_body_with_wrong_shape() {
    let (url, server) = serve_once("200 OK", r#"{"weld_detected":"maybe"}"#);
    let client = InspectClient::from_url(&url).unwrap();
    let err = client.inspect(&weld_image()).unwrap_err();
    assert!(matches!(
      err,
      TransportError::Validation(ValidationError::Malformed(_))
    ));
    server.join().unwrap();
  }
}
