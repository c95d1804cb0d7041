// 该文件是 Hanfeng （焊缝） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

/// Hanfeng 焊缝检测客户端
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 待检图像
  /// 例如: image:///path/to/weld.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 检测服务地址
  /// 例如: http://172.20.10.4:8000/inspect/image?timeout=30
  #[arg(long, value_name = "ENDPOINT")]
  pub endpoint: Url,

  /// 输出路径
  /// 支持格式:
  /// - 叠加图像: image:///path/out.png?width=300&height=300&font=/path/font.ttf
  ///   未指定 font= 时只绘制缺陷框与标签底色，不绘制文字
  /// - JSON 记录: json:///path/result.json
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}
