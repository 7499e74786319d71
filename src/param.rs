// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块集中定义了 miniweb 在报文构建时使用的常量：
//! - 协议版本与换行符。
//! - 状态码到原因短语（Reason Phrase）的区间映射。
//! - `send_file` 可识别的文件类型表。
//! - 三类终止性错误响应的固定正文。

use std::collections::HashMap;
use lazy_static::lazy_static;

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 状态行中使用的协议版本
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// 单次读取连接数据的默认缓冲区大小
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8192;

/// 请求缺少 `Host` 头部时的响应正文
pub const BAD_REQUEST_BODY: &str = "400 Bad Request";

/// 路由表中找不到路径时的响应正文
pub const NOT_FOUND_BODY: &str = "404 Page Not Found";

/// 文件类型无法识别或读取失败时的响应正文
pub const INTERNAL_ERROR_BODY: &str = "500 Internal Server Error";

/// `send_file` 可以提供的一种内容类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentType {
    /// MIME 类型本体，不含参数
    pub mime: &'static str,
    /// 为 `true` 时按 UTF-8 文本读取，并在头部追加 charset 标注
    pub text: bool,
}

impl ContentType {
    /// 生成 `Content-Type` 头部的取值
    pub fn header_value(&self) -> String {
        match self.text {
            true => format!("{}; charset=UTF-8", self.mime),
            false => self.mime.to_string(),
        }
    }
}

lazy_static! {
    /// 文件后缀名到内容类型的固定映射表。
    ///
    /// 表外的后缀一律视为无法提供的资源，`send_file` 会直接返回 500。
    pub static ref CONTENT_TYPES: HashMap<&'static str, ContentType> = {
        let mut map = HashMap::new();
        map.insert("html", ContentType { mime: "text/html", text: true });
        map.insert("css", ContentType { mime: "text/css", text: true });
        map.insert("txt", ContentType { mime: "text/plain", text: true });
        map.insert("png", ContentType { mime: "image/png", text: false });
        map.insert("gif", ContentType { mime: "image/gif", text: false });
        map.insert("jpg", ContentType { mime: "image/jpeg", text: false });
        map.insert("jpeg", ContentType { mime: "image/jpeg", text: false });
        map
    };
}

/// 根据状态码推导原因短语。
///
/// 只有 301、302、404 有单独的短语，其余按百位区间给出粗粒度描述，
/// 例如 403 同样得到 "Bad Request"。区间 100..=599 之外返回 "None"。
pub fn reason_phrase(code: u16) -> &'static str {
    match code {
        100..=199 => "Received",
        200..=299 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        300..=399 => "See Other",
        404 => "Not Found",
        400..=499 => "Bad Request",
        500..=599 => "Internal Server Error",
        _ => "None",
    }
}
