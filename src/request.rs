// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 将一次读取到的报文文本解析为 `Request`。解析是尽力而为的：
//! 缺失或格式不正确的部分退化为空字符串或空映射，从不返回错误。
//!
//! 已知的有意限制：
//! - 头部名称保持原样，不做大小写归一化。
//! - 正文各行直接拼接，换行符不会保留。
//! - 不处理分块传输、头部折叠，也不限制报文大小。

use std::collections::HashMap;
use std::fmt;

use crate::param::CRLF;

/// 一条解析完成且不可变的 HTTP 请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// 请求行的第一个字段
    method: String,
    /// 请求行的第二个字段（未解码，包含查询字符串）
    path: String,
    /// 空行之前所有格式正确的 `Name: Value` 行
    headers: HashMap<String, String>,
    /// 空行之后的所有行，去掉换行后按顺序拼接
    body: String,
    /// 原始报文文本
    raw: String,
}

impl Request {
    /// 从报文文本构建 `Request`。
    ///
    /// # 逻辑步骤
    /// 1. 按 CRLF 切分并去掉每行首尾空白，定位第一个空行。
    /// 2. 第 0 行是请求行，取前两个以空格分隔的字段作为方法与路径。
    /// 3. 第一个空行之前的行按第一个 `": "` 拆成头部键值；没有空行时其余各行全部视为头部。
    /// 4. 第一个空行之后的行拼接为正文。
    pub fn parse(raw: &str) -> Self {
        let lines: Vec<&str> = raw.split(CRLF).map(str::trim).collect();
        let first_empty = lines.iter().position(|line| line.is_empty());

        let mut method = String::new();
        let mut path = String::new();
        let mut headers = HashMap::new();
        let mut body = String::new();

        for (index, line) in lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            if index == 0 {
                let mut tokens = line.split(' ');
                method = tokens.next().unwrap_or_default().to_string();
                path = tokens.next().unwrap_or_default().to_string();
            } else if first_empty.map_or(true, |empty| index < empty) {
                if let Some((key, value)) = line.split_once(": ") {
                    headers.insert(key.to_string(), value.to_string());
                }
            } else {
                body.push_str(line);
            }
        }

        Self {
            method,
            path,
            headers,
            body,
            raw: raw.to_string(),
        }
    }
}

impl From<&[u8]> for Request {
    /// 非法的 UTF-8 字节以替换字符代替后再解析
    fn from(buffer: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(buffer))
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// --- Getter 访问器实现 ---

impl Request {
    /// 获取请求方法（原样，不做大小写转换）
    pub fn method(&self) -> &str {
        &self.method
    }

    /// 获取请求路径（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取全部头部
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// 按名称精确查找头部，区分大小写
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// 获取拼接后的正文
    pub fn body(&self) -> &str {
        &self.body
    }
}
