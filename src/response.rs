//! # HTTP 响应构建模块
//!
//! `Response` 累积状态码、头部与正文，并把序列化后的报文写入连接的写端。
//! 每条入站报文对应一个新的 `Response`，由处理器独占。
//!
//! 生命周期：创建后可以任意次数地修改头部，最终通过 `send`、`redirect`、
//! `redirect_with_status`、`send_file` 或 `write_head` + `write` + `end`
//! 中的一种方式结束，结束时关闭连接的写方向。终止操作只能调用一次，
//! 重复调用的结果由调用方负责。

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::{
    files::PublicDir,
    param::{reason_phrase, ContentType, CONTENT_TYPES, CRLF, HTTP_VERSION, INTERNAL_ERROR_BODY},
};

/// 响应写入的目标：一条连接的写端
pub type Connection = Box<dyn AsyncWrite + Send + Unpin>;

pub struct Response {
    status_code: u16,
    headers: IndexMap<String, String>,
    body: String,
    connection: Connection,
    files: Arc<PublicDir>,
    id: u128,
    finished: bool,
}

impl Response {
    pub fn new(connection: Connection, files: Arc<PublicDir>, id: u128) -> Self {
        Self {
            status_code: 0,
            headers: IndexMap::new(),
            body: String::new(),
            connection,
            files,
            id,
            finished: false,
        }
    }

    /// 设置头部。同名头部以最后一次为准，位置保持首次插入时的顺序。
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// 原样写入连接，不加任何分帧，也不关闭连接。
    pub async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.connection.write_all(data).await
    }

    /// 写入最后一段数据并关闭连接的写方向。
    pub async fn end(&mut self, data: &[u8]) -> io::Result<()> {
        if self.finished {
            warn!("[ID{}]响应已经结束，终止操作被重复调用", self.id);
        }
        self.finished = true;
        self.connection.write_all(data).await?;
        self.connection.flush().await?;
        self.connection.shutdown().await?;
        debug!("[ID{}]响应发送完毕，连接写端已关闭", self.id);
        Ok(())
    }

    /// 只写出状态行与头部，连接保持打开，正文随后通过 `write` / `end` 发送。
    pub async fn write_head(&mut self, code: u16) -> io::Result<()> {
        self.status_code = code;
        let head = self.head(code);
        self.write(head.as_bytes()).await
    }

    /// 发送完整响应并结束。没有头部时省略整个头部块。
    pub async fn send(&mut self, code: u16, body: &str) -> io::Result<()> {
        self.status_code = code;
        self.body = body.to_string();
        let message = self.to_string();
        self.end(message.as_bytes()).await
    }

    /// 以 301 重定向到 `url`。
    pub async fn redirect(&mut self, url: &str) -> io::Result<()> {
        self.redirect_with_status(301, url).await
    }

    /// 以指定状态码重定向到 `url`，不带正文。
    pub async fn redirect_with_status(&mut self, code: u16, url: &str) -> io::Result<()> {
        self.status_code = code;
        self.set_header("Location", url);
        let head = self.head(code);
        self.end(head.as_bytes()).await
    }

    /// 从公共目录发送文件。
    ///
    /// 类型表之外的扩展名直接返回 500，不做任何 I/O；读取失败同样返回 500。
    pub async fn send_file(&mut self, path: &str) -> io::Result<()> {
        let content_type = match content_type_of(path) {
            Some(t) => t,
            None => {
                warn!("[ID{}]无法识别文件{}的类型，返回500", self.id, path);
                return self.send(500, INTERNAL_ERROR_BODY).await;
            }
        };
        debug!("[ID{}]文件{}的类型: {}", self.id, path, content_type.mime);

        let result = self.files.read(path, content_type.text).await;
        match result {
            Ok(content) => {
                self.set_header("Content-Type", &content_type.header_value());
                self.write_head(200).await?;
                self.end(content.as_bytes()).await
            }
            Err(e) => {
                warn!("[ID{}]读取文件{}失败：{}，返回500", self.id, path, e);
                self.send(500, INTERNAL_ERROR_BODY).await
            }
        }
    }

    /// 状态行、头部块与结尾空行。没有头部时省略整个头部块。
    fn head(&self, code: u16) -> String {
        let mut head = [status_line(code).as_str(), CRLF].concat();
        if !self.headers.is_empty() {
            head.push_str(&self.header_lines());
            head.push_str(CRLF);
        }
        head.push_str(CRLF);
        head
    }

    fn header_lines(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join(CRLF)
    }

    pub(crate) fn into_connection(self) -> Connection {
        self.connection
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn reason(&self) -> &'static str {
        reason_phrase(self.status_code)
    }

    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl fmt::Display for Response {
    /// 按 `send` 的格式输出当前状态
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.head(self.status_code), self.body)
    }
}

fn status_line(code: u16) -> String {
    format!("{} {} {}", HTTP_VERSION, code, reason_phrase(code))
}

fn content_type_of(path: &str) -> Option<ContentType> {
    let extension = Path::new(path).extension()?.to_str()?;
    CONTENT_TYPES.get(extension).copied()
}
