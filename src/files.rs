//! 公共静态资源目录。`Response::send_file` 通过它读取文件内容，
//! 自身只关心逻辑路径和扩展名。

use std::io;
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use log::debug;

use crate::exception::Exception;

/// 读取到的资源内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    /// 按 UTF-8 解码后的文本
    Text(String),
    /// 原始字节
    Binary(Bytes),
}

impl FileContent {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContent::Text(text) => text.as_bytes(),
            FileContent::Binary(bytes) => bytes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublicDir {
    root: PathBuf,
}

impl PublicDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 将以 `/` 开头的逻辑路径映射到根目录下的物理路径
    fn resolve(&self, path: &str) -> Result<PathBuf, Exception> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Exception::InvalidPath);
        }
        Ok(self.root.join(relative))
    }

    /// 异步读取资源。`decode_text` 为 `true` 时按 UTF-8 解码（非法字节以替换字符代替）。
    pub async fn read(&self, path: &str, decode_text: bool) -> Result<FileContent, Exception> {
        let full_path = self.resolve(path)?;
        debug!("映射物理路径：{}", full_path.display());

        let data = tokio::fs::read(&full_path)
            .await
            .map_err(|e: io::Error| Exception::FileUnreadable(e.kind()))?;

        Ok(match decode_text {
            true => FileContent::Text(String::from_utf8_lossy(&data).into_owned()),
            false => FileContent::Binary(Bytes::from(data)),
        })
    }
}
