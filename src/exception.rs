// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 定义了请求处理之外、需要上报给调用方的失败情况：静态资源读取、
//! 配置加载以及进程启动阶段。单个请求内的错误不经过这里，
//! 而是直接转换成 400/404/500 响应。

use std::fmt;
use std::io;

/// 服务器在资源读取或启动过程中遇到的异常。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 资源路径包含 `..` 等试图离开公共目录的片段。
    InvalidPath,
    /// 资源文件无法读取（不存在、无权限等），携带底层 I/O 错误类型。
    FileUnreadable(io::ErrorKind),
    /// 配置文件不存在或无法读取。
    ConfigUnreadable,
    /// 无法按照 log4rs 配置文件初始化日志系统。
    LoggerInitFailed,
    /// 无法构建 Tokio 运行时。
    RuntimeBuildFailed,
    /// 无法绑定监听地址，携带底层 I/O 错误类型。
    BindFailed(io::ErrorKind),
}

use Exception::*;

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidPath => write!(f, "Invalid resource path"),
            FileUnreadable(kind) => write!(f, "Resource can't be read: {}", kind),
            ConfigUnreadable => write!(f, "Config file can't be read"),
            LoggerInitFailed => write!(f, "Couldn't initialize logger"),
            RuntimeBuildFailed => write!(f, "Couldn't build async runtime"),
            BindFailed(kind) => write!(f, "Couldn't bind listener: {}", kind),
        }
    }
}

impl std::error::Error for Exception {}
