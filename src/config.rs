use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::{exception::Exception, param::DEFAULT_READ_BUFFER_SIZE};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_public_root")]
    public_root: String,
    #[serde(default = "default_worker_threads")]
    worker_threads: usize,
    #[serde(default = "default_read_buffer_size")]
    read_buffer_size: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_public_root() -> String {
    "public".to_string()
}

fn default_worker_threads() -> usize {
    1 // 单线程事件循环
}

fn default_read_buffer_size() -> usize {
    DEFAULT_READ_BUFFER_SIZE
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_root: default_public_root(),
            worker_threads: default_worker_threads(),
            read_buffer_size: default_read_buffer_size(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                error!("无法打开配置文件{}：{}", filename, e);
                return Err(Exception::ConfigUnreadable);
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            error!("读取配置文件{}失败：{}", filename, e);
            return Err(Exception::ConfigUnreadable);
        }
        Ok(Self::from_str_or_default(&str_val))
    }

    /// 解析失败时记录错误并退回默认配置
    fn from_str_or_default(str_val: &str) -> Self {
        let mut raw_config: Config = match toml::from_str(str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.read_buffer_size == 0 {
            warn!(
                "read_buffer_size被设置为0，该值将被改为{}。",
                DEFAULT_READ_BUFFER_SIZE
            );
            raw_config.read_buffer_size = DEFAULT_READ_BUFFER_SIZE;
        }
        raw_config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn public_root(&self) -> &str {
        &self.public_root
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn read_buffer_size(&self) -> usize {
        self.read_buffer_size
    }
}
