// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Fan site
//!
//! 基于 miniweb 的演示站点：加载日志与运行配置，注册页面、样式与图片路由，
//! 然后在配置的地址上监听连接。

use log::info;
use tokio::runtime::{Builder, Runtime};

use miniweb::{App, Config, Exception, PublicDir};

/// `/randomImage` 随机返回的图片
const RANDOM_IMAGES: [&str; 3] = ["/img/image1.jpg", "/img/image2.png", "/img/image3.gif"];

fn main() -> Result<(), Exception> {
    // 1. 初始化日志系统：log4rs 通过外部 YAML 配置级别与输出目的地
    log4rs::init_file("config/log4rs.yaml", Default::default())
        .map_err(|_| Exception::LoggerInitFailed)?;

    // 2. 环境配置加载：从 TOML 文件读取运行参数
    let config = Config::from_toml("config/development.toml")?;
    info!("配置文件已载入");
    info!("public root: {}", config.public_root());

    // 3. 异步运行时：默认单线程事件循环，配置多于一个工作线程时改用多线程调度
    let runtime = build_runtime(config.worker_threads())?;

    let mut app = fansite(PublicDir::new(config.public_root()));
    app.set_read_buffer_size(config.read_buffer_size());

    runtime.block_on(app.listen(config.host(), config.port()))
}

fn build_runtime(worker_threads: usize) -> Result<Runtime, Exception> {
    let runtime = match worker_threads {
        1 => Builder::new_current_thread().enable_all().build(),
        n => Builder::new_multi_thread()
            .worker_threads(n)
            .enable_all()
            .build(),
    };
    info!("工作线程数: {}", worker_threads);
    runtime.map_err(|_| Exception::RuntimeBuildFailed)
}

fn fansite(public: PublicDir) -> App {
    let mut app = App::new(public);

    app.get("/", |_req, res| Box::pin(async move { res.send_file("/html/index.html").await }));
    app.get("/home", |_req, res| {
        Box::pin(async move { res.redirect_with_status(301, "http://localhost:8080/").await })
    });
    app.get("/about", |_req, res| Box::pin(async move { res.send_file("/html/about.html").await }));
    app.get("/rando", |_req, res| Box::pin(async move { res.send_file("/html/rando.html").await }));

    app.get("/randomImage", |_req, res| {
        let path = RANDOM_IMAGES[fastrand::usize(..RANDOM_IMAGES.len())];
        Box::pin(async move { res.send_file(path).await })
    });

    app.get("/css/base.css", |_req, res| Box::pin(async move { res.send_file("/css/base.css").await }));
    app.get("/image1.jpg", |_req, res| Box::pin(async move { res.send_file("/img/image1.jpg").await }));
    app.get("/image2.png", |_req, res| Box::pin(async move { res.send_file("/img/image2.png").await }));
    app.get("/image3.gif", |_req, res| Box::pin(async move { res.send_file("/img/image3.gif").await }));

    app
}
