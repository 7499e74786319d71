// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由与连接处理模块
//!
//! `App` 持有路径到处理器的路由表，并负责每条连接的完整生命周期：
//! 1. 读取报文并解析为 `Request`，为其创建绑定到连接写端的 `Response`。
//! 2. 校验 `Host` 头部，缺失时返回 400。
//! 3. 归一化路径（去掉一个结尾的 `/`，根路径除外）并查找处理器，找不到时返回 404。
//! 4. 对端关闭连接后，按每个响应的最终状态记录访问日志。
//!
//! 路由表只在启动前构建，之后只读，通过 `Arc<App>` 在各连接任务间共享。

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite},
    net::TcpListener,
};

use crate::{
    exception::Exception,
    files::PublicDir,
    param::{reason_phrase, BAD_REQUEST_BODY, DEFAULT_READ_BUFFER_SIZE, NOT_FOUND_BODY},
    request::Request,
    response::{Connection, Response},
};

/// 处理器返回的 future，借用当前的请求与响应
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>;

/// 路由表中的处理器。
///
/// 处理器获得请求的只读引用和响应的独占引用，负责之后全部的响应行为，
/// 通常以一个终止操作结束。
pub trait Handler: Send + Sync {
    fn handle<'a>(&'a self, request: &'a Request, response: &'a mut Response) -> HandlerFuture<'a>;
}

impl<F> Handler for F
where
    F: for<'a> Fn(&'a Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync,
{
    fn handle<'a>(&'a self, request: &'a Request, response: &'a mut Response) -> HandlerFuture<'a> {
        self(request, response)
    }
}

/// 连接关闭时需要记录的一次请求/响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    method: String,
    path: String,
    status_code: u16,
}

impl Exchange {
    fn new(request: &Request, response: &Response) -> Self {
        Self {
            method: request.method().to_string(),
            path: request.path().to_string(),
            status_code: response.status_code(),
        }
    }

    /// 访问日志中的一行，状态码与原因短语取自响应的最终状态
    pub fn log_line(&self, id: u128) -> String {
        format!(
            "[ID{}] {} {}, {} {}",
            id,
            self.method,
            self.path,
            self.status_code,
            reason_phrase(self.status_code),
        )
    }
}

pub struct App {
    routes: HashMap<String, Box<dyn Handler>>,
    files: Arc<PublicDir>,
    read_buffer_size: usize,
}

impl App {
    pub fn new(public: PublicDir) -> Self {
        Self {
            routes: HashMap::new(),
            files: Arc::new(public),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// 单次读取的缓冲区大小，一次读取的内容被当作一条完整报文
    pub fn set_read_buffer_size(&mut self, size: usize) {
        self.read_buffer_size = size.max(1);
    }

    /// 为 `path` 注册一个闭包处理器：
    ///
    /// ```ignore
    /// app.get("/", |_req, res| Box::pin(async move { res.send(200, "hello").await }));
    /// ```
    pub fn get<F>(&mut self, path: &str, handler: F)
    where
        F: for<'a> Fn(&'a Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
    {
        self.route(path, handler);
    }

    /// 为 `path` 注册任意实现了 `Handler` 的处理器。重复注册时后者覆盖前者。
    pub fn route<H: Handler + 'static>(&mut self, path: &str, handler: H) {
        if self.routes.insert(path.to_string(), Box::new(handler)).is_some() {
            warn!("路由{}被重复注册，以最后一次注册为准", path);
        }
    }

    pub fn has_route(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    /// 绑定 `host:port` 并开始接受连接。
    pub async fn listen(self, host: &str, port: u16) -> Result<(), Exception> {
        let listener = match TcpListener::bind((host, port)).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("无法绑定{}:{}，错误：{}", host, port, e);
                return Err(Exception::BindFailed(e.kind()));
            }
        };
        info!("服务端在{}:{}上监听Socket连接", host, port);
        Arc::new(self).serve(listener).await;
        Ok(())
    }

    /// 主事件循环：每条连接交给一个独立的 Tokio 任务处理。
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        let mut id: u128 = 0;
        loop {
            let (stream, addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("接受TCP连接时遇到错误: {}", e);
                    continue;
                }
            };
            debug!("[ID{}]TCP连接已建立：{}", id, addr);

            let app = Arc::clone(&self);
            tokio::spawn(async move {
                app.handle_connection(stream, id).await;
            });
            id += 1;
        }
    }

    /// 处理一条连接，直到对端关闭，然后为每条报文记录一行访问日志。
    pub async fn handle_connection<S>(&self, stream: S, id: u128)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let exchanges = self.exchange(stream, id).await;
        debug!("[ID{}]连接已关闭", id);
        for exchange in &exchanges {
            info!("{}", exchange.log_line(id));
        }
    }

    /// 读取并分发报文，直到对端关闭连接。
    ///
    /// 每次读取到的数据都被当作一条独立报文，配一个新的 `Response`。
    /// 某个响应结束并关闭写端之后，后续数据只会被读出丢弃，不再分发也不再记录。
    pub async fn exchange<S>(&self, stream: S, id: u128) -> Vec<Exchange>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (mut reader, writer) = tokio::io::split(stream);
        let mut connection: Connection = Box::new(writer);
        let mut exchanges = Vec::new();
        let mut buffer = vec![0u8; self.read_buffer_size];
        let mut write_closed = false;

        loop {
            let n = match reader.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    error!("[ID{}]读取连接时遇到错误: {}", id, e);
                    break;
                }
            };
            if write_closed {
                debug!("[ID{}]写端已关闭，丢弃{}字节的报文", id, n);
                continue;
            }
            debug!("[ID{}]收到{}字节的报文", id, n);

            let request = Request::from(&buffer[..n]);
            let mut response = Response::new(connection, Arc::clone(&self.files), id);
            if let Err(e) = self.dispatch(&request, &mut response, id).await {
                error!("[ID{}]写入响应时遇到错误: {}", id, e);
            }
            exchanges.push(Exchange::new(&request, &response));
            write_closed = response.is_finished();
            connection = response.into_connection();
        }
        exchanges
    }

    /// 校验、归一化并分发一条请求。
    pub async fn dispatch(
        &self,
        request: &Request,
        response: &mut Response,
        id: u128,
    ) -> io::Result<()> {
        // 头部名称区分大小写，`host` 不被接受
        if request.header("Host").is_none() {
            warn!("[ID{}]请求缺少Host头部，返回400", id);
            return response.send(400, BAD_REQUEST_BODY).await;
        }

        let path = normalize_path(request.path());
        match self.routes.get(path) {
            Some(handler) => {
                debug!("[ID{}]路由匹配成功：{}", id, path);
                handler.handle(request, response).await
            }
            None => {
                warn!("[ID{}]请求的路径：{} 没有注册，返回404", id, path);
                response.send(404, NOT_FOUND_BODY).await
            }
        }
    }
}

/// 去掉一个结尾的 `/`，根路径 `/` 保持不变
pub fn normalize_path(path: &str) -> &str {
    match path {
        "/" => path,
        _ => path.strip_suffix('/').unwrap_or(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::AsyncWriteExt;

    async fn roundtrip(app: &Arc<App>, raw: &[u8]) -> Vec<u8> {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn({
            let app = Arc::clone(app);
            async move { app.handle_connection(server, 0).await }
        });

        client.write_all(raw).await.unwrap();
        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        drop(client);
        task.await.unwrap();
        output
    }

    fn app_with_root() -> App {
        let mut app = App::new(PublicDir::new("public"));
        app.get("/", |_req, res| Box::pin(async move { res.send(200, "X").await }));
        app
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/about/"), "/about");
        assert_eq!(normalize_path("/about"), "/about");
        assert_eq!(normalize_path("/about//"), "/about/");
        assert_eq!(normalize_path("//"), "/");
        assert_eq!(normalize_path(""), "");
    }

    #[tokio::test]
    async fn test_end_to_end_root() {
        let app = Arc::new(app_with_root());

        let output = roundtrip(&app, b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert_eq!(output, b"HTTP/1.1 200 OK\r\n\r\nX");
    }

    #[tokio::test]
    async fn test_missing_host_is_rejected_before_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut app = App::new(PublicDir::new("public"));
        let counter = Arc::clone(&calls);
        app.get("/", move |_req, res| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { res.send(200, "X").await })
        });
        let app = Arc::new(app);

        let output = roundtrip(&app, b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n").await;

        assert_eq!(output, b"HTTP/1.1 400 Bad Request\r\n\r\n400 Bad Request");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lowercase_host_is_not_accepted() {
        let app = Arc::new(app_with_root());

        let output = roundtrip(&app, b"GET / HTTP/1.1\r\nhost: localhost\r\n\r\n").await;

        assert_eq!(output, b"HTTP/1.1 400 Bad Request\r\n\r\n400 Bad Request");
    }

    #[tokio::test]
    async fn test_trailing_slash_reaches_same_handler() {
        let mut app = app_with_root();
        app.get("/about", |_req, res| Box::pin(async move { res.send(200, "about").await }));
        let app = Arc::new(app);

        let with_slash = roundtrip(&app, b"GET /about/ HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        let without = roundtrip(&app, b"GET /about HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert_eq!(with_slash, b"HTTP/1.1 200 OK\r\n\r\nabout");
        assert_eq!(with_slash, without);
    }

    #[tokio::test]
    async fn test_unregistered_path_is_404() {
        let app = Arc::new(app_with_root());

        let output = roundtrip(&app, b"GET /nowhere HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert_eq!(output, b"HTTP/1.1 404 Not Found\r\n\r\n404 Page Not Found");
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut app = app_with_root();
        app.get("/", |_req, res| Box::pin(async move { res.send(200, "second").await }));
        let app = Arc::new(app);

        let output = roundtrip(&app, b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert_eq!(output, b"HTTP/1.1 200 OK\r\n\r\nsecond");
    }

    struct Echo;

    impl Handler for Echo {
        fn handle<'a>(&'a self, request: &'a Request, response: &'a mut Response) -> HandlerFuture<'a> {
            Box::pin(async move {
                response.set_header("X-Method", request.method());
                response.send(200, request.body()).await
            })
        }
    }

    #[tokio::test]
    async fn test_struct_handler() {
        let mut app = App::new(PublicDir::new("public"));
        app.route("/echo", Echo);
        assert!(app.has_route("/echo"));
        let app = Arc::new(app);

        let output = roundtrip(
            &app,
            b"POST /echo HTTP/1.1\r\nHost: localhost\r\n\r\nline one\r\nline two",
        )
        .await;

        assert_eq!(output, b"HTTP/1.1 200 OK\r\nX-Method: POST\r\n\r\nline oneline two");
    }

    #[tokio::test]
    async fn test_repeated_requests_are_identical() {
        let mut app = app_with_root();
        app.get("/redirect", |_req, res| {
            Box::pin(async move { res.redirect("http://localhost:8080/").await })
        });
        let app = Arc::new(app);
        let raw = b"GET /redirect HTTP/1.1\r\nHost: localhost\r\n\r\n";

        let first = roundtrip(&app, raw).await;
        let second = roundtrip(&app, raw).await;

        assert_eq!(
            first,
            b"HTTP/1.1 301 Moved Permanently\r\nLocation: http://localhost:8080/\r\n\r\n"
        );
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_peer_closing_without_request() {
        let app = Arc::new(app_with_root());
        let (client, server) = tokio::io::duplex(1024);
        drop(client);

        app.handle_connection(server, 0).await;
    }

    #[test]
    fn test_log_line_keeps_request_path() {
        let exchange = Exchange {
            method: "GET".to_string(),
            path: "/about/".to_string(),
            status_code: 302,
        };

        assert_eq!(exchange.log_line(3), "[ID3] GET /about/, 302 Found");
    }

    #[tokio::test]
    async fn test_exchange_is_recorded_after_peer_closes() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("html")).unwrap();
        std::fs::write(tmp.path().join("html/index.html"), "<p>index</p>").unwrap();
        let mut app = App::new(PublicDir::new(tmp.path()));
        app.get("/", |_req, res| Box::pin(async move { res.send_file("/html/index.html").await }));
        let app = Arc::new(app);

        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn({
            let app = Arc::clone(&app);
            async move { app.exchange(server, 7).await }
        });

        client.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        assert_eq!(
            output,
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=UTF-8\r\n\r\n<p>index</p>"
        );

        // 响应已写完，但对端尚未关闭，记录还不能产生
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        drop(client);
        let lines: Vec<String> = task.await.unwrap().iter().map(|e| e.log_line(7)).collect();
        assert_eq!(lines, vec!["[ID7] GET / 200 OK"]);
    }

    #[tokio::test]
    async fn test_one_record_per_message() {
        let mut app = App::new(PublicDir::new("public"));
        app.get("/partial", |_req, res| {
            Box::pin(async move {
                res.write_head(200).await?;
                res.write(b"chunk").await
            })
        });
        let app = Arc::new(app);

        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn({
            let app = Arc::clone(&app);
            async move { app.exchange(server, 0).await }
        });

        client.write_all(b"GET /partial HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        let mut partial = [0u8; 24];
        client.read_exact(&mut partial).await.unwrap();
        assert_eq!(&partial, b"HTTP/1.1 200 OK\r\n\r\nchunk");

        client.write_all(b"GET /nowhere HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"HTTP/1.1 404 Not Found\r\n\r\n404 Page Not Found");

        // 写端关闭之后的报文只被丢弃
        client.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();
        drop(client);

        let lines: Vec<String> = task.await.unwrap().iter().map(|e| e.log_line(0)).collect();
        assert_eq!(
            lines,
            vec!["[ID0] GET /partial 200 OK", "[ID0] GET /nowhere 404 Not Found"]
        );
    }
}
