pub mod app;
pub mod config;
pub mod exception;
pub mod files;
pub mod param;
pub mod request;
pub mod response;

pub use app::{App, Handler, HandlerFuture};
pub use config::Config;
pub use exception::Exception;
pub use files::{FileContent, PublicDir};
pub use request::Request;
pub use response::Response;
