//! Network transports implementing [`Connection`](crate::channel::Connection)

mod http;

pub use http::HttpConnection;
