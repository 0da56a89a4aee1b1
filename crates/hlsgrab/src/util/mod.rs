pub mod http;
pub mod list;

pub use http::HttpClient;
