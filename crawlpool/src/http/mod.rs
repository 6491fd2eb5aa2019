//! Request/response envelopes and the transport that connects them.

mod fetcher;
mod request;
mod response;

pub use fetcher::{FetchResult, Fetcher, ReqwestFetcher};
pub use request::Request;
pub use response::{DefaultResponseFactory, Response, ResponseFactory};
