//! Interceptors run by workers before each processing stage.

mod chain;
mod logging;

pub use chain::{Interceptor, InterceptorChain, RequestFn, ResponseFn};
pub use logging::LoggingInterceptor;
