pub mod adapter;
pub mod api;
pub mod paginator;
pub mod pushshift;
pub mod rate_limiter;
pub mod synthetic;


pub use adapter::{Page, PageCursor, SourceAdapter, SourceRegistry};
pub use api::RedditJsonClient;
pub use paginator::Paginator;
pub use pushshift::PushshiftClient;
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use synthetic::SyntheticGenerator;
