//! Remote notification feed: fetch, decode and the record types it yields.

pub mod client;
pub mod model;
pub mod parser;

pub use client::{FeedClient, FeedSource};
pub use model::{FeedResponse, NotificationRecord};
pub use parser::FeedParser;
