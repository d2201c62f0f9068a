//! Live state feed: push subscription with polling fallback.

pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod sync;

pub use client::*;
pub use config::*;
pub use error::FeedError;
pub use feed::*;
pub use sync::*;
