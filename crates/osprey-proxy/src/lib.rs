pub mod cache;
pub mod classify;
pub mod server;
pub mod strategy;

pub use cache::{CacheNamespace, CachedResponse};
pub use classify::{classify, ResourceClass};
pub use server::{create_router, run, ProxyState};
pub use strategy::{HttpUpstream, Upstream};
