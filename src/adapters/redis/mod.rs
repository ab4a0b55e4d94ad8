//! Redis adapters - shared cache for multi-server deployments.

mod resolve_cache;

pub use resolve_cache::RedisResolveCache;
