//! assetcache library
//!
//! A TTL cache for large static assets with stale fallback. The binary in
//! `main.rs` is a thin host around [`cache::CacheManager`].

pub mod cache;
pub mod cli;
pub mod config;
pub mod origin;
