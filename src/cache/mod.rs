//! Cache module for whitelisted static assets
//!
//! Payloads and their fetch timestamps are kept in two separate stores. The
//! [`CacheManager`] serves fresh entries without touching the network,
//! refreshes stale or missing ones from origin, and degrades to stale entries
//! when the origin is unreachable. An expiry sweep removes outdated entries on
//! activation.

mod disk;
mod manager;
mod memory;
mod policy;
mod store;

pub use disk::{default_cache_dir, DiskContentStore, DiskMetadataStore};
pub use manager::{CacheManager, CacheSource, EntryStatus, Interception, Served, SweepReport};
pub use memory::{MemoryContentStore, MemoryMetadataStore};
pub use policy::{FreshnessPolicy, DEFAULT_TTL_DAYS};
pub use store::{ContentStore, MetadataRecord, MetadataStore, Payload, StoreError};
