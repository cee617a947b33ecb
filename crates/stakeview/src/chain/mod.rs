//! Upstream access: wire shapes, HTTP fetching, per-block caching, clock.

pub mod cache;
pub mod clock;
pub mod fetch;
pub mod memory;
pub mod raw;

pub use cache::{CachePolicy, CacheView, PerBlockCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use fetch::{FetchConfig, FetchError, HttpUpstream, Upstream};
pub use memory::MemoryUpstream;
