//! Title icon cache.
//!
//! Icons are looked up in three tiers: an in-process map, a directory of
//! `<titleid>.png` files and finally a remote [`IconSource`]. Only the last
//! one is slow, and it never runs on the caller's task: see [`IconCache`].

mod cache;
pub mod error;
mod prefetch;
pub mod source;
pub mod validate;

pub use crate::cache::{IconBytes, IconCache, IconEvent, IconEvents, Lookup, Options, Outcome};
pub use crate::prefetch::{PrefetchEvent, PrefetchProgress};
pub use crate::source::{HttpSource, IconSource, SourceHandle};
