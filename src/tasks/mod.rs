//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache.
//!
//! # Tasks
//! - Expiration sweep: removes expired cache entries at configured intervals

mod sweeper;

pub use sweeper::Sweeper;
