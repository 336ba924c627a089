//! Background Tasks Module
//!
//! Contains the periodic background work shared by every long-lived component.
//!
//! # Tasks
//! - Cache sweep: reclaims expired TTL cache entries
//! - Rate limit cleanup: drops idle rate limit entries
//! - Memory sampling: feeds the resource watchdog

mod ticker;

pub use ticker::spawn_ticker;
