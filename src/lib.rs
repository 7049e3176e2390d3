/// Modlytics - Moderation analytics core for a hackathon platform
///
/// Pure computation engines for the moderation console: trust scoring from
/// behavioral counters, rate-spike and suspicious-pattern detection over an
/// activity stream, referential-integrity checking with a backup-then-delete
/// cleanup workflow, and field-level audit diffing. All engines are invoked
/// in-process; only the integrity checker's cleanup path mutates storage.
pub mod activity;
pub mod anomaly;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod id;
pub mod integrity;
pub mod patterns;
pub mod trust;

pub use error::{ModError, ModResult};
