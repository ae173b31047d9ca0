//! Result cache
//!
//! Stores previously produced result sequences of one pipeline, keyed by the
//! fingerprint of the bound parameter values. Entries move from fresh to
//! expired (time span) or exhausted (hit limit) and are replaced by the
//! caller's next insert or swept by `purge_stale`.

mod cache;
mod clock;
mod policy;

pub use cache::{CacheStats, EntryInfo, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use policy::{CachePolicy, EntryState};
