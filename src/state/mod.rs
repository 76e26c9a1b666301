//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TargetState`: The lifecycle of one queued URL (pending, active, retry-pending, completed, failed)
//! - `Pacer`: Politeness delay and retry backoff between dispatches

mod pacer;
mod target_state;

// Re-export main types
pub use pacer::Pacer;
pub use target_state::TargetState;
