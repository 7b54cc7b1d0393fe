//! State module for tracking crawl outcomes
//!
//! # Components
//!
//! - `PageStatus`: the final outcome of a recorded page (completed, failed, skipped)
//! - `SessionStatus`: the lifecycle of a crawl session (running, completed, interrupted)

mod page_status;
mod session_status;

// Re-export main types
pub use page_status::PageStatus;
pub use session_status::SessionStatus;
