//! Update decisions, head-branch propagation and the per-run report.

pub mod decision;
pub mod report;
pub mod session;
pub mod sync;

pub use decision::{UpdateCandidate, UpdatePolicy};
pub use session::{Session, SessionOptions};
