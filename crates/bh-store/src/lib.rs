//! Persistence layer for the BlackHole engine: `.bhex` artifact files
//! and the two JSON feedback stores, plus the `Session` facade that
//! wires them to `bh-core`.

pub mod artifact;
pub mod error;
pub mod feedback_store;
pub mod session;

pub use artifact::{load_artifact, save_artifact};
pub use error::{Result, StoreError};
pub use feedback_store::{FeedbackStore, JsonFeedbackStore, MemoryFeedbackStore};
pub use session::Session;
