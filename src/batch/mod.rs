//! Concurrent batch image generation.
//!
//! [`BatchImageDispatcher`] fans a list of prompts out across a bounded
//! worker pool. Each unit independently runs the full resilience pipeline
//! (cache → rate limit → create task → poll → retry) and reports its own
//! [`crate::types::ImageResult`]; one unit failing never aborts its
//! siblings, and the batch call itself only fails if dispatch setup fails.

mod dispatcher;

pub use dispatcher::{BatchImageDispatcher, DispatcherConfig};
