//! Chunked, fault-tolerant render pipeline.
//!
//! Takes a validated render request, assembles the timed image sequence,
//! voice-over track, and captions into a finished video through five
//! dependency-ordered stages, and publishes the artifact while streaming
//! progress events to the caller.

pub mod batch;
pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod progress;

pub use config::RenderConfig;
pub use context::RenderContext;
pub use error::{RenderError, RenderResult};
pub use pipeline::execute;
pub use progress::ProgressSender;
