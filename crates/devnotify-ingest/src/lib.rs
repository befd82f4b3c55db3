//! Source adapters and the event normalizer.
//!
//! Each adapter fetches or receives a source-specific payload; the
//! normalizer maps it into the canonical notification record. Adapter calls
//! carry bounded timeouts, and only transient failures are retried.

pub mod aws;
pub mod docker;
pub mod error;
pub mod github;
pub mod normalize;
pub mod payload;
pub mod retry;
