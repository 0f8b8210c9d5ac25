//! Recover deleted Imgur media from Wayback Machine captures.
//!
//! The pipeline resolves a short Imgur identifier against the Wayback CDX
//! index, probing file extensions in a configurable order, then streams the
//! first capture found into a local downloads directory under a collision-safe
//! name. Batches of identifiers run strictly one at a time with a cooldown
//! between items, collecting failures for an opt-in retry pass. Cancellation
//! is cooperative: one token per run, checked at every suspension point.

pub mod batch;
pub mod cancel;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod extract;
pub mod log_sink;
pub mod pipeline;
pub mod resolver;
