//! Source plugin abstractions and implementations.
//!
//! This module contains:
//! - The `SourcePlugin` trait that all sources implement
//! - Built-in sources (AMFI)
//!
//! Sources are opaque to the engine: it only calls `list_tickers` and `fetch`
//! and never inspects how a source talks to its upstream.

mod traits;

pub mod amfi;

pub use traits::SourcePlugin;
