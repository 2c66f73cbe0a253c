//! Source registry module.
//!
//! Plugins are registered once while the application is being built and are
//! looked up by SourceId afterwards.

mod source_registry;

pub use source_registry::SourceRegistry;
