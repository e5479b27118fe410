//! Static site builder for plinth.
//!
//! Renders page templates against the merged data context, resolves web-root
//! placeholders per page depth, and copies asset trees into the output.

pub mod assets;
pub mod builder;
pub mod templates;

pub use assets::{default_assets, AssetMapping, AssetPipeline, CopyOutcome};
pub use builder::{BuildConfig, BuildError, BuildResult, StaticBuilder};
pub use templates::{PageMeta, TemplateEngine, TemplateError};
