//! Build context aggregation for plinth.
//!
//! This crate loads structured data fragments (JSON, YAML or TOML) from a
//! directory tree and merges them into one immutable context that every page
//! template is rendered against.

pub mod aggregate;
pub mod context;
pub mod fragment;

pub use aggregate::{ContextAggregator, DataError, DEFAULT_PATTERN};
pub use context::{MergePolicy, MergedContext};
pub use fragment::{DataFragment, Format, FragmentError};
