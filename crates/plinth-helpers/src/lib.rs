//! Template helpers and web-root path rewriting.
//!
//! This crate provides the fixed helper vocabulary exposed to page templates
//! and the post-render pass that turns web-root placeholders into relative
//! paths based on each page's depth in the output tree.

pub mod helpers;
pub mod registry;
pub mod rewrite;

pub use helpers::{config, if_equals, limit, log, strict_equals, web_root, LOG_TARGET};
pub use registry::{Helper, HelperError, HelperVocabulary};
pub use rewrite::{page_depth, relative_root, Page, PathFormatError, PathRewriter, PLACEHOLDER};
