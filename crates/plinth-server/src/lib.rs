//! Development server for plinth sites.
//!
//! Builds the site, serves the output directory, watches the sources and
//! rebuilds on change, telling connected browsers to reload over a WebSocket.

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{ReloadHub, ReloadMessage};
