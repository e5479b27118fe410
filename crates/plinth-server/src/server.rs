//! Development server implementation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use plinth_static::{BuildConfig, BuildError, StaticBuilder};

use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{
    reload_client_script, reload_script_tag, ReloadHub, ReloadMessage, RELOAD_PATH,
    RELOAD_SCRIPT_PATH,
};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Build settings; the output directory is what gets served
    pub build: BuildConfig,

    /// Directories watched for changes
    pub watch: Vec<PathBuf>,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            watch: vec![PathBuf::from("src")],
            port: 9000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Shared server state.
struct ServerState {
    builder: StaticBuilder,
    hub: ReloadHub,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Build once, then serve the output and rebuild on every change.
    ///
    /// The initial build must succeed; later failures are reported to the
    /// browser console and the previous output stays in place.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::InvalidAddress(format!("{}:{}", self.config.host, self.config.port))
            })?;

        let output_dir = self.config.build.output_dir.clone();
        let build = BuildConfig {
            inject: Some(reload_script_tag()),
            ..self.config.build.clone()
        };

        let state = Arc::new(ServerState {
            builder: StaticBuilder::new(build),
            hub: ReloadHub::new(),
        });

        let result = state.builder.build().await?;
        tracing::info!("Built {} pages in {}ms", result.pages, result.duration_ms);

        let (watcher, mut rx) = FileWatcher::new(&self.config.watch)
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        let state_clone = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&state_clone, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = Router::new()
            .route(RELOAD_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(reload_script_handler))
            .fallback_service(ServeDir::new(&output_dir))
            .layer(CompressionLayer::new())
            .with_state(state);

        tracing::info!("Starting dev server at http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

/// Rebuild after a change and tell the browsers.
async fn handle_watch_event(state: &Arc<ServerState>, event: WatchEvent) {
    match &event {
        WatchEvent::DataModified(path) => tracing::info!("Data modified: {}", path.display()),
        WatchEvent::TemplateModified(path) => {
            tracing::info!("Template modified: {}", path.display())
        }
        _ => tracing::debug!("Changed: {}", event.path().display()),
    }

    match state.builder.build().await {
        Ok(result) => {
            tracing::info!("Rebuilt {} pages in {}ms", result.pages, result.duration_ms);
            state.hub.send(ReloadMessage::Reload);
        }
        Err(e) => {
            tracing::error!("Rebuild failed: {}", e);
            state.hub.send(ReloadMessage::BuildFailed {
                message: e.to_string(),
            });
        }
    }
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_json(&mut socket, &ReloadMessage::Connected).await.is_err() {
        return;
    }

    // Forward reload messages to the client
    while let Ok(msg) = rx.recv().await {
        if send_json(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_json(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), ()> {
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    socket
        .send(Message::Text(json.into()))
        .await
        .map_err(|_| ())
}

/// Handler for the reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        reload_client_script(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_server_with_default_config() {
        let server = DevServer::new(DevServerConfig::default());

        assert_eq!(server.config.port, 9000);
        assert_eq!(server.config.watch, vec![PathBuf::from("src")]);
    }

    #[tokio::test]
    async fn failed_rebuild_is_broadcast() {
        let temp = tempfile::tempdir().unwrap();
        let state = Arc::new(ServerState {
            builder: StaticBuilder::new(BuildConfig {
                pages_dir: temp.path().join("missing"),
                output_dir: temp.path().join("dist"),
                ..Default::default()
            }),
            hub: ReloadHub::new(),
        });
        let mut rx = state.hub.subscribe();

        handle_watch_event(
            &state,
            WatchEvent::Modified(temp.path().join("src/x.css")),
        )
        .await;

        match rx.try_recv() {
            Ok(ReloadMessage::BuildFailed { message }) => {
                assert!(message.contains("Pages directory not found"))
            }
            other => panic!("expected BuildFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_rebuild_triggers_reload() {
        let temp = tempfile::tempdir().unwrap();
        let pages = temp.path().join("html");
        std::fs::create_dir_all(&pages).unwrap();
        std::fs::write(pages.join("index.html"), "<body></body>").unwrap();

        let state = Arc::new(ServerState {
            builder: StaticBuilder::new(BuildConfig {
                data_dir: temp.path().join("data"),
                pages_dir: pages.clone(),
                partials_dir: temp.path().join("partials"),
                output_dir: temp.path().join("dist"),
                assets: vec![],
                inject: Some(reload_script_tag()),
                ..Default::default()
            }),
            hub: ReloadHub::new(),
        });
        let mut rx = state.hub.subscribe();

        handle_watch_event(&state, WatchEvent::TemplateModified(pages.join("index.html"))).await;

        assert_eq!(rx.try_recv().ok(), Some(ReloadMessage::Reload));
        let html = std::fs::read_to_string(temp.path().join("dist/index.html")).unwrap();
        assert!(html.contains("/__reload.js"));
    }
}
