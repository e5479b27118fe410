//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Path of the reload WebSocket endpoint.
pub const RELOAD_PATH: &str = "/__reload";

/// Path the client script is served from.
pub const RELOAD_SCRIPT_PATH: &str = "/__reload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// A rebuild finished; reload the page
    Reload,

    /// A rebuild failed; the previous output is still served
    BuildFailed {
        /// Error reported by the builder
        message: String,
    },

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new reload hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(msg);
    }

    /// Subscribe to reload messages.
    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Markup injected into every page built by the dev server.
pub fn reload_script_tag() -> String {
    format!(r#"<script src="{RELOAD_SCRIPT_PATH}"></script>"#)
}

/// Generate the client-side reload script.
///
/// Connects back to whichever host served the page, so it works on any port.
pub fn reload_client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(proto + location.host + '{}');

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'build_failed':
        console.error('[plinth] Build failed:', msg.message);
        break;

      case 'connected':
        console.log('[plinth] Live reload connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[plinth] Disconnected, retrying...');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#,
        RELOAD_PATH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hub_broadcasts_messages() {
        let hub = ReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        match rx.try_recv() {
            Ok(ReloadMessage::Reload) => {}
            _ => panic!("Expected Reload message"),
        }
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn serializes_messages() {
        let msg = ReloadMessage::BuildFailed {
            message: "bad template".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("build_failed"));
        assert!(json.contains("bad template"));
    }

    #[test]
    fn script_targets_reload_endpoint() {
        let script = reload_client_script();

        assert!(script.contains("'/__reload'"));
        assert!(reload_script_tag().contains("/__reload.js"));
    }
}
