//! Cross-window transport seam.
//!
//! One interface covers every way a message can leave the tool window:
//! parent, opener, or a named frame inside either. Implementations decide
//! how a [`FrameTarget`] resolves — including the fallback to the launch
//! window when a named frame does not exist — and the protocol layer never
//! sees the difference.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use transom_core::PostRequest;

/// Failures delivering a post.
///
/// Origin restrictions are not errors: a post whose target origin does not
/// match the receiving window is silently dropped by the browser, and
/// channel implementations mirror that.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The target window no longer exists (closed tab, torn-down frame).
    #[error("target window is gone: {reason}")]
    WindowGone {
        /// What disappeared.
        reason: String,
    },
}

/// One inbound message event, as seen by the tool window's listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEvent {
    /// Origin the message arrived from.
    pub origin: String,
    /// Raw JSON payload.
    pub data: Value,
}

/// Outbound half of the cross-window channel.
///
/// Inbound messages arrive separately on a
/// [`tokio::sync::mpsc::Receiver<WindowEvent>`] owned by the driver, so one
/// channel value can be shared by any number of posters.
#[async_trait]
pub trait CrossWindowChannel: Send + Sync {
    /// Deliver one post to its target window.
    async fn post(&self, request: PostRequest) -> Result<(), ChannelError>;
}
