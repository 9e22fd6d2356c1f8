//! Simulated cross-window channel.
//!
//! Routes posts to a [`SimPlatform`] and queues its responses onto the
//! driver's event stream, mirroring browser delivery rules: a post whose
//! target origin does not match the receiving window's origin is dropped
//! silently, and a named frame that cannot be resolved falls back to the
//! launch window. Forged events can be injected from arbitrary origins to
//! exercise the tool's origin gating.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use transom_client::{ChannelError, CrossWindowChannel, WindowEvent};
use transom_core::PostRequest;

use crate::sim_platform::SimPlatform;

/// Event queue depth; far beyond anything a launch produces.
const EVENT_CAPACITY: usize = 64;

struct Inner {
    platform: Mutex<SimPlatform>,
    posts: Mutex<Vec<PostRequest>>,
    response_origin_override: Mutex<Option<String>>,
}

/// Channel half handed to the storage client.
#[derive(Clone)]
pub struct SimChannel {
    inner: Arc<Inner>,
    events: mpsc::Sender<WindowEvent>,
}

/// Build a channel/receiver pair around a platform.
pub fn sim_channel(platform: SimPlatform) -> (SimChannel, mpsc::Receiver<WindowEvent>) {
    let (events, receiver) = mpsc::channel(EVENT_CAPACITY);
    let inner = Inner {
        platform: Mutex::new(platform),
        posts: Mutex::new(Vec::new()),
        response_origin_override: Mutex::new(None),
    };
    (SimChannel { inner: Arc::new(inner), events }, receiver)
}

impl SimChannel {
    /// Every post delivered so far, in order.
    pub fn posts(&self) -> Vec<PostRequest> {
        self.inner.posts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Value currently stored in the platform under `key`.
    pub fn platform_stored(&self, key: &str) -> Option<String> {
        let platform = self.inner.platform.lock().unwrap_or_else(PoisonError::into_inner);
        platform.stored(key).map(str::to_owned)
    }

    /// Seed the platform store (read-path tests).
    pub fn platform_insert(&self, key: &str, value: &str) {
        let mut platform = self.inner.platform.lock().unwrap_or_else(PoisonError::into_inner);
        platform.insert(key, value);
    }

    /// Make every platform response appear to come from `origin`.
    ///
    /// Capability probes run with an unrestricted origin and still resolve;
    /// data exchanges pin the platform origin and must ignore the forgery.
    pub fn override_response_origin(&self, origin: &str) {
        let mut override_slot =
            self.inner.response_origin_override.lock().unwrap_or_else(PoisonError::into_inner);
        *override_slot = Some(origin.to_owned());
    }

    /// Inject a raw event, as a hostile window could.
    pub async fn inject(&self, origin: &str, data: Value) {
        let _ = self.events.send(WindowEvent { origin: origin.to_owned(), data }).await;
    }
}

#[async_trait]
impl CrossWindowChannel for SimChannel {
    async fn post(&self, request: PostRequest) -> Result<(), ChannelError> {
        self.inner.posts.lock().unwrap_or_else(PoisonError::into_inner).push(request.clone());

        let response = {
            let mut platform = self.inner.platform.lock().unwrap_or_else(PoisonError::into_inner);

            // The browser drops posts whose target origin doesn't match the
            // receiving window. Unanswered is indistinguishable from
            // undelivered on the tool side.
            if request.target_origin != "*" && request.target_origin != platform.origin() {
                tracing::debug!(
                    target: "transom::sim",
                    target_origin = %request.target_origin,
                    "post dropped: origin restriction"
                );
                None
            } else {
                platform.handle(&request.payload)
            }
        };

        if let Some(data) = response {
            let origin = {
                let override_slot = self
                    .inner
                    .response_origin_override
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                override_slot.clone().unwrap_or_else(|| {
                    let platform =
                        self.inner.platform.lock().unwrap_or_else(PoisonError::into_inner);
                    platform.origin().to_owned()
                })
            };
            // A dropped receiver models a closed tool window; posting into
            // it is not an error for the sender.
            let _ = self.events.send(WindowEvent { origin, data }).await;
        }

        Ok(())
    }
}
