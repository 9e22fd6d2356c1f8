//! Platform storage client.
//!
//! [`PlatformStorage`] pumps one [`StorageRequest`] at a time: posts go out
//! through the [`CrossWindowChannel`], inbound window events and deadline
//! wake-ups feed the state machine until it settles. One request in flight
//! per instance — the methods take `&mut self`, which is the whole
//! single-flight story; separate instances never observe each other.

use tokio::sync::mpsc;
use transom_core::{
    Environment, ExchangeConfig, Step, StorageOp, StorageRequest,
};
use transom_proto::ResponseMessage;

use crate::channel::{CrossWindowChannel, WindowEvent};
use crate::error::ClientError;

enum Wake {
    Event(Option<WindowEvent>),
    Deadline,
}

/// Client for the platform's key/value storage.
pub struct PlatformStorage<E, C> {
    env: E,
    channel: C,
    events: mpsc::Receiver<WindowEvent>,
    platform_origin: String,
    config: ExchangeConfig,
    debug: bool,
}

impl<E, C> PlatformStorage<E, C>
where
    E: Environment,
    C: CrossWindowChannel,
{
    /// Create a client pinned to a platform origin.
    ///
    /// `events` is the tool window's inbound message stream; `debug` enables
    /// the per-exchange diagnostic log.
    pub fn new(
        env: E,
        channel: C,
        events: mpsc::Receiver<WindowEvent>,
        platform_origin: impl Into<String>,
        config: ExchangeConfig,
        debug: bool,
    ) -> Self {
        Self { env, channel, events, platform_origin: platform_origin.into(), config, debug }
    }

    /// The origin responses must come from.
    pub fn platform_origin(&self) -> &str {
        &self.platform_origin
    }

    /// Store `value` under `key` in the platform window.
    ///
    /// Runs the full capability negotiation and returns the platform's
    /// response message.
    pub async fn put_data(&mut self, key: &str, value: &str) -> Result<ResponseMessage, ClientError> {
        self.run(StorageOp::Put { key: key.to_owned(), value: value.to_owned() }).await
    }

    /// Retrieve the value stored under `key`.
    ///
    /// Resolves to `None` when the platform answers without a value (nothing
    /// stored under that key).
    pub async fn get_data(&mut self, key: &str) -> Result<Option<String>, ClientError> {
        let response = self.run(StorageOp::Get { key: key.to_owned() }).await?;
        Ok(response.value)
    }

    async fn run(&mut self, op: StorageOp) -> Result<ResponseMessage, ClientError> {
        let (mut request, posts) = StorageRequest::open(
            &self.env,
            op,
            self.platform_origin.clone(),
            self.config,
            self.debug,
        );
        for post in posts {
            self.channel.post(post).await?;
        }

        loop {
            let Some(deadline) = request.next_deadline() else {
                // An unsettled request always has a pending deadline; if it
                // settled, the outcome already returned. Treat this as a
                // dead channel rather than spinning.
                return Err(ClientError::EventsClosed);
            };
            let wait = deadline.saturating_duration_since(self.env.now());

            let wake = tokio::select! {
                biased;
                event = self.events.recv() => Wake::Event(event),
                () = self.env.sleep(wait) => Wake::Deadline,
            };

            let step = match wake {
                Wake::Event(Some(event)) => {
                    request.handle_message(self.env.now(), &event.origin, &event.data)
                },
                Wake::Event(None) => return Err(ClientError::EventsClosed),
                Wake::Deadline => request.handle_tick(self.env.now()),
            };

            if let Some(response) = self.apply(step).await? {
                return Ok(response);
            }
        }
    }

    async fn apply(&self, step: Step) -> Result<Option<ResponseMessage>, ClientError> {
        for post in step.posts {
            self.channel.post(post).await?;
        }
        match step.outcome {
            Some(Ok(response)) => Ok(Some(response)),
            Some(Err(error)) => Err(error.into()),
            None => Ok(None),
        }
    }
}
