//! Async client for LTI platform storage and launch bootstrap.
//!
//! This crate wires the sans-IO state machines of `transom-core` to the
//! world:
//!
//! ```text
//! transom-client
//!   ├─ CrossWindowChannel   (transport seam: parent / opener / named frame)
//!   ├─ PlatformStorage      (put_data / get_data over the channel)
//!   ├─ ToolLogin            (OIDC bootstrap: storage → cookies → redirect)
//!   ├─ HostPage             (cookies, local storage, form submission)
//!   └─ SystemEnv            (production time + RNG)
//! ```
//!
//! The embedding supplies a channel implementation and a host page; both
//! are trait objects over things only the page can reach. Everything else —
//! capability negotiation, correlation, timeouts, fallback — lives here and
//! in `transom-core`, fully testable against the simulated platform in
//! `transom-harness`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod channel;
mod error;
mod host;
mod login;
mod sequencer;
mod storage;
mod system_env;

pub use channel::{ChannelError, CrossWindowChannel, WindowEvent};
pub use error::ClientError;
pub use host::{Cookie, FALLBACK_COOKIE_TTL, HostPage};
pub use login::{
    COOKIE_PREFIX, LoginContext, OIDC_FIXED_PARAMS, RedirectForm, RedirectTarget, nonce_key,
    state_key,
};
pub use sequencer::{SequencerState, ToolLogin};
pub use storage::PlatformStorage;
pub use system_env::SystemEnv;
pub use transom_core::{Environment, ExchangeConfig};
