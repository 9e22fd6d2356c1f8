//! Sans-IO core of the platform-storage negotiator.
//!
//! Everything here is a pure state machine: inbound window messages and
//! clock ticks go in, posts and settled outcomes come out. No I/O, no
//! timers, no listeners — a driver (see `transom-client`) owns those, and a
//! simulation (see `transom-harness`) can replay any schedule exactly.
//!
//! # Components
//!
//! - [`Exchange`]: one request/response pair, correlated by message ID,
//!   subject, and origin, with a deadline
//! - [`CapabilityProbe`]: the dual-subject capabilities race
//! - [`StorageRequest`]: a put/get carried through probe, subject rewrite,
//!   and the data exchange
//! - [`ExchangeLog`]: per-exchange diagnostic buffer, debug-gated
//! - [`Environment`]: time and entropy abstraction

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
mod error;
mod exchange;
mod log;
mod probe;
mod request;

pub use env::Environment;
pub use error::ProtocolError;
pub use exchange::{
    DEFAULT_RESPONSE_TIMEOUT, Disposition, Exchange, ExchangeConfig, FrameTarget, IgnoreReason,
    OriginPolicy, PostRequest, ResponsePayload,
};
pub use log::{ExchangeLog, LogOutcome};
pub use probe::CapabilityProbe;
pub use request::{Step, StorageOp, StorageRequest};
