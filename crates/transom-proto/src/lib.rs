//! Wire protocol for LTI platform storage over window messaging.
//!
//! Tools launched inside an LMS iframe cannot reach first-party storage when
//! third-party cookies are blocked. The LTI platform-storage protocol lets
//! the tool ask the platform window to hold small key/value pairs instead,
//! using JSON window messages as the only channel. This crate defines that
//! wire surface:
//!
//! - [`Subject`]: the operations a platform may support, in both the current
//!   (`lti.*`) and legacy (`org.imsglobal.lti.*`) namespaces
//! - [`RequestMessage`] / [`ResponseMessage`]: the request/response pairs,
//!   correlated by [`MessageId`]
//! - [`CapabilityList`]: what a platform advertises in response to a
//!   capabilities query
//! - [`classify`]: tagged decode of inbound messages into
//!   [`Incoming::Response`], [`Incoming::Capabilities`], or
//!   [`Incoming::Unrecognized`] before any dispatch
//!
//! All types are pure data: entropy for message IDs is supplied by the
//! caller, and nothing here performs I/O.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod decode;
mod message;
mod subject;

pub use decode::{CapabilityResponse, Incoming, UnrecognizedReason, classify};
pub use message::{
    CapabilityDescriptor, CapabilityList, ErrorInfo, MESSAGE_ID_ENTROPY_LEN, MessageId,
    RequestMessage, ResponseMessage,
};
pub use subject::{LEGACY_PREFIX, RESPONSE_SUFFIX, Subject, response_subject};
