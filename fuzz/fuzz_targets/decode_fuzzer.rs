//! Fuzz target for inbound message classification
//!
//! Anything can arrive on a window message listener; the decode path must
//! never panic and must never hand an unclassified payload downstream.
//!
//! # Invariants
//!
//! - `classify` is total over arbitrary JSON
//! - `Unrecognized` payloads expose no correlation handle
//! - Classified payloads always expose both a message ID and a subject, and
//!   the subject is a response subject

#![no_main]

use libfuzzer_sys::fuzz_target;
use transom_proto::{Incoming, classify};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };

    let incoming = classify(&value);
    match &incoming {
        Incoming::Unrecognized(_) => {
            assert!(incoming.message_id().is_none());
            assert!(incoming.subject().is_none());
        },
        Incoming::Response(_) | Incoming::Capabilities(_) => {
            assert!(incoming.message_id().is_some());
            let subject = incoming.subject().unwrap();
            assert!(subject.ends_with(".response"));
        },
    }
});
