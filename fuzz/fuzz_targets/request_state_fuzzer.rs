//! Fuzz target for the storage request state machine
//!
//! Prevent protocol confusion via adversarial event schedules.
//!
//! # Strategy
//!
//! - Event sequences: arbitrary interleavings of platform responses,
//!   forged-origin deliveries, synthetic payloads, and clock jumps
//! - Synthetic payloads: near-miss subjects, response suffixes on request
//!   subjects, error objects, junk fields
//!
//! # Invariants
//!
//! - A request settles at most once; after settling it emits no posts and
//!   no further outcomes
//! - A settled request reports no pending deadline
//! - Only the genuine platform origin can settle a data exchange
//! - NEVER panic on any schedule

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde_json::json;
use transom_core::{Environment, ExchangeConfig, StorageOp, StorageRequest};
use transom_harness::{PlatformConfig, SimEnv, SimPlatform};

const ORIGIN: &str = "https://lms.example";
const EVIL_ORIGIN: &str = "https://evil.example";

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    /// Deliver the platform's next queued response from the real origin.
    Deliver,
    /// Deliver the platform's next queued response from a hostile origin.
    DeliverForged,
    /// Deliver a synthetic payload.
    Synthetic(SyntheticPayload),
    /// Advance the clock.
    Tick { advance_ms: u16 },
}

#[derive(Debug, Clone, Arbitrary)]
struct SyntheticPayload {
    subject: SyntheticSubject,
    message_id: Option<Vec<u8>>,
    with_error: bool,
    from_evil_origin: bool,
}

#[derive(Debug, Clone, Arbitrary)]
enum SyntheticSubject {
    PutResponse,
    GetResponse,
    CapabilitiesResponse,
    LegacyCapabilitiesResponse,
    RequestNotResponse,
    Junk(Vec<u8>),
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    seed: u64,
    do_get: bool,
    events: Vec<FuzzEvent>,
}

fn synthetic_json(payload: &SyntheticPayload) -> serde_json::Value {
    let subject = match &payload.subject {
        SyntheticSubject::PutResponse => "lti.put_data.response".to_owned(),
        SyntheticSubject::GetResponse => "lti.get_data.response".to_owned(),
        SyntheticSubject::CapabilitiesResponse => "lti.capabilities.response".to_owned(),
        SyntheticSubject::LegacyCapabilitiesResponse => {
            "org.imsglobal.lti.capabilities.response".to_owned()
        },
        SyntheticSubject::RequestNotResponse => "lti.put_data".to_owned(),
        SyntheticSubject::Junk(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    };

    let mut value = json!({ "subject": subject });
    if let Some(id_bytes) = &payload.message_id {
        value["message_id"] = json!(String::from_utf8_lossy(id_bytes).into_owned());
    }
    if payload.with_error {
        value["error"] = json!({"code": "denied", "message": "denied"});
    }
    value
}

fuzz_target!(|input: FuzzInput| {
    let env = SimEnv::new(input.seed);
    let mut platform = SimPlatform::new(PlatformConfig::modern(ORIGIN));

    let op = if input.do_get {
        StorageOp::Get { key: "lti_state_s".to_owned() }
    } else {
        StorageOp::Put { key: "lti_state_s".to_owned(), value: "s".to_owned() }
    };
    let (mut request, posts) =
        StorageRequest::open(&env, op, ORIGIN, ExchangeConfig::default(), false);

    let mut queue: Vec<serde_json::Value> =
        posts.iter().filter_map(|post| platform.handle(&post.payload)).collect();
    let mut now = env.now();
    let mut outcomes = 0usize;

    for event in input.events {
        let was_settled = request.is_settled();

        let step = match event {
            FuzzEvent::Deliver => {
                if queue.is_empty() {
                    continue;
                }
                let payload = queue.remove(0);
                request.handle_message(now, ORIGIN, &payload)
            },
            FuzzEvent::DeliverForged => {
                if queue.is_empty() {
                    continue;
                }
                let payload = queue.remove(0);
                request.handle_message(now, EVIL_ORIGIN, &payload)
            },
            FuzzEvent::Synthetic(payload) => {
                let origin = if payload.from_evil_origin { EVIL_ORIGIN } else { ORIGIN };
                request.handle_message(now, origin, &synthetic_json(&payload))
            },
            FuzzEvent::Tick { advance_ms } => {
                now += Duration::from_millis(u64::from(advance_ms));
                request.handle_tick(now)
            },
        };

        if was_settled {
            assert!(step.posts.is_empty(), "settled request emitted a post");
            assert!(step.outcome.is_none(), "settled request emitted an outcome");
        }

        for post in &step.posts {
            if let Some(response) = platform.handle(&post.payload) {
                queue.push(response);
            }
        }
        if step.outcome.is_some() {
            outcomes += 1;
        }
    }

    assert!(outcomes <= 1, "request settled {outcomes} times");
    if request.is_settled() {
        assert!(request.next_deadline().is_none());
    }
});
