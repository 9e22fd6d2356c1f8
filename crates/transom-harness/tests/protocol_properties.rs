//! Property-based tests for the negotiation protocol.
//!
//! Three families of properties:
//!
//! - Classifier totality: arbitrary JSON never panics the decode path, and
//!   nothing an adversary can synthesize (short of guessing 15 bytes of
//!   entropy) settles someone else's exchange.
//! - Settle-once: a storage request settles at most once under arbitrary
//!   interleavings of deliveries, forgeries, garbage, and clock jumps.
//! - Model equivalence: put/get sequences through the full client stack
//!   agree with a plain map, and reruns with the same seed are identical.

use std::collections::HashMap;
use std::time::Duration;

use proptest::prelude::*;
use serde_json::Value;
use transom_client::{ExchangeConfig, PlatformStorage};
use transom_core::{Environment, StorageOp, StorageRequest};
use transom_harness::{PlatformConfig, SimEnv, SimPlatform, sim_channel};
use transom_proto::{Incoming, classify};

const ORIGIN: &str = "https://lms.example";

fn json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| serde_json::json!(n)),
        "[a-zA-Z0-9._-]{0,24}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::hash_map("[a-z_]{1,12}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

#[test]
fn prop_classifier_is_total_and_unsettleable_by_noise() {
    proptest!(|(payload in json_strategy())| {
        // Totality: classification never panics, whatever arrives.
        let incoming = classify(&payload);

        // An Unrecognized payload carries no correlation handle at all.
        if let Incoming::Unrecognized(_) = &incoming {
            prop_assert!(incoming.message_id().is_none());
        }

        // Nothing generated here can settle a fresh request: its message
        // IDs are 20 base64url characters behind a "message-" prefix, out
        // of range of the generator (and of any guesser).
        let env = SimEnv::new(0);
        let (mut request, _posts) = StorageRequest::open(
            &env,
            StorageOp::Put { key: "k".to_owned(), value: "v".to_owned() },
            ORIGIN,
            ExchangeConfig::default(),
            false,
        );
        let step = request.handle_message(env.now(), ORIGIN, &payload);
        prop_assert!(step.outcome.is_none());
        prop_assert!(step.posts.is_empty());
    });
}

/// One scheduled thing that can happen to an in-flight request.
#[derive(Debug, Clone)]
enum ScheduleOp {
    /// Deliver the platform's next queued response, from the real origin.
    Deliver,
    /// Deliver the platform's next queued response, from a hostile origin.
    DeliverForged,
    /// Deliver arbitrary noise from the real origin.
    Garbage(Value),
    /// Advance the clock.
    Tick(u16),
}

fn schedule_strategy() -> impl Strategy<Value = Vec<ScheduleOp>> {
    let op = prop_oneof![
        4 => Just(ScheduleOp::Deliver),
        1 => Just(ScheduleOp::DeliverForged),
        2 => json_strategy().prop_map(ScheduleOp::Garbage),
        3 => (0u16..1500).prop_map(ScheduleOp::Tick),
    ];
    prop::collection::vec(op, 1..40)
}

#[test]
fn prop_request_settles_at_most_once() {
    proptest!(|(schedule in schedule_strategy())| {
        let env = SimEnv::new(7);
        let mut platform = SimPlatform::new(PlatformConfig::modern(ORIGIN));
        let (mut request, posts) = StorageRequest::open(
            &env,
            StorageOp::Put { key: "lti_state_s".to_owned(), value: "s".to_owned() },
            ORIGIN,
            ExchangeConfig::default(),
            false,
        );

        let mut queue: Vec<Value> = posts.iter().filter_map(|post| platform.handle(&post.payload)).collect();
        let mut now = env.now();
        let mut outcomes = 0usize;

        for op in schedule {
            let step = match op {
                ScheduleOp::Deliver => {
                    if queue.is_empty() {
                        continue;
                    }
                    let payload = queue.remove(0);
                    request.handle_message(now, ORIGIN, &payload)
                },
                ScheduleOp::DeliverForged => {
                    if queue.is_empty() {
                        continue;
                    }
                    let payload = queue.remove(0);
                    request.handle_message(now, "https://evil.example", &payload)
                },
                ScheduleOp::Garbage(payload) => request.handle_message(now, ORIGIN, &payload),
                ScheduleOp::Tick(ms) => {
                    now += Duration::from_millis(u64::from(ms));
                    request.handle_tick(now)
                },
            };

            for post in &step.posts {
                if let Some(response) = platform.handle(&post.payload) {
                    queue.push(response);
                }
            }
            if step.outcome.is_some() {
                outcomes += 1;
            }
        }

        prop_assert!(outcomes <= 1, "request settled {outcomes} times");
        if outcomes == 1 {
            prop_assert!(request.is_settled());
            prop_assert!(request.next_deadline().is_none());
        }
    });
}

/// One storage operation against a small key space (to force overwrites).
#[derive(Debug, Clone)]
enum ModelOp {
    Put { key: usize, value: String },
    Get { key: usize },
}

const KEY_SPACE: [&str; 3] = ["lti_state_a", "lti_nonce_b", "lti_state_c"];

fn model_ops() -> impl Strategy<Value = Vec<ModelOp>> {
    let op = prop_oneof![
        (0..KEY_SPACE.len(), "[a-z0-9]{1,8}")
            .prop_map(|(key, value)| ModelOp::Put { key, value }),
        (0..KEY_SPACE.len()).prop_map(|key| ModelOp::Get { key }),
    ];
    prop::collection::vec(op, 1..12)
}

/// Apply a schedule through the real stack; return every get result.
async fn run_real(ops: &[ModelOp], seed: u64) -> Vec<Option<String>> {
    let env = SimEnv::new(seed);
    let (channel, events) = sim_channel(SimPlatform::new(PlatformConfig::modern(ORIGIN)));
    let mut storage = PlatformStorage::new(
        env,
        channel,
        events,
        ORIGIN,
        ExchangeConfig::default(),
        false,
    );

    let mut gets = Vec::new();
    for op in ops {
        match op {
            ModelOp::Put { key, value } => {
                storage.put_data(KEY_SPACE[*key], value).await.expect("put failed");
            },
            ModelOp::Get { key } => {
                gets.push(storage.get_data(KEY_SPACE[*key]).await.expect("get failed"));
            },
        }
    }
    gets
}

#[test]
fn prop_storage_matches_map_model_and_is_deterministic() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    proptest!(ProptestConfig::with_cases(64), |(ops in model_ops())| {
        // Reference model: a plain map.
        let mut model: HashMap<&str, String> = HashMap::new();
        let mut expected = Vec::new();
        for op in &ops {
            match op {
                ModelOp::Put { key, value } => {
                    model.insert(KEY_SPACE[*key], value.clone());
                },
                ModelOp::Get { key } => expected.push(model.get(KEY_SPACE[*key]).cloned()),
            }
        }

        let first = runtime.block_on(run_real(&ops, 11));
        prop_assert_eq!(&first, &expected, "real stack diverged from the map model");

        // Same seed, same schedule: identical run.
        let second = runtime.block_on(run_real(&ops, 11));
        prop_assert_eq!(first, second);
    });
}

#[test]
fn prop_message_ids_never_collide() {
    let env = SimEnv::new(99);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..10_000 {
        let id = env.message_id();
        assert!(seen.insert(id.as_str().to_owned()), "duplicate message ID: {id}");
    }
}
