//! Model of the platform (LMS) side of the protocol.
//!
//! `SimPlatform` answers capability queries and put/get requests the way a
//! conforming platform window would, with knobs for every divergence the
//! tool has to survive: legacy-only subject naming, advertised frames,
//! silence, capability responses without a capability list, and error
//! responses.

use std::collections::HashMap;

use serde_json::{Value, json};
use transom_proto::{CapabilityDescriptor, ErrorInfo, Subject, response_subject};

/// Which capability-request spellings the platform answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectNaming {
    /// Only `lti.capabilities`.
    Modern,
    /// Only `org.imsglobal.lti.capabilities`.
    Legacy,
    /// Both spellings.
    Both,
}

/// Configurable platform behavior.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Origin the platform's responses carry.
    pub origin: String,
    /// Capability-request spellings answered.
    pub naming: SubjectNaming,
    /// Capability entries advertised (and therefore accepted).
    pub advertised: Vec<CapabilityDescriptor>,
    /// Never respond to anything.
    pub silent: bool,
    /// Answer capability queries without a `supported_messages` list.
    pub capabilities_without_list: bool,
    /// Fail every put with this error.
    pub put_error: Option<ErrorInfo>,
    /// Fail every get with this error.
    pub get_error: Option<ErrorInfo>,
}

impl PlatformConfig {
    /// A modern platform advertising put and get.
    pub fn modern(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            naming: SubjectNaming::Modern,
            advertised: vec![
                CapabilityDescriptor { subject: Subject::PutData.name().to_owned(), frame: None },
                CapabilityDescriptor { subject: Subject::GetData.name().to_owned(), frame: None },
            ],
            silent: false,
            capabilities_without_list: false,
            put_error: None,
            get_error: None,
        }
    }

    /// A pre-release platform: legacy spellings only.
    pub fn legacy_only(origin: impl Into<String>) -> Self {
        Self {
            naming: SubjectNaming::Legacy,
            advertised: vec![
                CapabilityDescriptor { subject: Subject::PutData.legacy_name(), frame: None },
                CapabilityDescriptor { subject: Subject::GetData.legacy_name(), frame: None },
            ],
            ..Self::modern(origin)
        }
    }

    /// Route storage subjects through a named frame.
    pub fn with_frame(mut self, frame: &str) -> Self {
        for entry in &mut self.advertised {
            entry.frame = Some(frame.to_owned());
        }
        self
    }
}

/// In-memory platform window.
#[derive(Debug)]
pub struct SimPlatform {
    config: PlatformConfig,
    store: HashMap<String, String>,
}

impl SimPlatform {
    /// Create a platform with the given behavior.
    pub fn new(config: PlatformConfig) -> Self {
        Self { config, store: HashMap::new() }
    }

    /// The origin this platform's responses carry.
    pub fn origin(&self) -> &str {
        &self.config.origin
    }

    /// Value currently stored under `key`, if any.
    pub fn stored(&self, key: &str) -> Option<&str> {
        self.store.get(key).map(String::as_str)
    }

    /// Seed the store directly (for read-path tests).
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.store.insert(key.into(), value.into());
    }

    /// Answer one inbound request, if this platform would.
    ///
    /// `None` models the browser reality of an unanswered post: nothing
    /// happens, and the tool's deadline is the only way out.
    pub fn handle(&mut self, payload: &Value) -> Option<Value> {
        if self.config.silent {
            return None;
        }

        let subject = payload.get("subject")?.as_str()?;
        let message_id = payload.get("message_id")?.as_str()?.to_owned();

        if Subject::Capabilities.matches(subject) {
            return self.handle_capabilities(subject, &message_id);
        }

        let entry = self.config.advertised.iter().find(|entry| entry.subject == subject)?;
        let reply_subject = response_subject(&entry.subject);

        if Subject::PutData.matches(subject) {
            if let Some(error) = &self.config.put_error {
                return Some(error_response(&reply_subject, &message_id, error));
            }
            let key = payload.get("key")?.as_str()?.to_owned();
            let value = payload.get("value")?.as_str()?.to_owned();
            self.store.insert(key.clone(), value.clone());
            return Some(json!({
                "subject": reply_subject,
                "message_id": message_id,
                "key": key,
                "value": value,
            }));
        }

        if Subject::GetData.matches(subject) {
            if let Some(error) = &self.config.get_error {
                return Some(error_response(&reply_subject, &message_id, error));
            }
            let key = payload.get("key")?.as_str()?.to_owned();
            let mut response = json!({
                "subject": reply_subject,
                "message_id": message_id,
                "key": key.clone(),
            });
            if let Some(value) = self.store.get(&key) {
                response["value"] = Value::String(value.clone());
            }
            return Some(response);
        }

        None
    }

    fn handle_capabilities(&self, subject: &str, message_id: &str) -> Option<Value> {
        let answers = match self.config.naming {
            SubjectNaming::Modern => subject == Subject::Capabilities.name(),
            SubjectNaming::Legacy => subject == Subject::Capabilities.legacy_name(),
            SubjectNaming::Both => true,
        };
        if !answers {
            return None;
        }

        let mut response = json!({
            "subject": response_subject(subject),
            "message_id": message_id,
        });
        if !self.config.capabilities_without_list {
            response["supported_messages"] =
                serde_json::to_value(&self.config.advertised).unwrap_or(Value::Null);
        }
        Some(response)
    }
}

fn error_response(subject: &str, message_id: &str, error: &ErrorInfo) -> Value {
    json!({
        "subject": subject,
        "message_id": message_id,
        "error": {"code": error.code, "message": error.message},
    })
}
