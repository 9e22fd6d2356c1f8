//! Message subjects.
//!
//! A subject names the operation a message requests. Platforms implement one
//! of two naming conventions: the current `lti.*` names or the legacy
//! `org.imsglobal.lti.*` names from pre-release drafts. Capability
//! negotiation decides which spelling actually goes on the wire, so the
//! logical [`Subject`] and the wire string are kept distinct.

/// Namespace prefix used by platforms implementing the pre-release subjects.
pub const LEGACY_PREFIX: &str = "org.imsglobal.";

/// Suffix distinguishing a response subject from its request subject.
pub const RESPONSE_SUFFIX: &str = ".response";

/// Logical operations of the platform-storage protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    /// Query which messages the platform supports.
    Capabilities,
    /// Store a value under a key in the platform window.
    PutData,
    /// Retrieve a previously stored value.
    GetData,
}

impl Subject {
    /// Current wire name, e.g. `lti.put_data`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Capabilities => "lti.capabilities",
            Self::PutData => "lti.put_data",
            Self::GetData => "lti.get_data",
        }
    }

    /// Legacy wire name, e.g. `org.imsglobal.lti.put_data`.
    pub fn legacy_name(self) -> String {
        format!("{LEGACY_PREFIX}{}", self.name())
    }

    /// Whether an advertised wire subject refers to this operation.
    ///
    /// Both namespaces are accepted so that a tool talking to a platform of
    /// either vintage negotiates successfully.
    pub fn matches(self, wire: &str) -> bool {
        wire == self.name()
            || wire.strip_prefix(LEGACY_PREFIX).is_some_and(|rest| rest == self.name())
    }
}

/// Response subject for a given request subject.
///
/// The platform answers a request by echoing its subject with
/// [`RESPONSE_SUFFIX`] appended, whichever namespace the request used.
pub fn response_subject(request_subject: &str) -> String {
    format!("{request_subject}{RESPONSE_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_legacy_prefix() {
        assert_eq!(Subject::PutData.legacy_name(), "org.imsglobal.lti.put_data");
        assert_eq!(Subject::Capabilities.legacy_name(), "org.imsglobal.lti.capabilities");
    }

    #[test]
    fn matches_both_namespaces() {
        assert!(Subject::PutData.matches("lti.put_data"));
        assert!(Subject::PutData.matches("org.imsglobal.lti.put_data"));
        assert!(!Subject::PutData.matches("lti.get_data"));
        assert!(!Subject::PutData.matches("org.imsglobal.lti.get_data"));
    }

    #[test]
    fn matches_rejects_partial_prefixes() {
        // A subject that merely starts with the modern name is a different
        // operation, not a match.
        assert!(!Subject::PutData.matches("lti.put_data.response"));
        assert!(!Subject::PutData.matches("org.imsglobal.lti.put_data2"));
    }

    #[test]
    fn response_subject_appends_suffix() {
        assert_eq!(response_subject("lti.get_data"), "lti.get_data.response");
        assert_eq!(
            response_subject("org.imsglobal.lti.capabilities"),
            "org.imsglobal.lti.capabilities.response"
        );
    }
}
