//! OIDC login-initiation context.
//!
//! The platform starts a launch by POSTing login-initiation parameters to
//! the tool. The tool answers by redirecting the user agent back to the
//! platform's OIDC authorization endpoint with those parameters plus the
//! fixed OIDC fields, after parking `state` and `nonce` somewhere the
//! post-launch page can verify them.

use url::Url;

/// Prefix shared by storage keys and fallback cookie names.
pub const COOKIE_PREFIX: &str = "lti";

/// Fixed OIDC fields appended to every authorization request.
pub const OIDC_FIXED_PARAMS: [(&str, &str); 4] = [
    ("scope", "openid"),
    ("response_type", "id_token"),
    ("response_mode", "form_post"),
    // Don't prompt the user on redirect.
    ("prompt", "none"),
];

/// Storage/cookie key for a launch state value.
pub fn state_key(state: &str) -> String {
    format!("{COOKIE_PREFIX}_state_{state}")
}

/// Storage/cookie key for a launch nonce value.
pub fn nonce_key(nonce: &str) -> String {
    format!("{COOKIE_PREFIX}_nonce_{nonce}")
}

/// Everything the bootstrap needs for one login initiation.
///
/// Consumed once; the sequencer does not retain it past the redirect.
#[derive(Debug, Clone)]
pub struct LoginContext {
    /// The platform's OIDC authorization endpoint.
    pub platform_oidc_login_url: Url,
    /// Opaque launch state, also the storage key suffix.
    pub state: String,
    /// Replay-protection nonce.
    pub nonce: String,
    /// Tool client ID, when the platform sent one.
    pub client_id: Option<String>,
    /// Login hint from the platform, forwarded as-is.
    pub login_hint: String,
    /// LTI message hint from the platform, forwarded as-is.
    pub lti_message_hint: Option<String>,
    /// Redirect URI registered with the platform.
    pub redirect_uri: String,
    /// Named frame the platform designated for storage messages, if any.
    pub lti_storage_target: Option<String>,
    /// Any additional parameters to forward untouched.
    pub extra_params: Vec<(String, String)>,
}

impl LoginContext {
    /// Origin of the platform endpoint; responses and cookies are scoped to
    /// it.
    pub fn platform_origin(&self) -> String {
        self.platform_oidc_login_url.origin().ascii_serialization()
    }

    /// Body of the authorization POST: the login parameters as they came
    /// from the platform, plus the fixed OIDC fields.
    pub fn form_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(client_id) = &self.client_id {
            params.push(("client_id".to_owned(), client_id.clone()));
        }
        params.push(("login_hint".to_owned(), self.login_hint.clone()));
        if let Some(hint) = &self.lti_message_hint {
            params.push(("lti_message_hint".to_owned(), hint.clone()));
        }
        params.push(("redirect_uri".to_owned(), self.redirect_uri.clone()));
        params.push(("state".to_owned(), self.state.clone()));
        params.push(("nonce".to_owned(), self.nonce.clone()));
        params.extend(self.extra_params.iter().cloned());
        params.extend(
            OIDC_FIXED_PARAMS.iter().map(|(name, value)| ((*name).to_owned(), (*value).to_owned())),
        );
        params
    }
}

/// Where the redirect form submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectTarget {
    /// Current window or frame; used when state survived (storage or
    /// verified cookies).
    SameFrame,
    /// New tab; used when nothing persisted, so the user can complete the
    /// login interactively with first-party storage available.
    NewTab,
}

impl RedirectTarget {
    /// The HTML form `target` attribute value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SameFrame => "_self",
            Self::NewTab => "_blank",
        }
    }
}

/// The transient form the host page submits to finish the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectForm {
    /// Authorization endpoint to POST to.
    pub url: Url,
    /// Form-encoded body parameters.
    pub params: Vec<(String, String)>,
    /// Window target for the submission.
    pub target: RedirectTarget,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn context() -> LoginContext {
        LoginContext {
            platform_oidc_login_url: Url::parse("https://lms.example/oidc/auth").unwrap(),
            state: "state-1".to_owned(),
            nonce: "nonce-1".to_owned(),
            client_id: Some("tool-17".to_owned()),
            login_hint: "user-4".to_owned(),
            lti_message_hint: Some("hint".to_owned()),
            redirect_uri: "https://tool.example/lti3".to_owned(),
            lti_storage_target: None,
            extra_params: vec![("lti_deployment_id".to_owned(), "dep-1".to_owned())],
        }
    }

    #[test]
    fn platform_origin_drops_path() {
        assert_eq!(context().platform_origin(), "https://lms.example");
    }

    #[test]
    fn form_params_carry_login_fields_and_fixed_oidc_fields() {
        let params = context().form_params();
        let get = |name: &str| {
            params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
        };

        assert_eq!(get("client_id"), Some("tool-17"));
        assert_eq!(get("login_hint"), Some("user-4"));
        assert_eq!(get("lti_message_hint"), Some("hint"));
        assert_eq!(get("state"), Some("state-1"));
        assert_eq!(get("nonce"), Some("nonce-1"));
        assert_eq!(get("lti_deployment_id"), Some("dep-1"));
        assert_eq!(get("scope"), Some("openid"));
        assert_eq!(get("response_type"), Some("id_token"));
        assert_eq!(get("response_mode"), Some("form_post"));
        assert_eq!(get("prompt"), Some("none"));
    }

    #[test]
    fn optional_fields_are_omitted_not_empty() {
        let mut ctx = context();
        ctx.client_id = None;
        ctx.lti_message_hint = None;

        let params = ctx.form_params();
        assert!(!params.iter().any(|(key, _)| key == "client_id"));
        assert!(!params.iter().any(|(key, _)| key == "lti_message_hint"));
    }

    #[test]
    fn key_helpers_embed_the_value() {
        assert_eq!(state_key("abc"), "lti_state_abc");
        assert_eq!(nonce_key("n1"), "lti_nonce_n1");
    }

    #[test]
    fn redirect_targets_render_as_html_targets() {
        assert_eq!(RedirectTarget::SameFrame.as_str(), "_self");
        assert_eq!(RedirectTarget::NewTab.as_str(), "_blank");
    }
}
