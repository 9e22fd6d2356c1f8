//! Simulated host page.
//!
//! Records every action the bootstrap asks the embedding page to perform:
//! cookie writes (with an optional "blocked" mode modeling a browser that
//! refuses third-party cookies), local-storage mirrors, parent-window
//! posts, and submitted redirect forms.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use transom_client::{Cookie, HostPage, RedirectForm};

#[derive(Default)]
struct HostInner {
    cookies_blocked: bool,
    cookies: Mutex<Vec<(String, String)>>,
    local: Mutex<HashMap<String, Value>>,
    parent_posts: Mutex<Vec<(Value, String)>>,
    submitted: Mutex<Vec<RedirectForm>>,
}

/// Recording host page; cheap to clone, all clones share state.
#[derive(Clone, Default)]
pub struct SimHostPage {
    inner: Arc<HostInner>,
}

impl SimHostPage {
    /// A host page with working cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// A host page whose cookie writes silently fail, as under blocked
    /// third-party cookies.
    pub fn with_blocked_cookies() -> Self {
        Self { inner: Arc::new(HostInner { cookies_blocked: true, ..HostInner::default() }) }
    }

    /// Cookies currently present.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.inner.cookies.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Preset a cookie, as a previous page load would have.
    pub fn preset_cookie(&self, name: &str, value: &str) {
        self.inner
            .cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_owned(), value.to_owned()));
    }

    /// Local-storage entry under `key`.
    pub fn local(&self, key: &str) -> Option<Value> {
        self.inner.local.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    /// Payloads posted to the parent window, with their target origins.
    pub fn parent_posts(&self) -> Vec<(Value, String)> {
        self.inner.parent_posts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Redirect forms submitted so far.
    pub fn submitted_forms(&self) -> Vec<RedirectForm> {
        self.inner.submitted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl HostPage for SimHostPage {
    fn set_cookie(&self, cookie: Cookie) {
        if self.inner.cookies_blocked {
            tracing::debug!(target: "transom::sim", name = %cookie.name, "cookie write blocked");
            return;
        }
        let mut cookies = self.inner.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|(name, _)| name != &cookie.name);
        cookies.push((cookie.name, cookie.value));
    }

    fn cookie_pairs(&self) -> Vec<(String, String)> {
        self.cookies()
    }

    fn store_local(&self, key: &str, value: &Value) {
        self.inner
            .local
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.clone());
    }

    fn post_to_parent(&self, payload: Value, target_origin: &str) {
        self.inner
            .parent_posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((payload, target_origin.to_owned()));
    }

    fn submit_form(&self, form: &RedirectForm) {
        self.inner
            .submitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(form.clone());
    }
}
