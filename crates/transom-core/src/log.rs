//! Per-exchange diagnostic buffer.
//!
//! Each exchange collects one request record, one response record, and
//! zero-or-more error records, all timestamped relative to the exchange
//! opening. `print()` is a no-op unless the debug flag was set at
//! construction; when enabled it emits the rendered summary through
//! `tracing`. Purely observational — nothing here feeds back into the
//! protocol.

use std::time::Instant;

use serde_json::Value;

use crate::exchange::FrameTarget;

/// How the exchange ended, for summary coloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutcome {
    /// Settled with a payload and no recorded errors.
    Success,
    /// Errors recorded after a response had arrived (e.g. a platform error
    /// payload, or noise rejected mid-exchange).
    FailedAfterResponse,
    /// Errors recorded and no response ever arrived (timeout, misdelivery).
    Failed,
}

#[derive(Debug, Clone)]
struct RequestRecord {
    at: Instant,
    subject: String,
    message_id: String,
    target: String,
    target_origin: String,
    payload: Value,
}

#[derive(Debug, Clone)]
struct ResponseRecord {
    at: Instant,
    origin: String,
    payload: Value,
}

#[derive(Debug, Clone)]
struct ErrorRecord {
    at: Instant,
    detail: String,
}

/// Diagnostic record of one exchange.
#[derive(Debug, Clone)]
pub struct ExchangeLog {
    debug: bool,
    opened_at: Instant,
    request: Option<RequestRecord>,
    response: Option<ResponseRecord>,
    errors: Vec<ErrorRecord>,
}

impl ExchangeLog {
    /// Create an empty log anchored at the exchange open time.
    pub fn new(debug: bool, opened_at: Instant) -> Self {
        Self { debug, opened_at, request: None, response: None, errors: Vec::new() }
    }

    /// Record the outgoing request.
    pub fn record_request(
        &mut self,
        at: Instant,
        subject: &str,
        message_id: &str,
        target: &FrameTarget,
        target_origin: &str,
        payload: &Value,
    ) {
        let target = match target {
            FrameTarget::Launch => "launch window".to_owned(),
            FrameTarget::Named(name) => format!("frame \"{name}\""),
        };
        self.request = Some(RequestRecord {
            at,
            subject: subject.to_owned(),
            message_id: message_id.to_owned(),
            target,
            target_origin: target_origin.to_owned(),
            payload: payload.clone(),
        });
    }

    /// Record an inbound payload that correlated with this exchange.
    pub fn record_response(&mut self, at: Instant, origin: &str, payload: &Value) {
        self.response = Some(ResponseRecord { at, origin: origin.to_owned(), payload: payload.clone() });
    }

    /// Record a rejection or failure.
    pub fn record_error(&mut self, at: Instant, detail: impl Into<String>) {
        self.errors.push(ErrorRecord { at, detail: detail.into() });
    }

    /// Classify the buffered records.
    pub fn outcome(&self) -> LogOutcome {
        if self.errors.is_empty() {
            LogOutcome::Success
        } else if self.response.is_some() {
            LogOutcome::FailedAfterResponse
        } else {
            LogOutcome::Failed
        }
    }

    /// Render the buffered records as a multi-line summary.
    ///
    /// Timestamps are milliseconds since the exchange opened, so renders are
    /// deterministic under a controlled clock.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let (subject, message_id) = self
            .request
            .as_ref()
            .map_or(("<none>", "<none>"), |request| (request.subject.as_str(), request.message_id.as_str()));
        let outcome = match self.outcome() {
            LogOutcome::Success => "success",
            LogOutcome::FailedAfterResponse => "failed after response",
            LogOutcome::Failed => "failed",
        };
        let round_trip = self
            .response
            .as_ref()
            .map(|response| response.at.saturating_duration_since(self.opened_at).as_millis());
        match round_trip {
            Some(ms) => {
                out.push_str(&format!("exchange {subject} [{message_id}]: {outcome}, {ms}ms round trip\n"));
            },
            None => out.push_str(&format!("exchange {subject} [{message_id}]: {outcome}, no response\n")),
        }

        if let Some(request) = &self.request {
            let at = request.at.saturating_duration_since(self.opened_at).as_millis();
            out.push_str(&format!(
                "  request  +{at}ms -> {} (origin {})\n    {}\n",
                request.target, request.target_origin, request.payload
            ));
        }
        if let Some(response) = &self.response {
            let at = response.at.saturating_duration_since(self.opened_at).as_millis();
            out.push_str(&format!("  response +{at}ms <- {}\n    {}\n", response.origin, response.payload));
        }
        for error in &self.errors {
            let at = error.at.saturating_duration_since(self.opened_at).as_millis();
            out.push_str(&format!("  error    +{at}ms {}\n", error.detail));
        }

        out
    }

    /// Emit the summary through `tracing`.
    ///
    /// No-op unless the debug flag was set at construction.
    pub fn print(&self) {
        if !self.debug {
            return;
        }
        for line in self.render().lines() {
            tracing::debug!(target: "transom::exchange", "{line}");
        }
    }
}
