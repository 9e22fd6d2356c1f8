//! Workspace root. The protocol lives in the `transom-*` crates under
//! `crates/`; this package only anchors shared tooling (git hooks).
