//! Deterministic simulation harness for platform-storage testing.
//!
//! Real cross-window negotiation depends on two browser windows, their
//! message listeners, and wall-clock timeouts — none of which make for
//! reproducible tests. This crate replaces all of it in-process:
//!
//! - [`SimEnv`]: virtual clock + seeded RNG; timeouts fire in zero
//!   wall-clock time, message IDs replay from a seed
//! - [`SimPlatform`]: a model LMS window with fault knobs (legacy naming,
//!   silence, missing capability lists, error responses)
//! - [`sim_channel`]: delivery with browser semantics (origin-restricted
//!   posts are dropped) plus forged-event injection
//! - [`SimHostPage`]: records cookies, local storage, parent posts, and
//!   submitted redirect forms
//!
//! Integration tests in `tests/` drive the full client stack against these
//! pieces.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_channel;
pub mod sim_env;
pub mod sim_host;
pub mod sim_platform;

pub use sim_channel::{SimChannel, sim_channel};
pub use sim_env::SimEnv;
pub use sim_host::SimHostPage;
pub use sim_platform::{PlatformConfig, SimPlatform, SubjectNaming};
