//! # rfxp-studio
//!
//! Thin web viewer for the progressive codec pipeline: four JSON
//! endpoints over per-session pipeline state, plus configuration and
//! logging plumbing. All codec logic lives in `rfxp-core`.

pub mod config;
pub mod handlers;
pub mod session;

pub use config::StudioConfig;
pub use handlers::{AppState, router};
pub use session::{SESSION_COOKIE, SessionState, SessionStore};
