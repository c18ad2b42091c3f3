//! Per-session pipeline state and the cookie-keyed session store.
//!
//! Each session owns its pipeline behind an async mutex, so at most
//! one encode/recompute runs per session at a time — the pipeline
//! itself has no internal locking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::{HeaderMap, HeaderValue, header};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use rfxp_core::{CodecDriver, CodecError, SessionContext};

/// Cookie the session id travels in.
pub const SESSION_COOKIE: &str = "rfxp-session";

// ── SessionState ─────────────────────────────────────────────────

/// Everything one session owns: the pipeline driver plus the
/// session-carried file paths.
pub struct SessionState {
    pub driver: CodecDriver,
    pub context: SessionContext,
}

impl SessionState {
    pub fn new() -> Result<Self, CodecError> {
        Ok(Self {
            driver: CodecDriver::new()?,
            context: SessionContext::default(),
        })
    }
}

// ── SessionStore ─────────────────────────────────────────────────

/// Cookie-keyed map of live sessions.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<AsyncMutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session id from the request cookies, or a fresh id together
    /// with the `Set-Cookie` value the response must carry.
    pub fn resolve(&self, headers: &HeaderMap) -> (Uuid, Option<HeaderValue>) {
        if let Some(id) = Self::cookie_session(headers) {
            return (id, None);
        }
        let id = Uuid::new_v4();
        let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly");
        (id, HeaderValue::from_str(&cookie).ok())
    }

    /// Fetch a session's state, creating it on first use.
    pub fn get_or_create(&self, id: Uuid) -> Result<Arc<AsyncMutex<SessionState>>, CodecError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = sessions.get(&id) {
            return Ok(Arc::clone(existing));
        }
        let state = Arc::new(AsyncMutex::new(SessionState::new()?));
        sessions.insert(id, Arc::clone(&state));
        Ok(state)
    }

    fn cookie_session(headers: &HeaderMap) -> Option<Uuid> {
        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
        cookies.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            if name == SESSION_COOKIE {
                Uuid::parse_str(value.trim()).ok()
            } else {
                None
            }
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
