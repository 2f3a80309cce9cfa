//! Per-user sessions: credentials, active document and chat transcript
//!
//! Created on the first request, mutated by user actions, dropped on explicit
//! delete or after sitting idle past the TTL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex as SyncMutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::chat::ChatInterface;
use crate::error::{Error, Result};
use crate::ingestion::ProcessedDocument;
use crate::providers::Providers;
use crate::retrieval::QueryEngine;
use crate::types::{Credentials, SessionResponse};

/// State owned by one user session
pub struct Session {
    pub id: Uuid,
    credentials: Option<Credentials>,
    providers: Option<Providers>,
    active_document: Option<ProcessedDocument>,
    pub chat: ChatInterface,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(id: Uuid, history_turns: usize) -> Self {
        Self {
            id,
            credentials: None,
            providers: None,
            active_document: None,
            chat: ChatInterface::new(history_turns),
            created_at: Utc::now(),
        }
    }

    /// Store keys together with the providers built from them
    pub fn set_credentials(&mut self, credentials: Credentials, providers: Providers) {
        self.credentials = Some(credentials);
        self.providers = Some(providers);
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Providers, or `MissingCredentials` until keys are supplied
    pub fn providers(&self) -> Result<&Providers> {
        self.providers.as_ref().ok_or_else(|| {
            Error::MissingCredentials("set both API keys for this session first".to_string())
        })
    }

    pub fn set_active_document(&mut self, document: ProcessedDocument) {
        self.active_document = Some(document);
    }

    pub fn active_document(&self) -> Option<&ProcessedDocument> {
        self.active_document.as_ref()
    }

    /// Forget the active document; its collection stays on disk
    pub fn clear_active_document(&mut self) -> Option<ProcessedDocument> {
        self.active_document.take()
    }

    /// Engine for the active document, or `NoActiveDocument`
    pub fn engine(&self) -> Result<&QueryEngine> {
        self.active_document
            .as_ref()
            .map(|d| &d.engine)
            .ok_or(Error::NoActiveDocument)
    }

    pub fn to_response(&self) -> SessionResponse {
        SessionResponse {
            session_id: self.id,
            credentials_set: self.credentials.is_some(),
            active_document: self.active_document.as_ref().map(|d| d.summary.clone()),
            messages: self.chat.len(),
        }
    }
}

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_seen: SyncMutex<Instant>,
}

/// Registry of live sessions
///
/// Each session sits behind its own async mutex, so one user's actions run
/// one at a time while different sessions proceed in parallel.
pub struct SessionManager {
    sessions: DashMap<Uuid, SessionEntry>,
    idle_ttl: Duration,
    history_turns: usize,
}

impl SessionManager {
    pub fn new(idle_ttl: Duration, history_turns: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
            history_turns,
        }
    }

    /// Start a new empty session
    pub fn create(&self) -> (Uuid, Arc<Mutex<Session>>) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(id, self.history_turns)));
        self.sessions.insert(
            id,
            SessionEntry {
                session: session.clone(),
                last_seen: SyncMutex::new(Instant::now()),
            },
        );
        tracing::info!("Created session {}", id);
        (id, session)
    }

    /// Look up a session and mark it as seen
    pub fn get(&self, id: Uuid) -> Result<Arc<Mutex<Session>>> {
        let entry = self
            .sessions
            .get(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        *entry.last_seen.lock() = Instant::now();
        Ok(entry.session.clone())
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            tracing::info!("Removed session {}", id);
        }
        removed
    }

    /// Drop sessions idle longer than the TTL; sessions mid-request are kept
    pub fn sweep_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            let idle = entry.last_seen.lock().elapsed() > self.idle_ttl;
            !idle || entry.session.try_lock().is_err()
        });
        let removed = before.saturating_sub(self.sessions.len());
        if removed > 0 {
            tracing::info!("Swept {} idle sessions", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }
}
