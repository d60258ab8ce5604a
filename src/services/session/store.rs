//! In-memory session table for the stateful transport.
//!
//! Each session owns exactly one AuthContext and is bound to the subject that
//! created it. Calls on one session are serialized through its mutex, so they
//! run in arrival order and never observe a half-applied selection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::AuthContext;
use crate::services::auth::VerifiedIdentity;

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    subject: String,
    context: Mutex<AuthContext>,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn context(&self) -> &Mutex<AuthContext> {
        &self.context
    }
}

#[derive(Debug)]
struct Slot {
    session: Arc<Session>,
    last_seen: Instant,
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Slot>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    /// Open a session for a freshly verified identity. Idle sessions are pruned first.
    pub fn create(&self, identity: VerifiedIdentity) -> Arc<Session> {
        self.prune_idle();

        let session = Arc::new(Session {
            id: Uuid::new_v4(),
            subject: identity.subject.clone(),
            context: Mutex::new(AuthContext::new(identity)),
        });
        self.sessions.insert(
            session.id,
            Slot {
                session: session.clone(),
                last_seen: Instant::now(),
            },
        );
        tracing::info!(session_id = %session.id, subject = %session.subject, "session opened");
        session
    }

    /// The session, if it exists and belongs to `subject`.
    pub fn get(&self, id: Uuid, subject: &str) -> Option<Arc<Session>> {
        let mut slot = self.sessions.get_mut(&id)?;
        if slot.session.subject != subject {
            tracing::warn!(session_id = %id, "session requested by a different subject");
            return None;
        }
        slot.last_seen = Instant::now();
        Some(slot.session.clone())
    }

    /// Close the session. Returns false when it does not exist or is not owned by `subject`.
    pub fn remove(&self, id: Uuid, subject: &str) -> bool {
        let removed = self
            .sessions
            .remove_if(&id, |_, slot| slot.session.subject == subject)
            .is_some();
        if removed {
            tracing::info!(session_id = %id, "session closed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn prune_idle(&self) {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, slot| slot.last_seen.elapsed() < self.idle_ttl);
        let pruned = before.saturating_sub(self.sessions.len());
        if pruned > 0 {
            tracing::debug!(pruned, "idle sessions pruned");
        }
    }
}
