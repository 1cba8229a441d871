use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use uuid::Uuid;

use crate::lms::{AccessToken, LmsUser};

/// Per-browser state kept on the server side.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    /// CSRF value sent with the pending authorization request.
    pub oauth_state: Option<String>,
    pub access_token: Option<AccessToken>,
    pub user: Option<LmsUser>,
}

struct Entry {
    data: SessionData,
    touched_at: Instant,
}

/// In-memory session store keyed by a random id carried in a cookie.
pub struct SessionStore {
    entries: Mutex<HashMap<String, Entry>>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle_ttl,
        }
    }

    /// Starts a new empty session and returns its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().simple().to_string();
        let now = Instant::now();

        let mut entries = self.entries.lock();
        let idle_ttl = self.idle_ttl;
        entries.retain(|_, entry| now.duration_since(entry.touched_at) < idle_ttl);
        entries.insert(id.clone(), Entry {
            data: SessionData::default(),
            touched_at: now,
        });

        id
    }

    /// Returns a snapshot of the session, refreshing its idle timer.
    pub fn get(&self, id: &str) -> Option<SessionData> {
        self.update(id, |data| data.clone())
    }

    /// Applies `f` to a live session. Returns `None` if it is unknown or expired.
    pub fn update<R, F>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut SessionData) -> R,
    {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = now.duration_since(entries.get(id)?.touched_at) >= self.idle_ttl;
        if expired {
            entries.remove(id);
            return None;
        }

        let entry = entries.get_mut(id)?;
        entry.touched_at = now;
        Some(f(&mut entry.data))
    }

    pub fn remove(&self, id: &str) -> bool {
        self.entries.lock().remove(id).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
