use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::session::turn::{Role, Turn};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// History bound counts user/assistant pairs: a session keeps at most
    /// `2 * max_history_turns` turns.
    pub max_history_turns: usize,
    pub session_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_history_turns: 10,
            session_timeout: Duration::from_secs(300),
        }
    }
}

/// A bounded, expiring conversation: ordered turns plus free-form
/// remembered facts, tracked for inactivity.
#[derive(Debug)]
pub struct Session {
    id: String,
    history: VecDeque<Turn>,
    created_at: DateTime<Utc>,
    last_activity: Instant,
    metadata: HashMap<String, String>,
    max_history_turns: usize,
    timeout: Duration,
}

impl Session {
    fn new(id: String, config: &SessionConfig) -> Self {
        Self {
            id,
            history: VecDeque::with_capacity(config.max_history_turns * 2),
            created_at: Utc::now(),
            last_activity: Instant::now(),
            metadata: HashMap::new(),
            max_history_turns: config.max_history_turns,
            timeout: config.session_timeout,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn add_turn(
        &mut self,
        role: Role,
        content: impl Into<String>,
        metadata: Option<HashMap<String, String>>,
    ) {
        self.history.push_back(Turn::new(role, content, metadata));
        self.last_activity = Instant::now();

        // Explicit bound check after every append: drop the two oldest
        // turns together so user/assistant pairing is preserved.
        if self.history.len() > self.max_history_turns * 2 {
            self.history.pop_front();
            self.history.pop_front();
        }

        debug!(
            "session {}: added {} turn, history size: {}",
            self.id,
            role,
            self.history.len()
        );
    }

    /// Cloned view of the history, most recent `max_turns` when given.
    pub fn get_history(&self, max_turns: Option<usize>) -> Vec<Turn> {
        match max_turns {
            Some(n) => {
                let skip = self.history.len().saturating_sub(n);
                self.history.iter().skip(skip).cloned().collect()
            }
            None => self.history.iter().cloned().collect(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.last_activity.elapsed() > self.timeout
    }

    /// Empties the history without touching remembered facts or timestamps.
    pub fn clear_history(&mut self) {
        self.history.clear();
        info!("session {}: history cleared", self.id);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn set_fact(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    pub fn fact(&self, key: &str) -> Option<String> {
        self.metadata.get(key).cloned()
    }
}

/// Registry of live sessions. The map lock is held only for map access;
/// each session has its own mutex so appends to one conversation never
/// contend with another. No lock is ever held across an await point.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Registers a new empty session, generating an id when none is given.
    pub fn create(&self, id: Option<String>) -> String {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = Session::new(id.clone(), &self.config);
        self.sessions
            .write()
            .unwrap()
            .insert(id.clone(), Arc::new(Mutex::new(session)));
        info!("created session {}", id);
        id
    }

    /// Looks a session up by id. Lazy expiry: an expired session is removed
    /// here, as part of the lookup, and the call reports absent.
    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        let session = self.sessions.read().unwrap().get(id).cloned()?;
        if session.lock().unwrap().is_expired() {
            info!("session {} expired, removing", id);
            self.sessions.write().unwrap().remove(id);
            return None;
        }
        Some(session)
    }

    pub fn add_user_message(
        &self,
        id: &str,
        content: &str,
        metadata: Option<HashMap<String, String>>,
    ) {
        self.append(id, Role::User, content, metadata);
    }

    pub fn add_assistant_message(
        &self,
        id: &str,
        content: &str,
        metadata: Option<HashMap<String, String>>,
    ) {
        self.append(id, Role::Assistant, content, metadata);
    }

    fn append(&self, id: &str, role: Role, content: &str, metadata: Option<HashMap<String, String>>) {
        match self.get(id) {
            Some(session) => session.lock().unwrap().add_turn(role, content, metadata),
            None => warn!("session {} not found, dropping {} turn", id, role),
        }
    }

    /// Cloned history for a session, or None for an unknown/expired id.
    pub fn history(&self, id: &str, max_turns: Option<usize>) -> Option<Vec<Turn>> {
        let session = self.get(id)?;
        let history = session.lock().unwrap().get_history(max_turns);
        Some(history)
    }

    /// Stores a remembered fact. Best-effort: false when the session is gone.
    pub fn remember(&self, id: &str, key: &str, value: &str) -> bool {
        match self.get(id) {
            Some(session) => {
                session.lock().unwrap().set_fact(key, value);
                true
            }
            None => false,
        }
    }

    pub fn recall(&self, id: &str, key: &str) -> Option<String> {
        let session = self.get(id)?;
        let value = session.lock().unwrap().fact(key);
        value
    }

    /// Unconditionally removes a session; no-op for unknown ids.
    pub fn clear(&self, id: &str) {
        if self.sessions.write().unwrap().remove(id).is_some() {
            info!("cleared session {}", id);
        }
    }

    /// Bulk removal of expired sessions, for periodic maintenance outside
    /// the hot path. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap();
        let before = sessions.len();
        sessions.retain(|id, session| {
            let expired = session.lock().unwrap().is_expired();
            if expired {
                info!("removed expired session {}", id);
            }
            !expired
        });
        before - sessions.len()
    }

    /// Registered sessions, including expired ones not yet swept or
    /// looked up.
    pub fn active_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
