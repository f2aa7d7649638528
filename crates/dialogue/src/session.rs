//! Short-lived per-conversation state.
//!
//! Sessions are handed out as owned copies and written back with
//! [`SessionStore::commit`], so no lock is held while a request awaits a
//! provider. Two concurrent requests on one session race last-writer-wins.

use crate::types::RequestContext;
use pitlane_llm::Role;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Disambiguation slots. Values only ever move forward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slots {
    /// Track id, e.g. "mile_end"
    pub track: Option<String>,
    /// Weekday name, e.g. "Saturday"
    pub day: Option<String>,
}

impl Slots {
    /// Overwrite with every value present in `found`; absent values keep
    /// what was there.
    pub fn merge(&mut self, found: Slots) {
        if found.track.is_some() {
            self.track = found.track;
        }
        if found.day.is_some() {
            self.day = found.day;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub last_activity: Instant,
    pub turns: VecDeque<Turn>,
    pub slots: Slots,
}

impl Session {
    fn new(id: &str, now: Instant) -> Self {
        Self {
            id: id.to_string(),
            last_activity: now,
            turns: VecDeque::new(),
            slots: Slots::default(),
        }
    }

    /// The last `n` user turns, oldest first.
    pub fn recent_user_turns(&self, n: usize) -> Vec<&str> {
        let mut recent: Vec<&str> = self
            .turns
            .iter()
            .rev()
            .filter(|t| t.role == Role::User)
            .take(n)
            .map(|t| t.text.as_str())
            .collect();
        recent.reverse();
        recent
    }
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    idle_timeout: Duration,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration, max_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_turns,
        }
    }

    /// Session id for a request.
    ///
    /// An explicit non-blank id wins. Otherwise the id is derived from the
    /// client address and agent string: clients sharing both (e.g. behind
    /// one proxy) share a session, and an agent change starts a new one.
    pub fn identify(&self, explicit: Option<&str>, ctx: &RequestContext) -> String {
        if let Some(id) = explicit.map(str::trim).filter(|id| !id.is_empty()) {
            return id.to_string();
        }

        let mut hasher = Sha256::new();
        hasher.update(ctx.client_addr.as_deref().unwrap_or("").as_bytes());
        hasher.update(b"|");
        hasher.update(ctx.user_agent.as_deref().unwrap_or("").as_bytes());
        format!("anon-{:x}", hasher.finalize())
    }

    pub fn get_or_create(&self, id: &str) -> Session {
        self.get_or_create_at(id, Instant::now())
    }

    /// Copy of the live session, or a fresh one if it is missing or idle
    /// past the timeout.
    pub fn get_or_create_at(&self, id: &str, now: Instant) -> Session {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(existing) = sessions.get(id) {
            if self.is_live(existing, now) {
                return existing.clone();
            }
            tracing::debug!("Session {} expired", id);
            sessions.remove(id);
        }

        let session = Session::new(id, now);
        sessions.insert(id.to_string(), session.clone());
        session
    }

    pub fn commit(&self, session: Session) {
        self.commit_at(session, Instant::now());
    }

    /// Write a session back, marking it active at `now`.
    pub fn commit_at(&self, mut session: Session, now: Instant) {
        session.last_activity = now;
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions.insert(session.id.clone(), session);
    }

    /// Append a turn, dropping the oldest beyond the turn cap.
    pub fn append_turn(&self, session: &mut Session, role: Role, text: impl Into<String>) {
        session.turns.push_back(Turn {
            role,
            text: text.into(),
        });
        while session.turns.len() > self.max_turns {
            session.turns.pop_front();
        }
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Remove sessions idle past the timeout. Returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = sessions.len();
        sessions.retain(|_, s| now.saturating_duration_since(s.last_activity) <= self.idle_timeout);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_live(&self, session: &Session, now: Instant) -> bool {
        now.saturating_duration_since(session.last_activity) <= self.idle_timeout
    }

    /// Sweep every `period` until the task is aborted.
    pub fn spawn_sweeper(store: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                interval.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    tracing::info!("Swept {} idle sessions ({} live)", removed, store.len());
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(1800);

    fn store() -> SessionStore {
        SessionStore::new(TIMEOUT, 4)
    }

    fn ctx(addr: &str, agent: &str) -> RequestContext {
        RequestContext {
            client_addr: Some(addr.to_string()),
            user_agent: Some(agent.to_string()),
        }
    }

    #[test]
    fn test_identify_explicit_wins() {
        let store = store();
        assert_eq!(store.identify(Some(" abc "), &ctx("1.2.3.4", "ua")), "abc");
    }

    #[test]
    fn test_identify_fallback_is_stable_hash() {
        let store = store();
        let a = store.identify(None, &ctx("1.2.3.4", "Mozilla"));
        let b = store.identify(Some("   "), &ctx("1.2.3.4", "Mozilla"));
        assert_eq!(a, b);
        assert!(a.starts_with("anon-"));
        assert_eq!(a.len(), "anon-".len() + 64);

        assert_ne!(a, store.identify(None, &ctx("1.2.3.4", "curl")));
        assert_ne!(a, store.identify(None, &ctx("5.6.7.8", "Mozilla")));
    }

    #[test]
    fn test_slots_only_move_forward() {
        let mut slots = Slots {
            track: Some("mile_end".to_string()),
            day: None,
        };
        slots.merge(Slots::default());
        assert_eq!(slots.track.as_deref(), Some("mile_end"));

        slots.merge(Slots {
            track: Some("docklands".to_string()),
            day: Some("Sunday".to_string()),
        });
        assert_eq!(slots.track.as_deref(), Some("docklands"));
        assert_eq!(slots.day.as_deref(), Some("Sunday"));
    }

    #[test]
    fn test_commit_round_trip() {
        let store = store();
        let t0 = Instant::now();

        let mut session = store.get_or_create_at("s", t0);
        store.append_turn(&mut session, Role::User, "hello");
        session.slots.track = Some("mile_end".to_string());
        store.commit_at(session, t0);

        let again = store.get_or_create_at("s", t0 + Duration::from_secs(60));
        assert_eq!(again.turns.len(), 1);
        assert_eq!(again.slots.track.as_deref(), Some("mile_end"));
    }

    #[test]
    fn test_idle_session_behaves_as_new() {
        let store = store();
        let t0 = Instant::now();

        let mut session = store.get_or_create_at("s", t0);
        store.append_turn(&mut session, Role::User, "hello");
        session.slots.track = Some("mile_end".to_string());
        store.commit_at(session, t0);

        let later = t0 + TIMEOUT + Duration::from_secs(1);
        let fresh = store.get_or_create_at("s", later);
        assert!(fresh.turns.is_empty());
        assert_eq!(fresh.slots, Slots::default());
    }

    #[test]
    fn test_turn_cap_drops_oldest() {
        let store = store();
        let mut session = store.get_or_create("s");
        for i in 0..6 {
            store.append_turn(&mut session, Role::User, format!("q{}", i));
        }
        assert_eq!(session.turns.len(), 4);
        assert_eq!(session.turns[0].text, "q2");
        assert_eq!(session.recent_user_turns(2), vec!["q4", "q5"]);
    }

    #[test]
    fn test_sweep_removes_only_idle() {
        let store = store();
        let t0 = Instant::now();
        let old = store.get_or_create_at("old", t0);
        store.commit_at(old, t0);
        let recent = store.get_or_create_at("recent", t0);
        store.commit_at(recent, t0 + Duration::from_secs(1000));

        let removed = store.sweep_at(t0 + TIMEOUT + Duration::from_secs(1));
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_runs_on_timer() {
        let store = Arc::new(SessionStore::new(Duration::from_secs(5), 4));
        let session = store.get_or_create("s");
        store.commit(session);

        let handle = SessionStore::spawn_sweeper(store.clone(), Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;

        assert!(store.is_empty());
        handle.abort();
    }
}
