use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rand::Rng;
use tracing::{debug, info};

use super::models::{SessionEntry, SessionId, SessionSnapshot};
use crate::{
    error::{GameError, GameResult},
    game::GameState,
};

/// In-memory map of live sessions with idle expiry.
///
/// Different sessions never share mutable data; callers mutate one state at
/// a time through [`SessionStore::update`].
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store whose sessions expire after `ttl` without activity.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// True when no sessions are stored.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Store `state` under a fresh identifier.
    pub fn create<R: Rng + ?Sized>(&self, state: GameState, rng: &mut R) -> SessionId {
        self.create_at(state, rng, Utc::now())
    }

    fn create_at<R: Rng + ?Sized>(
        &self,
        state: GameState,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> SessionId {
        let mut sessions = self.sessions.write();
        let mut id = SessionId::generate(rng);
        while sessions.contains_key(&id) {
            id = SessionId::generate(rng);
        }
        debug!(session = %id, player = %state.player_name, "Session created");
        sessions.insert(
            id,
            SessionEntry {
                state,
                created_at: now,
                last_seen: now,
            },
        );
        id
    }

    /// Copy of the session, refreshing its idle timer.
    pub fn get(&self, id: &SessionId) -> GameResult<SessionSnapshot> {
        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| GameError::SessionNotFound(id.to_string()))?;
        entry.last_seen = Utc::now();
        Ok(SessionSnapshot {
            id: *id,
            state: entry.state.clone(),
            created_at: entry.created_at,
            last_seen: entry.last_seen,
        })
    }

    /// Run `f` against the stored state under the write lock.
    pub fn update<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut GameState) -> GameResult<T>,
    ) -> GameResult<T> {
        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| GameError::SessionNotFound(id.to_string()))?;
        entry.last_seen = Utc::now();
        f(&mut entry.state)
    }

    /// Drop a session, returning its final state.
    pub fn remove(&self, id: &SessionId) -> Option<GameState> {
        let removed = self.sessions.write().remove(id).map(|entry| entry.state);
        if removed.is_some() {
            debug!(session = %id, "Session removed");
        }
        removed
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, entry| now - entry.last_seen <= ttl);
        let purged = before - sessions.len();
        if purged > 0 {
            info!(purged, remaining = sessions.len(), "Expired sessions purged");
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Outcome;
    use rand::{rngs::StdRng, SeedableRng};

    fn sample_state() -> GameState {
        serde_json::from_value(serde_json::json!({
            "player_name": "Aino",
            "start_airport": "EFHK",
            "current_airport": "EFHK",
            "visited_airports": ["EFHK"],
            "remaining_time": 420.0,
            "remaining_distance": 3000.0,
            "goal_airports": ["EFOU"],
            "initial_goals": ["EFOU"],
            "difficulty": "normal",
            "starting_budget": {"time": 420.0, "distance": 3000.0}
        }))
        .expect("valid state")
    }

    #[test]
    fn create_get_update_remove() {
        let store = SessionStore::new(Duration::minutes(60));
        let mut rng = StdRng::seed_from_u64(9);
        let id = store.create(sample_state(), &mut rng);
        assert_eq!(store.len(), 1);

        let snapshot = store.get(&id).unwrap();
        assert_eq!(snapshot.state.player_name, "Aino");

        let outcome = store
            .update(&id, |state| {
                Ok(state.commit("EFOU", 500.0, 75.0))
            })
            .unwrap();
        assert_eq!(outcome, Outcome::Victory);
        assert_eq!(store.get(&id).unwrap().state.current_airport, "EFOU");

        let removed = store.remove(&id).unwrap();
        assert!(removed.is_finished());
        assert!(store.is_empty());
        assert_eq!(
            store.get(&id).unwrap_err(),
            GameError::SessionNotFound(id.to_string())
        );
    }

    #[test]
    fn failed_update_keeps_state() {
        let store = SessionStore::new(Duration::minutes(60));
        let id = store.create(sample_state(), &mut StdRng::seed_from_u64(1));
        let result: GameResult<()> = store.update(&id, |_| Err(GameError::GameFinished));
        assert_eq!(result.unwrap_err(), GameError::GameFinished);
        assert_eq!(store.get(&id).unwrap().state, sample_state());
    }

    #[test]
    fn purges_idle_sessions() {
        let store = SessionStore::new(Duration::minutes(30));
        let mut rng = StdRng::seed_from_u64(2);
        let now = Utc::now();
        let stale = store.create_at(sample_state(), &mut rng, now - Duration::minutes(45));
        let fresh = store.create_at(sample_state(), &mut rng, now - Duration::minutes(5));

        assert_eq!(store.purge_expired(now), 1);
        assert!(store.get(&stale).is_err());
        assert!(store.get(&fresh).is_ok());
    }

    #[test]
    fn session_ids_round_trip_through_text() {
        let id = SessionId::generate(&mut StdRng::seed_from_u64(5));
        let text = id.to_string();
        assert_eq!(text.len(), 32);
        assert_eq!(text.parse::<SessionId>().unwrap(), id);
        assert!("not-a-session".parse::<SessionId>().is_err());
    }
}
