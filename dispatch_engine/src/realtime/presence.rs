//! # Presence registry
//!
//! Tracks who is connected right now, and how to reach them. One session per `(role, id)`: a new connection for an
//! actor that is already connected evicts the old one, which is told why before its channel is closed.
//!
//! The registry is an explicitly-owned service. Create one at startup, hand clones to whoever needs it (they share
//! state), and call [`PresenceRegistry::shutdown`] when the process stops. Nothing here is persisted; after a restart
//! actors simply reconnect.
//!
//! Internally the registry uses [`DashMap`], whose guards are never held across an `.await` or across a call into
//! another map.
use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::*;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    db_types::{Actor, MissionId, Role},
    realtime::{RealtimeMessage, Topic},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorKey {
    pub role: Role,
    pub id: i64,
}

impl ActorKey {
    pub fn new(role: Role, id: i64) -> Self {
        Self { role, id }
    }

    pub fn admin(id: i64) -> Self {
        Self::new(Role::Admin, id)
    }

    pub fn operator(id: i64) -> Self {
        Self::new(Role::Operator, id)
    }

    pub fn client(id: i64) -> Self {
        Self::new(Role::Client, id)
    }
}

impl From<Actor> for ActorKey {
    fn from(actor: Actor) -> Self {
        Self::new(actor.role, actor.id)
    }
}

/// Operator classification captured when the operator connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorMeta {
    pub internal: bool,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineOperator {
    pub operator_id: i64,
    pub internal: bool,
    pub available: bool,
    pub connected_at: DateTime<Utc>,
}

struct Session {
    session_id: u64,
    sender: mpsc::UnboundedSender<RealtimeMessage>,
    connected_at: DateTime<Utc>,
    operator: Option<OperatorMeta>,
}

/// The receiving end of a registered session. Dropping it (or calling [`PresenceRegistry::disconnect`]) ends the
/// session.
pub struct Connection {
    pub key: ActorKey,
    pub session_id: u64,
    pub receiver: mpsc::UnboundedReceiver<RealtimeMessage>,
}

#[derive(Default)]
struct PresenceState {
    sessions: DashMap<ActorKey, Session>,
    watchers: DashMap<MissionId, HashSet<ActorKey>>,
    next_session: AtomicU64,
}

#[derive(Clone, Default)]
pub struct PresenceRegistry {
    state: Arc<PresenceState>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session for `key`. Any existing session for the same key is sent
    /// [`RealtimeMessage::SessionReplaced`] and then dropped, which closes its channel.
    pub fn connect(&self, key: ActorKey, operator: Option<OperatorMeta>) -> Connection {
        let (sender, receiver) = mpsc::unbounded_channel();
        let session_id = self.state.next_session.fetch_add(1, Ordering::SeqCst) + 1;
        let operator = if key.role == Role::Operator { operator } else { None };
        let session = Session { session_id, sender, connected_at: Utc::now(), operator };
        if let Some(old) = self.state.sessions.insert(key, session) {
            info!("📡️ {} {} connected again. Evicting session {}", key.role, key.id, old.session_id);
            let _ = old.sender.send(RealtimeMessage::SessionReplaced);
        } else {
            debug!("📡️ {} {} connected (session {session_id})", key.role, key.id);
        }
        Connection { key, session_id, receiver }
    }

    /// Removes the session, but only if it is still the current one for `key`. A stale disconnect from an evicted
    /// session never removes its replacement.
    pub fn disconnect(&self, key: ActorKey, session_id: u64) -> bool {
        let removed = self.state.sessions.remove_if(&key, |_, s| s.session_id == session_id).is_some();
        if removed {
            self.state.watchers.iter_mut().for_each(|mut w| {
                w.value_mut().remove(&key);
            });
            self.state.watchers.retain(|_, w| !w.is_empty());
            debug!("📡️ {} {} disconnected (session {session_id})", key.role, key.id);
        }
        removed
    }

    /// Adds the actor to a mission's watchers, e.g. a client following the operator's position.
    pub fn watch_mission(&self, key: ActorKey, mission_id: MissionId) {
        self.state.watchers.entry(mission_id).or_default().insert(key);
    }

    pub fn unwatch_mission(&self, key: ActorKey, mission_id: MissionId) {
        if let Some(mut watchers) = self.state.watchers.get_mut(&mission_id) {
            watchers.remove(&key);
        }
        self.state.watchers.remove_if(&mission_id, |_, w| w.is_empty());
    }

    /// Sends a message to one actor. Returns `false` if the actor is offline. A session whose receiver has gone away
    /// is cleaned up.
    pub fn send(&self, key: ActorKey, message: RealtimeMessage) -> bool {
        let target = self.state.sessions.get(&key).map(|s| (s.session_id, s.sender.clone()));
        let Some((session_id, sender)) = target else {
            return false;
        };
        if sender.send(message).is_err() {
            trace!("📡️ Session {session_id} for {} {} is gone", key.role, key.id);
            self.disconnect(key, session_id);
            return false;
        }
        true
    }

    pub fn is_online(&self, key: ActorKey) -> bool {
        self.state.sessions.contains_key(&key)
    }

    pub fn is_operator_online(&self, operator_id: i64) -> bool {
        self.is_online(ActorKey::operator(operator_id))
    }

    /// Ids of every connected actor with the given role, in ascending order.
    pub fn online_ids(&self, role: Role) -> Vec<i64> {
        let mut ids =
            self.state.sessions.iter().filter(|e| e.key().role == role).map(|e| e.key().id).collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    pub fn online_operators(&self) -> Vec<OnlineOperator> {
        let mut operators = self
            .state
            .sessions
            .iter()
            .filter(|e| e.key().role == Role::Operator)
            .map(|e| {
                let meta = e.value().operator.unwrap_or(OperatorMeta { internal: false, available: true });
                OnlineOperator {
                    operator_id: e.key().id,
                    internal: meta.internal,
                    available: meta.available,
                    connected_at: e.value().connected_at,
                }
            })
            .collect::<Vec<_>>();
        operators.sort_by_key(|o| o.operator_id);
        operators
    }

    /// Refreshes the classification of a connected operator after an admin changes it.
    pub fn update_operator_meta(&self, operator_id: i64, meta: OperatorMeta) {
        if let Some(mut session) = self.state.sessions.get_mut(&ActorKey::operator(operator_id)) {
            session.operator = Some(meta);
        }
    }

    /// The connected actors that a broadcast topic reaches right now. Direct topics (a specific operator or client)
    /// resolve to that actor whether or not they are online.
    pub fn recipients(&self, topic: &Topic) -> Vec<ActorKey> {
        match topic {
            Topic::Admins => self.online_ids(Role::Admin).into_iter().map(ActorKey::admin).collect(),
            Topic::ExternalOperators => self
                .state
                .sessions
                .iter()
                .filter(|e| e.key().role == Role::Operator && e.value().operator.map(|m| !m.internal).unwrap_or(true))
                .map(|e| *e.key())
                .collect(),
            Topic::Operator(id) => vec![ActorKey::operator(*id)],
            Topic::Client(id) => vec![ActorKey::client(*id)],
            Topic::Mission(id) => {
                self.state.watchers.get(id).map(|w| w.iter().copied().collect()).unwrap_or_default()
            },
        }
    }

    pub fn session_count(&self) -> usize {
        self.state.sessions.len()
    }

    /// Tells every connected actor the process is going away, then drops all sessions.
    pub fn shutdown(&self) {
        let keys = self.state.sessions.iter().map(|e| *e.key()).collect::<Vec<_>>();
        info!("📡️ Closing {} realtime session(s)", keys.len());
        for key in keys {
            if let Some((_, session)) = self.state.sessions.remove(&key) {
                let _ = session.sender.send(RealtimeMessage::Shutdown);
            }
        }
        self.state.watchers.clear();
    }
}
