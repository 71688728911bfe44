use std::{collections::HashSet, fmt::Debug};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Actor, NewOperator, OperatorFlags, OperatorProfile, PushToken, Role},
    dispatch_api::access::{require_admin, require_self_or_admin},
    helpers::GeoPoint,
    realtime::{
        ActorKey,
        Connection,
        OnlineOperator,
        OperatorMeta,
        PushDelivery,
        RealtimeFanout,
        RealtimeMessage,
        TargetSet,
        Topic,
    },
    traits::{DispatchDatabase, DispatchError},
};

/// An online operator, and whether they are busy on a mission right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPresence {
    #[serde(flatten)]
    pub operator: OnlineOperator,
    pub has_active_mission: bool,
}

/// `OperatorApi` manages operator profiles, live connections, and push tokens. It also answers the presence queries
/// used by the admin dashboards.
pub struct OperatorApi<B, P> {
    db: B,
    fanout: RealtimeFanout<B, P>,
}

impl<B, P> Debug for OperatorApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OperatorApi")
    }
}

impl<B: Clone, P> Clone for OperatorApi<B, P> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), fanout: self.fanout.clone() }
    }
}

impl<B, P> OperatorApi<B, P> {
    pub fn new(db: B, fanout: RealtimeFanout<B, P>) -> Self {
        Self { db, fanout }
    }
}

impl<B, P> OperatorApi<B, P>
where
    B: DispatchDatabase,
    P: PushDelivery,
{
    /// Creates the operator's profile if it does not exist yet. Only admins can create internal operators.
    pub async fn register_operator(
        &self,
        actor: Actor,
        operator: NewOperator,
    ) -> Result<OperatorProfile, DispatchError> {
        require_self_or_admin(&actor, Role::Operator, operator.user_id)?;
        if operator.internal && !actor.is_admin() {
            return Err(DispatchError::forbidden("Only admins can add operators to the internal fleet."));
        }
        if let Some(position) = operator.position {
            validate_position(&position)?;
        }
        self.db.upsert_operator(operator).await
    }

    pub async fn fetch_operator(&self, actor: Actor, operator_id: i64) -> Result<OperatorProfile, DispatchError> {
        require_self_or_admin(&actor, Role::Operator, operator_id)?;
        self.db.fetch_operator(operator_id).await?.ok_or(DispatchError::OperatorNotFound(operator_id))
    }

    /// Stores the operator's latest position. If they are working on a mission, the mission's watchers get the new
    /// position right away.
    pub async fn update_location(&self, actor: Actor, position: GeoPoint) -> Result<OperatorProfile, DispatchError> {
        if actor.role != Role::Operator {
            return Err(DispatchError::forbidden("Only operators report a location."));
        }
        validate_position(&position)?;
        let profile = self.db.update_operator_location(actor.id, position).await?;
        trace!("🚚️ Operator {} is now at {position}", actor.id);
        if let Some(mission) = self.db.active_mission_for_operator(actor.id).await? {
            let message = RealtimeMessage::OperatorLocation {
                mission_id: mission.id,
                operator_id: actor.id,
                lat: position.lat,
                lng: position.lng,
            };
            self.fanout.publish(&TargetSet::new().with(Topic::Mission(mission.id)), message).await;
        }
        Ok(profile)
    }

    /// Changes operator flags. Only admins decide who belongs to the internal fleet. Availability, alert opt-in and
    /// zones are the operator's own choice (admins can change them too).
    pub async fn update_flags(
        &self,
        actor: Actor,
        operator_id: i64,
        flags: OperatorFlags,
    ) -> Result<OperatorProfile, DispatchError> {
        require_self_or_admin(&actor, Role::Operator, operator_id)?;
        if flags.internal.is_some() {
            require_admin(&actor)?;
        }
        if flags.is_empty() {
            return self.db.fetch_operator(operator_id).await?.ok_or(DispatchError::OperatorNotFound(operator_id));
        }
        let profile = self.db.update_operator_flags(operator_id, flags).await?;
        let meta = OperatorMeta { internal: profile.internal, available: profile.available };
        self.fanout.presence().update_operator_meta(operator_id, meta);
        debug!("🚚️ Operator {operator_id} flags updated by {actor}: {meta:?}");
        Ok(profile)
    }

    /// Opens a live session for the actor. Operators are classified (internal or external) from their profile as they
    /// connect. A previous session of the same actor is told it was replaced, then closed.
    pub async fn connect(&self, actor: Actor) -> Result<Connection, DispatchError> {
        let meta = match actor.role {
            Role::Operator => {
                let profile =
                    self.db.fetch_operator(actor.id).await?.ok_or(DispatchError::OperatorNotFound(actor.id))?;
                Some(OperatorMeta { internal: profile.internal, available: profile.available })
            },
            _ => None,
        };
        Ok(self.fanout.presence().connect(ActorKey::from(actor), meta))
    }

    pub fn disconnect(&self, connection: &Connection) -> bool {
        self.fanout.presence().disconnect(connection.key, connection.session_id)
    }

    pub async fn register_push_token(
        &self,
        actor: Actor,
        token: &str,
        platform: Option<&str>,
    ) -> Result<PushToken, DispatchError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DispatchError::validation("The push token is empty."));
        }
        let saved = self.db.register_push_token(actor.id, token, platform).await?;
        debug!("🔔️ Push token registered for {actor}");
        Ok(saved)
    }

    /// Forgets a device token, e.g. when the user logs out on that device.
    pub async fn remove_push_token(&self, actor: Actor, token: &str) -> Result<bool, DispatchError> {
        let owned = self.db.push_tokens_for(actor.id).await?.into_iter().any(|t| t.token == token);
        if !owned {
            return Ok(false);
        }
        let removed = self.db.remove_push_tokens(&[token.to_string()]).await?;
        Ok(removed > 0)
    }

    pub fn is_operator_online(&self, operator_id: i64) -> bool {
        self.fanout.presence().is_operator_online(operator_id)
    }

    pub fn online_admin_ids(&self) -> Vec<i64> {
        self.fanout.presence().online_ids(Role::Admin)
    }

    pub async fn online_operators(&self) -> Result<Vec<OperatorPresence>, DispatchError> {
        let busy = self.db.busy_operator_ids().await?.into_iter().collect::<HashSet<_>>();
        let online = self
            .fanout
            .presence()
            .online_operators()
            .into_iter()
            .map(|operator| {
                let has_active_mission = busy.contains(&operator.operator_id);
                OperatorPresence { operator, has_active_mission }
            })
            .collect();
        Ok(online)
    }
}

fn validate_position(position: &GeoPoint) -> Result<(), DispatchError> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(DispatchError::validation(format!("{position} is not a valid position.")))
    }
}
