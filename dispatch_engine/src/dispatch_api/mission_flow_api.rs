use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use serde_json::json;

use crate::{
    db_types::{
        Actor,
        Mission,
        MissionEvent,
        MissionEventType,
        MissionId,
        MissionStatus,
        NewMission,
        NewMissionEvent,
        OperatorProfile,
        Role,
    },
    dispatch_api::{
        access::{require_admin, require_participant, require_self_or_admin},
        mission_objects::settlement_snapshot,
        transitions::{check_transition, MissionAction},
        CandidateMission,
        DispatchSettings,
        PublishRequest,
    },
    events::{EventProducers, MissionCompletedEvent},
    helpers::{flat_price, round_km, towing_quote, GeoPoint, PriceQuote},
    realtime::{ActorKey, PushDelivery, RealtimeFanout, RealtimeMessage, TargetSet, Topic},
    traits::{
        BusinessRule,
        DispatchDatabase,
        DispatchError,
        MissionQueryFilter,
        MissionSwap,
        MissionSwapped,
        MissionTimestamp,
        OperatorChange,
        OperatorGuard,
    },
};

/// Reason recorded on missions cancelled by the auto-cancel scheduler.
pub const TIMEOUT_REASON: &str = "timeout";

/// `MissionFlowApi` drives missions through their lifecycle.
///
/// Every state-changing method follows the same path: check the caller's role for the edge, look the edge up in the
/// transition table, apply it with a compare-and-swap (which also appends the mission event), and only after the
/// commit, fan the change out to the mission's topics.
pub struct MissionFlowApi<B, P> {
    db: B,
    fanout: RealtimeFanout<B, P>,
    producers: EventProducers,
}

impl<B, P> Debug for MissionFlowApi<B, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MissionFlowApi")
    }
}

impl<B: Clone, P> Clone for MissionFlowApi<B, P> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), fanout: self.fanout.clone(), producers: self.producers.clone() }
    }
}

impl<B, P> MissionFlowApi<B, P> {
    pub fn new(db: B, fanout: RealtimeFanout<B, P>, producers: EventProducers) -> Self {
        Self { db, fanout, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, P> MissionFlowApi<B, P>
where
    B: DispatchDatabase,
    P: PushDelivery,
{
    /// Records a new service request for a client and prices it.
    ///
    /// Towing requests need a destination and are estimated on the client → destination leg only. Every other
    /// service gets its flat catalog price. A client can have only one open mission at a time.
    pub async fn create_mission(&self, actor: Actor, request: NewMission) -> Result<Mission, DispatchError> {
        if !(actor.is_admin() || (actor.role == Role::Client && actor.id == request.client_id)) {
            return Err(DispatchError::forbidden("Only the client (or an admin) can request a mission for a client."));
        }
        if !request.origin.is_valid() {
            return Err(DispatchError::validation(format!("{} is not a valid pickup location.", request.origin)));
        }
        if let Some(destination) = request.destination {
            if !destination.is_valid() {
                return Err(DispatchError::validation(format!("{destination} is not a valid destination.")));
            }
        }
        let settings = DispatchSettings::load(&self.db).await?;
        let estimate = match (request.service_kind.is_towing(), request.destination) {
            (true, Some(destination)) => towing_quote(&settings.towing, None, &request.origin, &destination),
            (true, None) => return Err(DispatchError::validation("Towing requests need a destination.")),
            (false, _) => flat_price(settings.catalog_price(request.service_kind)),
        };
        let mission = self.db.insert_mission(request, estimate).await?;
        info!(
            "🚚️ Mission {} ({}) created for client {}. Estimate: {}",
            mission.id, mission.service_kind, mission.client_id, mission.estimated_price
        );
        let targets = TargetSet::for_mission(&mission, false);
        self.fanout.emit_mission_event(MissionEventType::Created, &mission, &targets).await;
        Ok(mission)
    }

    /// Makes a pending mission visible to operators, optionally overriding the estimated price and distance.
    ///
    /// Connected external operators are told straight away. Available external operators who are offline but within
    /// range get a push notification.
    pub async fn publish(
        &self,
        actor: Actor,
        mission_id: MissionId,
        request: PublishRequest,
    ) -> Result<Mission, DispatchError> {
        require_role(&actor, MissionAction::Publish)?;
        request.validate()?;
        let mission = self.fetch_existing(mission_id).await?;
        let new_status = check_transition(&mission, MissionAction::Publish)?;
        let price = request.price.unwrap_or(mission.estimated_price);
        let distance = request.distance_km.or(mission.distance_km);
        let event = NewMissionEvent::new(mission_id, MissionAction::Publish.event_type(new_status))
            .by(actor.id)
            .with_metadata(json!({ "price": price.value(), "distance_km": distance }));
        let mut swap =
            MissionSwap::new(mission_id, mission.status, new_status, event).stamp(MissionTimestamp::Published);
        if !request.is_empty() {
            swap = swap.with_estimate(price, distance);
        }
        let settings = DispatchSettings::load(&self.db).await?;
        let swapped = self.apply(&mission, swap).await?;
        self.announce(MissionEventType::Published, &mission, &swapped.mission).await;
        self.push_to_offline_operators_nearby(&swapped.mission, &settings).await;
        Ok(swapped.mission)
    }

    /// Soft-assigns a published mission to one operator. The mission stays `published` until that operator accepts
    /// or refuses it. This is the only way internal operators receive work.
    pub async fn assign(
        &self,
        actor: Actor,
        mission_id: MissionId,
        operator_id: i64,
    ) -> Result<Mission, DispatchError> {
        require_role(&actor, MissionAction::Assign)?;
        let operator = self.fetch_operator(operator_id).await?;
        let mission = self.fetch_existing(mission_id).await?;
        let new_status = check_transition(&mission, MissionAction::Assign)?;
        let event = NewMissionEvent::new(mission_id, MissionAction::Assign.event_type(new_status))
            .by(actor.id)
            .with_metadata(json!({ "operator_id": operator.user_id, "previous_operator_id": mission.operator_id }));
        let swap = MissionSwap::new(mission_id, mission.status, new_status, event)
            .guard_operator(match mission.operator_id {
                Some(current) => OperatorGuard::Is(current),
                None => OperatorGuard::Unassigned,
            })
            .change_operator(OperatorChange::Assign(operator_id));
        let swapped = self.apply(&mission, swap).await?;
        info!("🚚️ Mission {mission_id} assigned to operator {operator_id} by admin {}", actor.id);
        self.announce(MissionEventType::Assigned, &mission, &swapped.mission).await;
        let message = RealtimeMessage::MissionAssigned(swapped.mission.clone());
        self.fanout.notify(ActorKey::operator(operator_id), message).await;
        Ok(swapped.mission)
    }

    /// The assigned operator hands a published mission back. It returns to the open pool.
    pub async fn refuse(&self, actor: Actor, mission_id: MissionId) -> Result<Mission, DispatchError> {
        require_role(&actor, MissionAction::Refuse)?;
        let mission = self.fetch_existing(mission_id).await?;
        let new_status = check_transition(&mission, MissionAction::Refuse)?;
        if !mission.is_assigned_to(actor.id) {
            return Err(DispatchError::forbidden(format!("Mission {mission_id} is not assigned to you.")));
        }
        let event = NewMissionEvent::new(mission_id, MissionAction::Refuse.event_type(new_status)).by(actor.id);
        let swap = MissionSwap::new(mission_id, mission.status, new_status, event)
            .guard_operator(OperatorGuard::Is(actor.id))
            .change_operator(OperatorChange::Release);
        let swapped = self.apply(&mission, swap).await?;
        info!("🚚️ Operator {} refused mission {mission_id}", actor.id);
        self.announce(MissionEventType::Refused, &mission, &swapped.mission).await;
        Ok(swapped.mission)
    }

    /// An operator takes a published mission. Exactly one operator can win this for any given mission.
    ///
    /// For towing missions the final price is locked here, using the accepting operator's current position:
    /// `max(base, per_km × (d(operator, client) + d(client, destination)))`. Other services lock the published price.
    ///
    /// Fails with
    /// * `CONFLICT` if another operator got the mission first,
    /// * a `VALIDATION` [`BusinessRule::OperatorBusy`] if the operator is still working on another mission,
    /// * a `VALIDATION` [`BusinessRule::OperatorLocationUnknown`] for towing missions if the operator has never shared
    ///   a position.
    pub async fn accept(&self, actor: Actor, mission_id: MissionId) -> Result<Mission, DispatchError> {
        require_role(&actor, MissionAction::Accept)?;
        let operator_id = actor.id;
        let mission = self.fetch_existing(mission_id).await?;
        if mission.operator_id.is_some_and(|holder| holder != operator_id) || mission.status.is_active() {
            debug!("🚚️ Operator {operator_id} lost the race for mission {mission_id}");
            return Err(DispatchError::MissionConflict(mission_id));
        }
        let new_status = check_transition(&mission, MissionAction::Accept)?;
        let operator = self.fetch_operator(operator_id).await?;
        if operator.internal && !mission.is_assigned_to(operator_id) {
            return Err(DispatchError::forbidden("Internal operators can only accept missions assigned to them."));
        }
        if let Some(busy) = self.db.active_mission_for_operator(operator_id).await? {
            return Err(BusinessRule::OperatorBusy(busy.id).into());
        }
        let settings = DispatchSettings::load(&self.db).await?;
        let locked = locked_price(&mission, operator.position(), &settings)?;
        let event = NewMissionEvent::new(mission_id, MissionAction::Accept.event_type(new_status))
            .by(operator_id)
            .with_metadata(json!({ "final_price": locked.price.value(), "distance_km": round_km(locked.distance_km) }));
        let swap = MissionSwap::new(mission_id, MissionStatus::Published, new_status, event)
            .guard_operator(OperatorGuard::UnassignedOr(operator_id))
            .change_operator(OperatorChange::Assign(operator_id))
            .lock_price(locked.price)
            .stamp(MissionTimestamp::Accepted)
            .require_idle(operator_id);
        let swapped = self.apply(&mission, swap).await?;
        info!("🚚️ Operator {operator_id} accepted mission {mission_id} at {}", locked.price);
        self.announce(MissionEventType::Accepted, &mission, &swapped.mission).await;
        Ok(swapped.mission)
    }

    /// Moves an active mission forward: `en_route`, `on_site`, `towing` (towing missions only) or `completed`.
    ///
    /// Completion stamps the finish time and opens the settlement transaction in the same atomic unit.
    pub async fn advance(
        &self,
        actor: Actor,
        mission_id: MissionId,
        target: MissionStatus,
    ) -> Result<Mission, DispatchError> {
        let action = MissionAction::advance_to(target)?;
        require_role(&actor, action)?;
        let mission = self.fetch_existing(mission_id).await?;
        if !mission.is_assigned_to(actor.id) {
            return Err(DispatchError::forbidden(format!("Mission {mission_id} is not assigned to you.")));
        }
        let new_status = check_transition(&mission, action)?;
        let event_type = action.event_type(new_status);
        let event = NewMissionEvent::new(mission_id, event_type).by(actor.id);
        let mut swap = MissionSwap::new(mission_id, mission.status, new_status, event)
            .guard_operator(OperatorGuard::Is(actor.id));
        if new_status == MissionStatus::Completed {
            let settings = DispatchSettings::load(&self.db).await?;
            swap = swap.stamp(MissionTimestamp::Finished).open_settlement(settlement_snapshot(&mission, &settings)?);
        }
        let swapped = self.apply(&mission, swap).await?;
        debug!("🚚️ {swapped}");
        self.announce(event_type, &mission, &swapped.mission).await;
        if new_status == MissionStatus::Completed {
            self.on_completed(swapped.clone()).await;
        }
        Ok(swapped.mission)
    }

    pub async fn complete(&self, actor: Actor, mission_id: MissionId) -> Result<Mission, DispatchError> {
        self.advance(actor, mission_id, MissionStatus::Completed).await
    }

    /// The client calls the mission off. Only possible before the operator is on the way.
    pub async fn cancel_by_client(
        &self,
        actor: Actor,
        mission_id: MissionId,
        reason: Option<String>,
    ) -> Result<Mission, DispatchError> {
        require_role(&actor, MissionAction::CancelByClient)?;
        let mission = self.fetch_existing(mission_id).await?;
        if mission.client_id != actor.id {
            return Err(DispatchError::forbidden(format!("Mission {mission_id} belongs to another client.")));
        }
        self.cancel(&mission, MissionAction::CancelByClient, Some(actor.id), reason).await
    }

    pub async fn cancel_by_admin(
        &self,
        actor: Actor,
        mission_id: MissionId,
        reason: Option<String>,
    ) -> Result<Mission, DispatchError> {
        require_role(&actor, MissionAction::CancelByAdmin)?;
        let mission = self.fetch_existing(mission_id).await?;
        self.cancel(&mission, MissionAction::CancelByAdmin, Some(actor.id), reason).await
    }

    /// Removes a mission for good. Its event log is kept, ending with a `deleted` event.
    ///
    /// A mission that an operator is actively working on cannot be deleted. Cancel it first.
    pub async fn delete(&self, actor: Actor, mission_id: MissionId) -> Result<Mission, DispatchError> {
        require_admin(&actor)?;
        let mission = self.fetch_existing(mission_id).await?;
        if mission.status.is_active() {
            return Err(DispatchError::InvalidTransition {
                mission: mission_id,
                from: mission.status,
                action: "delete".into(),
            });
        }
        let event = NewMissionEvent::new(mission_id, MissionEventType::Deleted).by(actor.id);
        let deleted = self
            .db
            .delete_mission(mission_id, mission.status, event)
            .await?
            .ok_or(DispatchError::MissionConflict(mission_id))?;
        warn!("🚚️ Mission {mission_id} was deleted by admin {}", actor.id);
        self.announce(MissionEventType::Deleted, &mission, &deleted).await;
        Ok(deleted)
    }

    /// Cancels every published mission that nobody took within the configured auto-cancel window.
    ///
    /// Per-mission failures are logged and skipped. Returns the missions that were cancelled.
    pub async fn expire_stale_missions(&self) -> Result<Vec<Mission>, DispatchError> {
        let settings = DispatchSettings::load(&self.db).await?;
        self.expire_missions_older_than(settings.auto_cancel_after()).await
    }

    pub async fn expire_missions_older_than(&self, max_age: Duration) -> Result<Vec<Mission>, DispatchError> {
        let cutoff = Utc::now() - max_age;
        let stale = self.db.fetch_stale_published(cutoff).await?;
        if stale.is_empty() {
            trace!("🚚️ No stale missions published before {cutoff}");
            return Ok(vec![]);
        }
        info!("🚚️ {} mission(s) published before {cutoff} are still unmatched. Cancelling them.", stale.len());
        let mut cancelled = Vec::with_capacity(stale.len());
        for mission in stale {
            match self.cancel(&mission, MissionAction::Timeout, None, Some(TIMEOUT_REASON.to_string())).await {
                Ok(m) => cancelled.push(m),
                Err(DispatchError::MissionConflict(id)) => {
                    debug!("🚚️ Mission {id} changed while it was being expired. Leaving it alone.");
                },
                Err(e) => error!("🚚️ Could not expire mission {}. {e}", mission.id),
            }
        }
        Ok(cancelled)
    }

    /// Attaches a photo (already uploaded elsewhere) to the mission's log.
    pub async fn record_photo(
        &self,
        actor: Actor,
        mission_id: MissionId,
        url: &str,
    ) -> Result<MissionEvent, DispatchError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(DispatchError::validation("The photo URL is empty."));
        }
        let mission = self.fetch_existing(mission_id).await?;
        require_participant(&actor, &mission)?;
        let event = NewMissionEvent::new(mission_id, MissionEventType::PhotoAdded)
            .by(actor.id)
            .with_metadata(json!({ "url": url, "role": actor.role }));
        let event = self.db.append_mission_event(event).await?;
        debug!("🚚️ Photo added to mission {mission_id} by {actor}");
        let targets = TargetSet::for_mission(&mission, false);
        self.fanout.emit_mission_event(MissionEventType::PhotoAdded, &mission, &targets).await;
        Ok(event)
    }

    /// The mission's event log, oldest first. Visible to admins, the owning client and the assigned operator.
    pub async fn mission_history(
        &self,
        actor: Actor,
        mission_id: MissionId,
    ) -> Result<Vec<MissionEvent>, DispatchError> {
        let mission = self.fetch_existing(mission_id).await?;
        require_participant(&actor, &mission)?;
        self.db.fetch_mission_events(mission_id).await
    }

    /// Subscribes the actor's live session to the mission's own topic, e.g. to follow the operator's position.
    pub async fn watch_mission(&self, actor: Actor, mission_id: MissionId) -> Result<(), DispatchError> {
        let mission = self.fetch_existing(mission_id).await?;
        require_participant(&actor, &mission)?;
        self.fanout.presence().watch_mission(ActorKey::from(actor), mission_id);
        Ok(())
    }

    pub async fn fetch_mission(&self, actor: Actor, mission_id: MissionId) -> Result<Mission, DispatchError> {
        let mission = self.fetch_existing(mission_id).await?;
        let on_offer = mission.status == MissionStatus::Published && mission.is_unassigned();
        if !(actor.role == Role::Operator && on_offer) {
            require_participant(&actor, &mission)?;
        }
        Ok(mission)
    }

    /// The missions an operator may work on right now.
    ///
    /// That is every open mission the operator holds, plus (for external operators with a known position) the
    /// published, unassigned missions within range. Towing missions use the larger towing radius. The operator's
    /// active mission comes first, then everything else by creation time.
    pub async fn candidate_missions(&self, actor: Actor) -> Result<Vec<CandidateMission>, DispatchError> {
        if actor.role != Role::Operator {
            return Err(DispatchError::forbidden("Only operators have candidate missions."));
        }
        let operator = self.fetch_operator(actor.id).await?;
        let settings = DispatchSettings::load(&self.db).await?;
        let position = operator.position();
        let mut missions = self.db.fetch_missions_for_operator(actor.id).await?;
        if operator.is_external() {
            if let Some(pos) = position {
                let pool = self.db.fetch_unassigned_published().await?;
                missions.extend(pool.into_iter().filter(|m| {
                    pos.distance_to(&m.origin()) <= settings.radius_for(m.service_kind)
                }));
            } else {
                debug!("🚚️ Operator {} has no position. Only held missions are offered.", actor.id);
            }
        }
        missions.sort_by_key(|m| (!m.status.is_active(), m.created_at, m.id));
        let candidates = missions
            .into_iter()
            .map(|mission| {
                let distance_km = position.map(|p| round_km(p.distance_to(&mission.origin())));
                let preview_price = match (mission.final_price, position, mission.destination()) {
                    (Some(locked), _, _) => locked,
                    (None, Some(p), Some(dest)) if mission.service_kind.is_towing() => {
                        towing_quote(&settings.towing, Some(&p), &mission.origin(), &dest).price
                    },
                    _ => mission.estimated_price,
                };
                CandidateMission { mission, distance_km, preview_price }
            })
            .collect::<Vec<_>>();
        trace!("🚚️ {} candidate mission(s) for operator {}", candidates.len(), actor.id);
        Ok(candidates)
    }

    pub async fn active_mission_for_client(
        &self,
        actor: Actor,
        client_id: i64,
    ) -> Result<Option<Mission>, DispatchError> {
        require_self_or_admin(&actor, Role::Client, client_id)?;
        self.db.active_mission_for_client(client_id).await
    }

    pub async fn active_mission_for_operator(
        &self,
        actor: Actor,
        operator_id: i64,
    ) -> Result<Option<Mission>, DispatchError> {
        require_self_or_admin(&actor, Role::Operator, operator_id)?;
        self.db.active_mission_for_operator(operator_id).await
    }

    pub async fn search_missions(
        &self,
        actor: Actor,
        query: MissionQueryFilter,
    ) -> Result<Vec<Mission>, DispatchError> {
        require_admin(&actor)?;
        self.db.search_missions(query).await
    }

    //-------------------------------------------  internals  ---------------------------------------------------------

    async fn fetch_existing(&self, mission_id: MissionId) -> Result<Mission, DispatchError> {
        self.db.fetch_mission(mission_id).await?.ok_or(DispatchError::MissionNotFound(mission_id))
    }

    async fn fetch_operator(&self, operator_id: i64) -> Result<OperatorProfile, DispatchError> {
        self.db.fetch_operator(operator_id).await?.ok_or(DispatchError::OperatorNotFound(operator_id))
    }

    /// Runs the compare-and-swap. A miss means someone else changed the mission after we read it.
    async fn apply(&self, mission: &Mission, swap: MissionSwap) -> Result<MissionSwapped, DispatchError> {
        self.db.swap_mission(swap).await?.ok_or(DispatchError::MissionConflict(mission.id))
    }

    async fn cancel(
        &self,
        mission: &Mission,
        action: MissionAction,
        actor_id: Option<i64>,
        reason: Option<String>,
    ) -> Result<Mission, DispatchError> {
        let new_status = check_transition(mission, action)?;
        let event_type = action.event_type(new_status);
        let mut event = NewMissionEvent::new(mission.id, event_type);
        if let Some(id) = actor_id {
            event = event.by(id);
        }
        if let Some(reason) = &reason {
            event = event.with_metadata(json!({ "reason": reason }));
        }
        let guard = match (action, mission.operator_id) {
            (MissionAction::Timeout, _) | (_, None) => OperatorGuard::Unassigned,
            (_, Some(operator_id)) => OperatorGuard::Is(operator_id),
        };
        let mut swap = MissionSwap::new(mission.id, mission.status, new_status, event).guard_operator(guard);
        if let Some(reason) = reason {
            swap = swap.with_cancel_reason(reason);
        }
        let swapped = self.apply(mission, swap).await?;
        info!("🚚️ Mission {} cancelled ({action}). Was {}", mission.id, mission.status);
        self.announce(event_type, mission, &swapped.mission).await;
        Ok(swapped.mission)
    }

    /// Fans a transition out to everyone with a stake in the mission, before or after the change.
    async fn announce(&self, event: MissionEventType, before: &Mission, after: &Mission) {
        let mut targets = TargetSet::for_mission(after, false);
        if let Some(previous) = before.operator_id.filter(|id| Some(*id) != after.operator_id) {
            targets = targets.with(Topic::Operator(previous));
        }
        let was_open = before.status == MissionStatus::Published && before.is_unassigned();
        let is_open = after.status == MissionStatus::Published && after.is_unassigned();
        if was_open || is_open {
            targets = targets.with(Topic::ExternalOperators);
        }
        self.fanout.emit_mission_event(event, after, &targets).await;
    }

    async fn on_completed(&self, swapped: MissionSwapped) {
        let MissionSwapped { mission, transaction, .. } = swapped;
        if let Some(tx) = &transaction {
            info!(
                "🚚️💰️ Mission {} completed. Transaction #{} for {} is pending",
                mission.id, tx.id, tx.amount
            );
            let admins = TargetSet::new().with(Topic::Admins);
            self.fanout.publish(&admins, RealtimeMessage::TransactionUpdated(tx.clone())).await;
        }
        debug!("🚚️📬️ Notifying mission completed hook subscribers");
        self.producers.mission_completed(MissionCompletedEvent::new(mission, transaction)).await;
    }

    async fn push_to_offline_operators_nearby(&self, mission: &Mission, settings: &DispatchSettings) {
        let Some(note) = RealtimeMessage::NewMissionAvailable(mission.clone()).push_notification(Role::Operator) else {
            return;
        };
        let operators = match self.db.fetch_external_available_operators().await {
            Ok(ops) => ops,
            Err(e) => {
                warn!("🚚️ Could not look up operators to notify about mission {}. {e}", mission.id);
                return;
            },
        };
        let radius = settings.radius_for(mission.service_kind);
        let presence = self.fanout.presence();
        let mut notified = 0;
        for operator in operators {
            if presence.is_operator_online(operator.user_id) {
                continue;
            }
            let in_range = operator.position().is_some_and(|p| p.distance_to(&mission.origin()) <= radius);
            if !in_range {
                continue;
            }
            match self.fanout.push_to_user(operator.user_id, &note).await {
                Ok(_) => notified += 1,
                Err(e) => warn!("🔔️ Could not push mission {} to operator {}. {e}", mission.id, operator.user_id),
            }
        }
        debug!("🚚️🔔️ {notified} offline operator(s) near mission {} were notified", mission.id);
    }
}

/// Works out the price to lock when `mission` is accepted by an operator at `position`.
fn locked_price(
    mission: &Mission,
    position: Option<GeoPoint>,
    settings: &DispatchSettings,
) -> Result<PriceQuote, DispatchError> {
    if !mission.service_kind.is_towing() {
        return Ok(PriceQuote { distance_km: 0.0, price: mission.estimated_price });
    }
    let position = position.ok_or(BusinessRule::OperatorLocationUnknown)?;
    let destination = mission
        .destination()
        .ok_or_else(|| DispatchError::validation(format!("Towing mission {} has no destination.", mission.id)))?;
    Ok(towing_quote(&settings.towing, Some(&position), &mission.origin(), &destination))
}

fn require_role(actor: &Actor, action: MissionAction) -> Result<(), DispatchError> {
    match action.role() {
        Some(role) if role == actor.role => Ok(()),
        Some(role) => Err(DispatchError::forbidden(format!("Only a {role} can {action} a mission."))),
        None => Err(DispatchError::forbidden(format!("'{action}' can only be performed by the system."))),
    }
}
