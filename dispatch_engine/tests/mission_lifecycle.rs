use chrono::Duration;
use dispatch_engine::{
    db_types::{Actor, Amount, MissionEventType, MissionStatus, NewMission, ServiceKind},
    dispatch_api::settings::keys,
    helpers::GeoPoint,
    realtime::RealtimeMessage,
    traits::{BusinessRule, ErrorKind, SettingsStore},
    PublishRequest,
};
use log::*;

use crate::support::engine::{bamako, TestEngine, ADMIN};

mod support;

#[tokio::test]
async fn towing_price_is_locked_with_the_acceptors_position() {
    let engine = TestEngine::new().await;
    engine.db.store_setting(keys::TOWING_PRICE_PER_KM, "500").await.unwrap();
    engine.add_operator(10, Some(GeoPoint::new(12.63, -8.01))).await;
    let mission = engine.published_mission(100, ServiceKind::Towing).await;
    // About 6.4 km from client to destination. The base price dominates.
    assert_eq!(mission.estimated_price, Amount::from(10_000));
    assert_eq!(mission.final_price, None);

    let accepted = engine.missions.accept(Actor::operator(10), mission.id).await.unwrap();
    assert_eq!(accepted.status, MissionStatus::Accepted);
    assert_eq!(accepted.operator_id, Some(10));
    assert_eq!(accepted.final_price, Some(Amount::from(10_000)));
    assert!(accepted.accepted_at.is_some());
    engine.tear_down().await;
}

#[tokio::test]
async fn distance_pricing_takes_over_from_the_base_price() {
    let engine = TestEngine::new().await;
    engine.db.store_setting(keys::TOWING_PRICE_PER_KM, "2000").await.unwrap();
    engine.add_operator(10, Some(GeoPoint::new(12.63, -8.01))).await;
    let mission = engine.published_mission(100, ServiceKind::Towing).await;
    let accepted = engine.missions.accept(Actor::operator(10), mission.id).await.unwrap();
    let locked = accepted.final_price.expect("final price is locked on acceptance").value();
    // 1.55 km approach plus 6.37 km tow
    assert!((15_700..=16_000).contains(&locked), "unexpected towing price {locked}");
    assert!(accepted.estimated_price.value() < locked);
    engine.tear_down().await;
}

#[tokio::test]
async fn towing_needs_the_operators_position() {
    let engine = TestEngine::new().await;
    engine.add_operator(10, None).await;
    let mission = engine.published_mission(100, ServiceKind::Towing).await;
    let err = engine.missions.accept(Actor::operator(10), mission.id).await.unwrap_err();
    assert!(err.is_business_rule(&BusinessRule::OperatorLocationUnknown));
    assert_eq!(err.kind(), ErrorKind::Validation);
    engine.tear_down().await;
}

#[tokio::test]
async fn exactly_one_operator_wins_a_mission() {
    let engine = TestEngine::new().await;
    engine.add_operator(10, Some(GeoPoint::new(12.63, -8.01))).await;
    engine.add_operator(11, Some(GeoPoint::new(12.61, -7.99))).await;
    let mission = engine.published_mission(100, ServiceKind::BatteryBoost).await;

    let (a, b) = tokio::join!(
        engine.missions.accept(Actor::operator(10), mission.id),
        engine.missions.accept(Actor::operator(11), mission.id)
    );
    let (winner, loser) = match (a, b) {
        (Ok(m), Err(e)) | (Err(e), Ok(m)) => (m, e),
        (a, b) => panic!("Expected exactly one winner. Got {a:?} and {b:?}"),
    };
    info!("🚀️ Operator {:?} won the mission. The other got: {loser}", winner.operator_id);
    assert_eq!(loser.kind(), ErrorKind::Conflict);
    assert_eq!(winner.status, MissionStatus::Accepted);

    let history = engine.missions.mission_history(ADMIN, mission.id).await.unwrap();
    let accepted = history.iter().filter(|e| e.event_type == MissionEventType::Accepted).count();
    assert_eq!(accepted, 1);
    let stored = engine.missions.fetch_mission(ADMIN, mission.id).await.unwrap();
    assert_eq!(stored.operator_id, winner.operator_id);
    engine.tear_down().await;
}

#[tokio::test]
async fn a_busy_operator_cannot_take_a_second_mission() {
    let engine = TestEngine::new().await;
    engine.add_operator(10, Some(GeoPoint::new(12.63, -8.01))).await;
    let first = engine.published_mission(100, ServiceKind::BatteryBoost).await;
    let second = engine.published_mission(101, ServiceKind::TireChange).await;
    engine.missions.accept(Actor::operator(10), first.id).await.unwrap();

    let err = engine.missions.accept(Actor::operator(10), second.id).await.unwrap_err();
    assert!(err.is_business_rule(&BusinessRule::OperatorBusy(first.id)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    let untouched = engine.missions.fetch_mission(ADMIN, second.id).await.unwrap();
    assert_eq!(untouched.status, MissionStatus::Published);
    assert_eq!(untouched.operator_id, None);

    for status in [MissionStatus::EnRoute, MissionStatus::OnSite, MissionStatus::Completed] {
        engine.missions.advance(Actor::operator(10), first.id, status).await.unwrap();
    }
    let accepted = engine.missions.accept(Actor::operator(10), second.id).await.unwrap();
    assert_eq!(accepted.final_price, Some(second.estimated_price));
    engine.tear_down().await;
}

#[tokio::test]
async fn steps_cannot_be_skipped() {
    let engine = TestEngine::new().await;
    engine.add_operator(10, Some(GeoPoint::new(12.63, -8.01))).await;
    let mission = engine.published_mission(100, ServiceKind::Towing).await;
    let operator = Actor::operator(10);
    let err = engine.missions.complete(operator, mission.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden, "not assigned yet");
    engine.missions.accept(operator, mission.id).await.unwrap();
    let err = engine.missions.complete(operator, mission.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    engine.missions.advance(operator, mission.id, MissionStatus::EnRoute).await.unwrap();
    engine.missions.advance(operator, mission.id, MissionStatus::OnSite).await.unwrap();
    let err = engine.missions.complete(operator, mission.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition, "towing missions must tow before completing");
    let err = engine.missions.cancel_by_client(Actor::client(100), mission.id, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition, "too late for the client to cancel");
    let cancelled = engine.missions.cancel_by_admin(ADMIN, mission.id, Some("breakdown".into())).await.unwrap();
    assert_eq!(cancelled.status, MissionStatus::CancelledByAdmin);
    assert_eq!(cancelled.cancel_reason.as_deref(), Some("breakdown"));
    engine.tear_down().await;
}

#[tokio::test]
async fn internal_operators_work_on_assignment_only() {
    let engine = TestEngine::new().await;
    engine.add_internal_operator(20, bamako()).await;
    let mission = engine.published_mission(100, ServiceKind::Lockout).await;
    let err = engine.missions.accept(Actor::operator(20), mission.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let mut connection = engine.operators.connect(Actor::operator(20)).await.unwrap();
    let assigned = engine.missions.assign(ADMIN, mission.id, 20).await.unwrap();
    assert_eq!(assigned.status, MissionStatus::Published);
    assert_eq!(assigned.operator_id, Some(20));
    let mut got_assignment = false;
    while let Ok(message) = connection.receiver.try_recv() {
        got_assignment |= matches!(message, RealtimeMessage::MissionAssigned(m) if m.id == mission.id);
    }
    assert!(got_assignment);

    let refused = engine.missions.refuse(Actor::operator(20), mission.id).await.unwrap();
    assert_eq!(refused.operator_id, None);
    assert_eq!(refused.status, MissionStatus::Published);
    engine.missions.assign(ADMIN, mission.id, 20).await.unwrap();
    let accepted = engine.missions.accept(Actor::operator(20), mission.id).await.unwrap();
    assert_eq!(accepted.status, MissionStatus::Accepted);
    engine.tear_down().await;
}

#[tokio::test]
async fn unmatched_missions_are_cancelled_after_the_window() {
    let engine = TestEngine::new().await;
    let stale = engine.published_mission(100, ServiceKind::FuelDelivery).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let none = engine.missions.expire_missions_older_than(Duration::minutes(30)).await.unwrap();
    assert!(none.is_empty());
    let cancelled = engine.missions.expire_missions_older_than(Duration::zero()).await.unwrap();
    assert_eq!(cancelled.len(), 1);
    assert_eq!(cancelled[0].id, stale.id);
    assert_eq!(cancelled[0].status, MissionStatus::CancelledByAdmin);
    assert_eq!(cancelled[0].cancel_reason.as_deref(), Some("timeout"));

    engine.add_operator(10, Some(bamako())).await;
    let err = engine.missions.accept(Actor::operator(10), stale.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    // The client is free to ask again
    let again = NewMission::new(100, ServiceKind::FuelDelivery, bamako());
    engine.missions.create_mission(Actor::client(100), again).await.unwrap();
    engine.tear_down().await;
}

#[tokio::test]
async fn external_operators_see_new_missions_live() {
    let engine = TestEngine::new().await;
    engine.add_operator(10, Some(bamako())).await;
    engine.add_operator(11, Some(bamako())).await;
    let mut watcher = engine.operators.connect(Actor::operator(11)).await.unwrap();
    let request = NewMission::new(100, ServiceKind::BatteryBoost, bamako());
    let mission = engine.missions.create_mission(Actor::client(100), request).await.unwrap();
    engine.missions.publish(ADMIN, mission.id, PublishRequest::new(Amount::from(7_500), 2.0)).await.unwrap();
    engine.missions.accept(Actor::operator(10), mission.id).await.unwrap();

    let mut received = vec![];
    while let Ok(message) = watcher.receiver.try_recv() {
        received.push(message);
    }
    let announced = received.iter().any(|m| match m {
        RealtimeMessage::NewMissionAvailable(m) => m.id == mission.id && m.estimated_price == Amount::from(7_500),
        _ => false,
    });
    assert!(announced, "{received:?}");
    let taken = received.iter().any(|m| {
        matches!(m, RealtimeMessage::MissionStatusChanged { mission_id, status: MissionStatus::Accepted, .. }
            if *mission_id == mission.id)
    });
    assert!(taken, "{received:?}");
    let leaked = received.iter().any(|m| matches!(m, RealtimeMessage::MissionUpdated(_)));
    assert!(!leaked, "external operators only get the compact event");
    engine.tear_down().await;
}

#[tokio::test]
async fn only_idle_missions_can_be_deleted() {
    let engine = TestEngine::new().await;
    engine.add_operator(10, Some(bamako())).await;
    let busy = engine.published_mission(100, ServiceKind::TireChange).await;
    let idle = engine.published_mission(101, ServiceKind::TireChange).await;
    engine.missions.accept(Actor::operator(10), busy.id).await.unwrap();

    let err = engine.missions.delete(ADMIN, busy.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    let err = engine.missions.delete(Actor::client(101), idle.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    engine.missions.delete(ADMIN, idle.id).await.unwrap();
    let err = engine.missions.fetch_mission(ADMIN, idle.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    engine.tear_down().await;
}
