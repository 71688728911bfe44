use std::time::Duration;

use cucumber::{given, then, when};
use dispatch_engine::{
    db_types::{Actor, Amount, MissionStatus, NewMission, ServiceKind},
    dispatch_api::settings::keys,
    helpers::GeoPoint,
    traits::SettingsStore,
    PublishRequest,
};

use crate::{
    cucumber::DispatchWorld,
    support::engine::{bamako, TestEngine, ADMIN},
};

#[given("a fresh dispatch engine")]
async fn fresh_engine(world: &mut DispatchWorld) {
    world.engine = Some(TestEngine::new().await);
}

#[given(expr = "external operator {int} at {float}, {float}")]
async fn external_operator(world: &mut DispatchWorld, id: i64, lat: f64, lng: f64) {
    world.engine().add_operator(id, Some(GeoPoint::new(lat, lng))).await;
}

#[given(expr = "setting {word} is {string}")]
async fn setting(world: &mut DispatchWorld, key: String, value: String) {
    let key = match key.as_str() {
        "towing_price_per_km" => keys::TOWING_PRICE_PER_KM,
        "commission_percent" => keys::COMMISSION_PERCENT,
        "towing_base_price" => keys::TOWING_BASE_PRICE,
        other => panic!("Unknown setting {other}"),
    };
    world.engine().db.store_setting(key, &value).await.expect("Error storing setting");
}

#[when(expr = "client {int} requests a {word} mission")]
async fn request_mission(world: &mut DispatchWorld, client_id: i64, kind: String) {
    let kind = kind.parse::<ServiceKind>().expect("Unknown service kind");
    let mut request = NewMission::new(client_id, kind, bamako());
    if kind.is_towing() {
        request = request.with_destination(GeoPoint::new(12.65, -8.05));
    }
    let mission = world.engine().missions.create_mission(Actor::client(client_id), request).await;
    world.mission = Some(mission.expect("Error creating mission").id);
}

#[when("the admin publishes the mission")]
async fn publish(world: &mut DispatchWorld) {
    let id = world.mission_id();
    world.engine().missions.publish(ADMIN, id, PublishRequest::default()).await.expect("Error publishing mission");
}

#[when(expr = "operator {int} accepts the mission")]
async fn accept(world: &mut DispatchWorld, operator_id: i64) {
    let id = world.mission_id();
    world.last_error = world.engine().missions.accept(Actor::operator(operator_id), id).await.err();
}

#[when(expr = "operator {int} moves the mission to {word}")]
async fn advance(world: &mut DispatchWorld, operator_id: i64, status: String) {
    let id = world.mission_id();
    let status = status.parse::<MissionStatus>().expect("Unknown mission status");
    world.last_error = world.engine().missions.advance(Actor::operator(operator_id), id, status).await.err();
}

#[when(expr = "client {int} cancels the mission")]
async fn client_cancels(world: &mut DispatchWorld, client_id: i64) {
    let id = world.mission_id();
    world.last_error = world.engine().missions.cancel_by_client(Actor::client(client_id), id, None).await.err();
}

#[when(expr = "client {int} confirms payment")]
async fn client_confirms(world: &mut DispatchWorld, client_id: i64) {
    let id = world.mission_id();
    world.last_error = world.engine().settlement.confirm_payment(Actor::client(client_id), id).await.err();
}

#[when("the admin confirms the transaction")]
async fn admin_confirms(world: &mut DispatchWorld) {
    let id = world.mission_id();
    let engine = world.engine();
    let tx = engine.settlement.transaction_for_mission(ADMIN, id).await.expect("Error fetching transaction");
    let tx = tx.expect("No transaction for the mission");
    world.last_error = engine.settlement.confirm_transaction(ADMIN, tx.id).await.err();
}

#[when("stale missions are expired")]
async fn expire(world: &mut DispatchWorld) {
    tokio::time::sleep(Duration::from_millis(20)).await;
    world.engine().missions.expire_missions_older_than(chrono::Duration::zero()).await.expect("Error expiring");
}

#[then(expr = "the mission status is {word}")]
async fn mission_status(world: &mut DispatchWorld, status: String) {
    let expected = status.parse::<MissionStatus>().expect("Unknown mission status");
    assert_eq!(world.mission().await.status, expected);
}

#[then(expr = "the final price is {int}")]
async fn final_price(world: &mut DispatchWorld, price: i64) {
    assert_eq!(world.mission().await.final_price, Some(Amount::from(price)));
}

#[then(expr = "the mission is held by operator {int}")]
async fn held_by(world: &mut DispatchWorld, operator_id: i64) {
    assert_eq!(world.mission().await.operator_id, Some(operator_id));
}

#[then(expr = "the last step failed with {word}")]
async fn failed_with(world: &mut DispatchWorld, kind: String) {
    let err = world.last_error.take().expect("The last step did not fail");
    assert_eq!(err.kind().to_string(), kind);
}

#[then("the last step succeeded")]
async fn succeeded(world: &mut DispatchWorld) {
    if let Some(e) = world.last_error.take() {
        panic!("The last step failed: {e}");
    }
}

#[then(expr = "operator {int} has a balance of {int}")]
async fn balance(world: &mut DispatchWorld, operator_id: i64, amount: i64) {
    let ledger = world.engine().settlement.operator_ledger(ADMIN, operator_id).await.expect("Error fetching ledger");
    assert_eq!(ledger.balance, Amount::from(amount));
}
