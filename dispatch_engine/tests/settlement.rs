use dispatch_engine::{
    db_types::{
        commission_split,
        Actor,
        Amount,
        MissionEventType,
        MissionStatus,
        NewWithdrawal,
        ServiceKind,
        TransactionStatus,
        WithdrawalDecision,
        WithdrawalStatus,
    },
    dispatch_api::settings::keys,
    helpers::{haversine_km, GeoPoint},
    traits::{BusinessRule, ErrorKind, SettingsStore},
};

use crate::support::engine::{bamako, TestEngine, ADMIN};

mod support;

const OPERATOR: i64 = 10;
const CLIENT: i64 = 100;

async fn engine_with_completed_mission() -> (TestEngine, dispatch_engine::db_types::Mission) {
    let engine = TestEngine::new().await;
    engine.add_operator(OPERATOR, Some(GeoPoint::new(12.63, -8.01))).await;
    let mission = engine.published_mission(CLIENT, ServiceKind::BatteryBoost).await;
    let completed = engine.complete_with(mission.id, OPERATOR).await;
    (engine, completed)
}

#[tokio::test]
async fn completion_opens_a_pending_transaction() {
    let (engine, mission) = engine_with_completed_mission().await;
    assert!(mission.finished_at.is_some());
    let tx = engine.settlement.transaction_for_mission(ADMIN, mission.id).await.unwrap().expect("transaction");
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.amount, Amount::from(5_000));
    assert_eq!(tx.operator_id, OPERATOR);
    assert_eq!(tx.net_amount, None);
    let ledger = engine.settlement.operator_ledger(Actor::operator(OPERATOR), OPERATOR).await.unwrap();
    assert_eq!(ledger.pending_balance, Amount::from(4_500));
    assert_eq!(ledger.balance, Amount::from(0));
    engine.tear_down().await;
}

#[tokio::test]
async fn operators_are_credited_exactly_once() {
    let (engine, mission) = engine_with_completed_mission().await;
    let client = Actor::client(CLIENT);
    let err = engine.settlement.confirm_payment(Actor::client(CLIENT + 1), mission.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let tx = engine.settlement.confirm_payment(client, mission.id).await.unwrap();
    assert!(tx.client_confirmed_at.is_some());
    let again = engine.settlement.confirm_payment(client, mission.id).await.unwrap();
    assert_eq!(again.id, tx.id, "confirming twice reuses the transaction");

    let confirmed = engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap();
    assert_eq!(confirmed.status, TransactionStatus::Confirmed);
    assert_eq!(confirmed.commission_amount, Some(Amount::from(500)));
    assert_eq!(confirmed.net_amount, Some(Amount::from(4_500)));
    assert_eq!(confirmed.confirmed_by, Some(ADMIN.id));

    let err = engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadySettled);
    let err = engine.settlement.confirm_payment(client, mission.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadySettled);

    let ledger = engine.settlement.operator_ledger(ADMIN, OPERATOR).await.unwrap();
    assert_eq!(ledger.balance, Amount::from(4_500));
    assert_eq!(ledger.pending_balance, Amount::from(0));
    assert_eq!(ledger.available(), Amount::from(4_500));
    engine.tear_down().await;
}

#[tokio::test]
async fn commission_is_taken_at_the_rate_in_force_when_the_mission_completed() {
    let (engine, mission) = engine_with_completed_mission().await;
    engine.db.store_setting(keys::COMMISSION_PERCENT, "25").await.unwrap();
    let tx = engine.settlement.confirm_payment(Actor::client(CLIENT), mission.id).await.unwrap();
    assert!((tx.commission_percent - 10.0).abs() < f64::EPSILON);
    let confirmed = engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap();
    assert_eq!(confirmed.net_amount, Some(Amount::from(4_500)));
    engine.tear_down().await;
}

#[tokio::test]
async fn payment_can_only_be_confirmed_for_completed_missions() {
    let engine = TestEngine::new().await;
    let mission = engine.published_mission(CLIENT, ServiceKind::Lockout).await;
    let err = engine.settlement.confirm_payment(Actor::client(CLIENT), mission.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    engine.tear_down().await;
}

#[tokio::test]
async fn withdrawals_are_bounded_by_confirmed_earnings() {
    let (engine, mission) = engine_with_completed_mission().await;
    let operator = Actor::operator(OPERATOR);
    let err = engine
        .settlement
        .request_withdrawal(operator, NewWithdrawal::new(OPERATOR, Amount::from(1_000), "orange_money"))
        .await
        .unwrap_err();
    assert!(err.is_business_rule(&BusinessRule::InsufficientBalance { requested: 1_000, available: 0 }));

    let tx = engine.settlement.confirm_payment(Actor::client(CLIENT), mission.id).await.unwrap();
    engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap();

    let too_much = NewWithdrawal::new(OPERATOR, Amount::from(5_000), "orange_money");
    let err = engine.settlement.request_withdrawal(operator, too_much).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let someone_else = NewWithdrawal::new(OPERATOR, Amount::from(100), "orange_money");
    let err = engine.settlement.request_withdrawal(Actor::operator(11), someone_else).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let request = NewWithdrawal::new(OPERATOR, Amount::from(4_000), "orange_money").with_phone("+22370000000");
    let withdrawal = engine.settlement.request_withdrawal(operator, request).await.unwrap();
    assert_eq!(withdrawal.status, WithdrawalStatus::Pending);

    let approved = engine
        .settlement
        .process_withdrawal(ADMIN, withdrawal.id, WithdrawalDecision::Approve, Some("paid".into()))
        .await
        .unwrap();
    assert_eq!(approved.status, WithdrawalStatus::Approved);
    assert_eq!(approved.processed_by, Some(ADMIN.id));
    let err =
        engine.settlement.process_withdrawal(ADMIN, withdrawal.id, WithdrawalDecision::Reject, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let ledger = engine.settlement.operator_ledger(operator, OPERATOR).await.unwrap();
    assert_eq!(ledger.available(), Amount::from(500));
    assert_eq!(ledger.balance, Amount::from(500));
    let err = engine
        .settlement
        .request_withdrawal(operator, NewWithdrawal::new(OPERATOR, Amount::from(501), "orange_money"))
        .await
        .unwrap_err();
    assert!(err.is_business_rule(&BusinessRule::InsufficientBalance { requested: 501, available: 500 }));
    engine.tear_down().await;
}

#[tokio::test]
async fn rejected_withdrawals_do_not_touch_the_balance() {
    let (engine, mission) = engine_with_completed_mission().await;
    let tx = engine.settlement.confirm_payment(Actor::client(CLIENT), mission.id).await.unwrap();
    engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap();
    let request = NewWithdrawal::new(OPERATOR, Amount::from(4_500), "bank_transfer");
    let withdrawal = engine.settlement.request_withdrawal(Actor::operator(OPERATOR), request).await.unwrap();
    let rejected =
        engine.settlement.process_withdrawal(ADMIN, withdrawal.id, WithdrawalDecision::Reject, None).await.unwrap();
    assert_eq!(rejected.status, WithdrawalStatus::Rejected);
    let ledger = engine.settlement.operator_ledger(ADMIN, OPERATOR).await.unwrap();
    assert_eq!(ledger.balance, Amount::from(4_500));
    assert_eq!(ledger.available(), Amount::from(4_500));
    let history = engine.settlement.withdrawals_for_operator(ADMIN, OPERATOR).await.unwrap();
    assert_eq!(history.len(), 1);
    engine.tear_down().await;
}

#[tokio::test]
async fn towing_mission_settles_at_its_locked_price() {
    let engine = TestEngine::new().await;
    engine.db.store_setting(keys::TOWING_BASE_PRICE, "10000").await.unwrap();
    engine.db.store_setting(keys::TOWING_PRICE_PER_KM, "2000").await.unwrap();
    let operator_at = GeoPoint::new(12.63, -8.01);
    engine.add_operator(OPERATOR, Some(operator_at)).await;
    let mission = engine.published_mission(CLIENT, ServiceKind::Towing).await;
    let destination = mission.destination().expect("towing missions have a destination");

    let completed = engine.complete_with(mission.id, OPERATOR).await;
    assert_eq!(completed.status, MissionStatus::Completed);
    let locked = completed.final_price.expect("towing price is locked");
    let km = haversine_km(&operator_at, &bamako()) + haversine_km(&bamako(), &destination);
    let expected = (2000.0 * km).max(10_000.0);
    assert!((locked.value() as f64 - expected).abs() <= 1.0, "locked {locked}, expected about {expected}");

    let history = engine.missions.mission_history(ADMIN, mission.id).await.unwrap();
    let steps = history.iter().map(|e| e.event_type).collect::<Vec<_>>();
    let towing = steps.iter().position(|t| *t == MissionEventType::Towing).expect("towing step is logged");
    let on_site = steps.iter().position(|t| *t == MissionEventType::OnSite).expect("on site step is logged");
    let done = steps.iter().position(|t| *t == MissionEventType::Completed).expect("completion is logged");
    assert!(on_site < towing && towing < done);

    let tx = engine.settlement.transaction_for_mission(ADMIN, mission.id).await.unwrap().expect("transaction");
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.amount, locked);

    engine.db.store_setting(keys::COMMISSION_PERCENT, "30").await.unwrap();
    engine.settlement.confirm_payment(Actor::client(CLIENT), mission.id).await.unwrap();
    let confirmed = engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap();
    let (commission, net) = commission_split(locked, 10.0);
    assert_eq!(confirmed.commission_amount, Some(commission));
    assert_eq!(confirmed.net_amount, Some(net));
    let ledger = engine.settlement.operator_ledger(ADMIN, OPERATOR).await.unwrap();
    assert_eq!(ledger.balance, net);
    engine.tear_down().await;
}

#[tokio::test]
async fn pending_withdrawals_cannot_both_be_approved_against_the_same_earnings() {
    let (engine, mission) = engine_with_completed_mission().await;
    let operator = Actor::operator(OPERATOR);
    let tx = engine.settlement.confirm_payment(Actor::client(CLIENT), mission.id).await.unwrap();
    engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap();

    let first = NewWithdrawal::new(OPERATOR, Amount::from(4_500), "orange_money");
    let first = engine.settlement.request_withdrawal(operator, first).await.unwrap();
    let second = NewWithdrawal::new(OPERATOR, Amount::from(4_500), "bank_transfer");
    let second = engine.settlement.request_withdrawal(operator, second).await.unwrap();

    let approved =
        engine.settlement.process_withdrawal(ADMIN, first.id, WithdrawalDecision::Approve, None).await.unwrap();
    assert_eq!(approved.status, WithdrawalStatus::Approved);
    let err =
        engine.settlement.process_withdrawal(ADMIN, second.id, WithdrawalDecision::Approve, None).await.unwrap_err();
    assert!(err.is_business_rule(&BusinessRule::InsufficientBalance { requested: 4_500, available: 0 }));

    let ledger = engine.settlement.operator_ledger(ADMIN, OPERATOR).await.unwrap();
    assert_eq!(ledger.approved_withdrawals, Amount::from(4_500));
    assert_eq!(ledger.available(), Amount::from(0));
    assert_eq!(ledger.balance, Amount::from(0));

    // The uncovered request stays pending and can still be turned down.
    let rejected =
        engine.settlement.process_withdrawal(ADMIN, second.id, WithdrawalDecision::Reject, None).await.unwrap();
    assert_eq!(rejected.status, WithdrawalStatus::Rejected);
    engine.tear_down().await;
}
