use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use dispatch_engine::{
    db_types::{Actor, NewWithdrawal, ServiceKind, WithdrawalDecision},
    events::{EventHandlers, EventHooks},
    helpers::GeoPoint,
};
use futures_util::FutureExt;
use log::*;

use crate::support::engine::{TestEngine, ADMIN};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

async fn settle_until<F: Fn() -> bool>(done: F) {
    for _ in 0..50 {
        if done() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn hooks_fire_once_per_event() {
    let completed = HookCalled::default();
    let confirmed = HookCalled::default();
    let processed = HookCalled::default();
    let mut hooks = EventHooks::default();
    let c = completed.clone();
    hooks.on_mission_completed(move |ev| {
        info!("📬️ Mission {} completed", ev.mission.id);
        assert!(ev.transaction.is_some());
        c.called();
        async {}.boxed()
    });
    let c = confirmed.clone();
    hooks.on_transaction_confirmed(move |ev| {
        info!("📬️ Transaction {} confirmed", ev.transaction.id);
        c.called();
        async {}.boxed()
    });
    let c = processed.clone();
    hooks.on_withdrawal_processed(move |ev| {
        info!("📬️ Withdrawal {} processed", ev.withdrawal.id);
        c.called();
        async {}.boxed()
    });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let engine = TestEngine::with_producers(producers).await;
    engine.add_operator(10, Some(GeoPoint::new(12.63, -8.01))).await;
    let mission = engine.published_mission(100, ServiceKind::BatteryBoost).await;
    engine.complete_with(mission.id, 10).await;
    let tx = engine.settlement.confirm_payment(Actor::client(100), mission.id).await.unwrap();
    engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap();
    let _ = engine.settlement.confirm_transaction(ADMIN, tx.id).await.unwrap_err();
    let request = NewWithdrawal::new(10, tx.amount.percent(50.0), "orange_money");
    let withdrawal = engine.settlement.request_withdrawal(Actor::operator(10), request).await.unwrap();
    engine.settlement.process_withdrawal(ADMIN, withdrawal.id, WithdrawalDecision::Approve, None).await.unwrap();

    settle_until(|| completed.count() == 1 && confirmed.count() == 1 && processed.count() == 1).await;
    assert_eq!(completed.count(), 1);
    assert_eq!(confirmed.count(), 1);
    assert_eq!(processed.count(), 1);
    engine.tear_down().await;
}
