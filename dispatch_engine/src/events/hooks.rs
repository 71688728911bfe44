use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    MissionCompletedEvent,
    TransactionConfirmedEvent,
    WithdrawalProcessedEvent,
};

type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub mission_completed_producer: Vec<EventProducer<MissionCompletedEvent>>,
    pub transaction_confirmed_producer: Vec<EventProducer<TransactionConfirmedEvent>>,
    pub withdrawal_processed_producer: Vec<EventProducer<WithdrawalProcessedEvent>>,
}

impl EventProducers {
    pub async fn mission_completed(&self, event: MissionCompletedEvent) {
        for producer in &self.mission_completed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn transaction_confirmed(&self, event: TransactionConfirmedEvent) {
        for producer in &self.transaction_confirmed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn withdrawal_processed(&self, event: WithdrawalProcessedEvent) {
        for producer in &self.withdrawal_processed_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_mission_completed: Option<EventHandler<MissionCompletedEvent>>,
    pub on_transaction_confirmed: Option<EventHandler<TransactionConfirmedEvent>>,
    pub on_withdrawal_processed: Option<EventHandler<WithdrawalProcessedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_mission_completed = hooks.on_mission_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_transaction_confirmed = hooks.on_transaction_confirmed.map(|f| EventHandler::new(buffer_size, f));
        let on_withdrawal_processed = hooks.on_withdrawal_processed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_mission_completed, on_transaction_confirmed, on_withdrawal_processed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_mission_completed {
            result.mission_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_transaction_confirmed {
            result.transaction_confirmed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_withdrawal_processed {
            result.withdrawal_processed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_mission_completed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_transaction_confirmed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_withdrawal_processed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_mission_completed: Option<Handler<MissionCompletedEvent>>,
    pub on_transaction_confirmed: Option<Handler<TransactionConfirmedEvent>>,
    pub on_withdrawal_processed: Option<Handler<WithdrawalProcessedEvent>>,
}

impl EventHooks {
    pub fn on_mission_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(MissionCompletedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_mission_completed = Some(Arc::new(f));
        self
    }

    pub fn on_transaction_confirmed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionConfirmedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_transaction_confirmed = Some(Arc::new(f));
        self
    }

    pub fn on_withdrawal_processed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WithdrawalProcessedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_withdrawal_processed = Some(Arc::new(f));
        self
    }
}
