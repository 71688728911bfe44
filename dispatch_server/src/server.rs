use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use dispatch_engine::{
    events::{EventHandlers, EventHooks},
    realtime::PresenceRegistry,
    sqlite::SCHEMA_VERSION,
    traits::DispatchDatabase,
    AlertApi,
    MissionFlowApi,
    OperatorApi,
    SqliteDatabase,
};
use futures::FutureExt;
use log::*;

use crate::{
    alert_worker::start_alert_worker,
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    push::{PushChannel, ServerFanout},
    routes::{health, OnlineAdminsRoute, OnlineOperatorsRoute, OperatorOnlineRoute},
};

/// Buffer size for each event hook channel.
const HOOK_BUFFER_SIZE: usize = 128;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let version = db.check_schema_version().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Database schema version {version} (expected {SCHEMA_VERSION})");

    let presence = PresenceRegistry::new();
    let push = PushChannel::from_config(&config.push);
    let fanout = ServerFanout::new(db.clone(), presence.clone(), push);

    let handlers = EventHandlers::new(HOOK_BUFFER_SIZE, create_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let missions = MissionFlowApi::new(db.clone(), fanout.clone(), producers);
    let _expiry = start_expiry_worker(missions, config.auto_cancel_check_interval);
    if config.disable_alerts {
        info!("🚀️ Pending-mission alert worker not started");
    } else {
        let _alerts = start_alert_worker(db.clone(), AlertApi::new(db.clone(), fanout.clone()));
    }

    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    let srv = create_server_instance(config, db, fanout)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("🚀️ Server stopped. Closing live connections.");
    presence.shutdown();
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    fanout: ServerFanout,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let operators_api = OperatorApi::new(db.clone(), fanout.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tds::access_log"))
            .app_data(web::Data::new(operators_api))
            .service(health)
            .service(OnlineAdminsRoute::<SqliteDatabase, PushChannel>::new())
            .service(OnlineOperatorsRoute::<SqliteDatabase, PushChannel>::new())
            .service(OperatorOnlineRoute::<SqliteDatabase, PushChannel>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// The hooks the server installs by default. They only log. Integrations that need to react to completions or
/// payouts (receipts, accounting exports) hook in here.
pub fn create_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_mission_completed(|ev| {
            let amount = ev.transaction.as_ref().map(|t| t.amount.to_string()).unwrap_or_else(|| "nothing".into());
            info!("📬️ Mission {} completed. {amount} to settle.", ev.mission.id);
            async {}.boxed()
        })
        .on_transaction_confirmed(|ev| {
            info!("📬️ Transaction #{} confirmed for mission {}", ev.transaction.id, ev.transaction.mission_id);
            async {}.boxed()
        })
        .on_withdrawal_processed(|ev| {
            info!("📬️ Withdrawal #{} is now {}", ev.withdrawal.id, ev.withdrawal.status);
            async {}.boxed()
        });
    hooks
}
