use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use dispatch_engine::{
    db_types::{Actor, NewOperator},
    realtime::{LogOnlyPush, PresenceRegistry, RealtimeFanout},
    OperatorApi,
    SqliteDatabase,
};
use log::debug;

use crate::routes::{health, OnlineAdminsRoute, OnlineOperatorsRoute, OperatorOnlineRoute};

pub type TestOperatorApi = OperatorApi<SqliteDatabase, LogOnlyPush>;

pub async fn operator_api() -> TestOperatorApi {
    let _ = env_logger::try_init();
    let db = SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("Error creating in-memory database");
    db.migrate().await.expect("Error running migrations");
    let fanout = RealtimeFanout::new(db.clone(), PresenceRegistry::new(), LogOnlyPush);
    OperatorApi::new(db, fanout)
}

pub async fn add_operator(api: &TestOperatorApi, id: i64, internal: bool) {
    let mut operator = NewOperator::new(id);
    let actor = if internal {
        operator = operator.internal();
        Actor::admin(1)
    } else {
        Actor::operator(id)
    };
    api.register_operator(actor, operator).await.expect("Error registering operator");
}

pub async fn get_request(api: &TestOperatorApi, path: &str) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::Data::new(api.clone()))
        .service(health)
        .service(OnlineAdminsRoute::<SqliteDatabase, LogOnlyPush>::new())
        .service(OnlineOperatorsRoute::<SqliteDatabase, LogOnlyPush>::new())
        .service(OperatorOnlineRoute::<SqliteDatabase, LogOnlyPush>::new());
    let service = test::init_service(app).await;
    debug!("Making request to {path}");
    let req = TestRequest::get().uri(path).to_request();
    let res = test::call_service(&service, req).await;
    let status = res.status();
    let body = res.into_body().try_into_bytes().map(|b| String::from_utf8_lossy(&b).into_owned()).unwrap_or_default();
    (status, body)
}
