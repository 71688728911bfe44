use actix_web::http::StatusCode;
use dispatch_engine::{db_types::Actor, OperatorPresence};
use serde_json::Value;

use super::helpers::{add_operator, get_request, operator_api};

#[actix_web::test]
async fn health() {
    let api = operator_api().await;
    let (status, body) = get_request(&api, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn online_admins() {
    let api = operator_api().await;
    let (status, body) = get_request(&api, "/presence/admins").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"admins":[]}"#);

    let _admin = api.connect(Actor::admin(3)).await.unwrap();
    let (_, body) = get_request(&api, "/presence/admins").await;
    assert_eq!(body, r#"{"admins":[3]}"#);
}

#[actix_web::test]
async fn online_operators() {
    let api = operator_api().await;
    add_operator(&api, 10, false).await;
    add_operator(&api, 20, true).await;
    let _external = api.connect(Actor::operator(10)).await.unwrap();
    let internal = api.connect(Actor::operator(20)).await.unwrap();

    let (status, body) = get_request(&api, "/presence/operators").await;
    assert_eq!(status, StatusCode::OK);
    let mut operators: Vec<OperatorPresence> = serde_json::from_str(&body).unwrap();
    operators.sort_by_key(|o| o.operator.operator_id);
    assert_eq!(operators.len(), 2);
    assert_eq!(operators[0].operator.operator_id, 10);
    assert!(!operators[0].operator.internal);
    assert!(operators[1].operator.internal);
    assert!(operators.iter().all(|o| !o.has_active_mission));

    api.disconnect(&internal);
    let (_, body) = get_request(&api, "/presence/operators").await;
    let operators: Vec<OperatorPresence> = serde_json::from_str(&body).unwrap();
    assert_eq!(operators.len(), 1);
}

#[actix_web::test]
async fn single_operator_presence() {
    let api = operator_api().await;
    add_operator(&api, 10, false).await;
    let (_, body) = get_request(&api, "/presence/operators/10").await;
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["online"], false);

    let connection = api.connect(Actor::operator(10)).await.unwrap();
    let (status, body) = get_request(&api, "/presence/operators/10").await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["operator_id"], 10);
    assert_eq!(v["online"], true);

    api.disconnect(&connection);
    let (_, body) = get_request(&api, "/presence/operators/10").await;
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["online"], false);
}

#[actix_web::test]
async fn unknown_operators_cannot_connect() {
    let api = operator_api().await;
    let err = api.connect(Actor::operator(99)).await.err().expect("connect should fail");
    let err = crate::errors::ServerError::from(err);
    assert_eq!(actix_web::ResponseError::status_code(&err), StatusCode::NOT_FOUND);
}
