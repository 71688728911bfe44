use std::fmt::Debug;

use dispatch_engine::{
    db_types::{Actor, Mission, MissionId, MissionStatus, NewMission, NewOperator, Role, ServiceKind},
    events::EventProducers,
    helpers::GeoPoint,
    realtime::{LogOnlyPush, PresenceRegistry, RealtimeFanout},
    AlertApi,
    MissionFlowApi,
    OperatorApi,
    PublishRequest,
    SettlementApi,
    SqliteDatabase,
    traits::DispatchDatabase,
};

use super::prepare_env::{prepare_test_env, random_db_path, tear_down};

pub const ADMIN: Actor = Actor { id: 1, role: Role::Admin };

pub fn bamako() -> GeoPoint {
    GeoPoint::new(12.62, -8.00)
}

/// Every engine API wired to the same throwaway database and presence registry.
pub struct TestEngine {
    pub db: SqliteDatabase,
    pub presence: PresenceRegistry,
    pub missions: MissionFlowApi<SqliteDatabase, LogOnlyPush>,
    pub settlement: SettlementApi<SqliteDatabase, LogOnlyPush>,
    pub operators: OperatorApi<SqliteDatabase, LogOnlyPush>,
    pub alerts: AlertApi<SqliteDatabase, LogOnlyPush>,
}

impl Debug for TestEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TestEngine({})", self.db.url())
    }
}

impl TestEngine {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db = prepare_test_env(&random_db_path()).await;
        let presence = PresenceRegistry::new();
        let fanout = RealtimeFanout::new(db.clone(), presence.clone(), LogOnlyPush);
        Self {
            missions: MissionFlowApi::new(db.clone(), fanout.clone(), producers.clone()),
            settlement: SettlementApi::new(db.clone(), fanout.clone(), producers),
            operators: OperatorApi::new(db.clone(), fanout.clone()),
            alerts: AlertApi::new(db.clone(), fanout),
            db,
            presence,
        }
    }

    pub async fn add_operator(&self, id: i64, position: Option<GeoPoint>) {
        let mut operator = NewOperator::new(id).in_zones(&["bamako"]);
        if let Some(p) = position {
            operator = operator.at(p);
        }
        self.operators.register_operator(Actor::operator(id), operator).await.expect("Error registering operator");
    }

    pub async fn add_internal_operator(&self, id: i64, position: GeoPoint) {
        let operator = NewOperator::new(id).at(position).internal();
        self.operators.register_operator(ADMIN, operator).await.expect("Error registering internal operator");
    }

    /// Creates and publishes a mission for `client_id`.
    pub async fn published_mission(&self, client_id: i64, kind: ServiceKind) -> Mission {
        let mut request = NewMission::new(client_id, kind, bamako()).with_zone("bamako");
        if kind.is_towing() {
            request = request.with_destination(GeoPoint::new(12.65, -8.05));
        }
        let mission =
            self.missions.create_mission(Actor::client(client_id), request).await.expect("Error creating mission");
        self.missions.publish(ADMIN, mission.id, PublishRequest::default()).await.expect("Error publishing mission")
    }

    /// Runs a mission from acceptance to completion with the given operator.
    pub async fn complete_with(&self, mission_id: MissionId, operator_id: i64) -> Mission {
        let operator = Actor::operator(operator_id);
        let accepted = self.missions.accept(operator, mission_id).await.expect("Error accepting mission");
        let mut path = vec![MissionStatus::EnRoute, MissionStatus::OnSite];
        if accepted.service_kind.is_towing() {
            path.push(MissionStatus::Towing);
        }
        for status in path {
            self.missions.advance(operator, mission_id, status).await.expect("Error advancing mission");
        }
        self.missions.complete(operator, mission_id).await.expect("Error completing mission")
    }

    pub async fn tear_down(self) {
        self.presence.shutdown();
        tear_down(self.db).await;
    }
}
