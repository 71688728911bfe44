use cucumber::World;
use dispatch_engine::{
    db_types::{Mission, MissionId},
    traits::DispatchError,
};

use crate::support::engine::{TestEngine, ADMIN};

#[derive(Default, Debug, World)]
pub struct DispatchWorld {
    pub engine: Option<TestEngine>,
    pub mission: Option<MissionId>,
    pub last_error: Option<DispatchError>,
}

impl DispatchWorld {
    pub fn engine(&self) -> &TestEngine {
        self.engine.as_ref().expect("Dispatch engine not initialised")
    }

    pub fn mission_id(&self) -> MissionId {
        self.mission.expect("No mission has been created in this scenario")
    }

    pub async fn mission(&self) -> Mission {
        self.engine().missions.fetch_mission(ADMIN, self.mission_id()).await.expect("Error fetching mission")
    }
}
