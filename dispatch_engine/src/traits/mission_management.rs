use chrono::{DateTime, Utc};

use crate::{
    db_types::{Mission, MissionEvent, MissionId, MissionStatus, NewMission, NewMissionEvent},
    traits::{
        data_objects::{MissionQueryFilter, MissionSwap, MissionSwapped},
        DispatchError,
    },
};

/// Storage contract for missions and their append-only event log.
///
/// Every mutation of a mission's status goes through [`MissionManagement::swap_mission`], a compare-and-swap that
/// either applies completely or not at all. Backends must provide native conditional writes or row-level locking
/// so that two concurrent swaps on the same mission can never both succeed.
#[allow(async_fn_in_trait)]
pub trait MissionManagement {
    /// Stores a new mission in `pending_unpublished` together with its `created` event.
    ///
    /// The insert is conditional on the client having no other open mission. If they do, a
    /// [`crate::traits::BusinessRule::ClientHasOpenMission`] error is returned and nothing is written.
    async fn insert_mission(
        &self,
        mission: NewMission,
        estimate: crate::helpers::PriceQuote,
    ) -> Result<Mission, DispatchError>;

    async fn fetch_mission(&self, id: MissionId) -> Result<Option<Mission>, DispatchError>;

    /// Applies the swap if the mission still matches its expectations. Returns `None` if zero rows were affected.
    ///
    /// If `require_idle_operator` is set and that operator holds another active mission, the whole unit is rolled
    /// back and a [`crate::traits::BusinessRule::OperatorBusy`] error is returned.
    async fn swap_mission(&self, swap: MissionSwap) -> Result<Option<MissionSwapped>, DispatchError>;

    /// Deletes the mission if it is still in `expected_status`. The `deleted` event is kept in the log.
    async fn delete_mission(
        &self,
        id: MissionId,
        expected_status: MissionStatus,
        event: NewMissionEvent,
    ) -> Result<Option<Mission>, DispatchError>;

    /// Appends an event that does not change the mission's status (e.g. a photo being added).
    async fn append_mission_event(&self, event: NewMissionEvent) -> Result<MissionEvent, DispatchError>;

    /// The mission's event log, oldest first.
    async fn fetch_mission_events(&self, id: MissionId) -> Result<Vec<MissionEvent>, DispatchError>;

    async fn search_missions(&self, query: MissionQueryFilter) -> Result<Vec<Mission>, DispatchError>;

    /// All `published` missions with no operator, oldest first.
    async fn fetch_unassigned_published(&self) -> Result<Vec<Mission>, DispatchError>;

    /// `published`, unassigned missions that were published before `cutoff`.
    async fn fetch_stale_published(&self, cutoff: DateTime<Utc>) -> Result<Vec<Mission>, DispatchError>;

    /// Every non-terminal mission the operator holds, whether soft-assigned or accepted.
    async fn fetch_missions_for_operator(&self, operator_id: i64) -> Result<Vec<Mission>, DispatchError>;

    async fn active_mission_for_client(&self, client_id: i64) -> Result<Option<Mission>, DispatchError>;

    /// The mission the operator is currently working on (`accepted` through `towing`), if any.
    async fn active_mission_for_operator(&self, operator_id: i64) -> Result<Option<Mission>, DispatchError>;

    /// Ids of every operator currently holding an active mission.
    async fn busy_operator_ids(&self) -> Result<Vec<i64>, DispatchError>;
}
