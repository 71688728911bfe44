use crate::{
    db_types::{NewOperator, OperatorFlags, OperatorProfile},
    helpers::GeoPoint,
    traits::DispatchError,
};

#[allow(async_fn_in_trait)]
pub trait OperatorManagement {
    /// Creates the operator profile if it does not exist. An existing profile is returned unchanged.
    async fn upsert_operator(&self, operator: NewOperator) -> Result<OperatorProfile, DispatchError>;

    async fn fetch_operator(&self, operator_id: i64) -> Result<Option<OperatorProfile>, DispatchError>;

    async fn update_operator_location(
        &self,
        operator_id: i64,
        position: GeoPoint,
    ) -> Result<OperatorProfile, DispatchError>;

    async fn update_operator_flags(
        &self,
        operator_id: i64,
        flags: OperatorFlags,
    ) -> Result<OperatorProfile, DispatchError>;

    /// External operators flagged as available, whatever their position.
    async fn fetch_external_available_operators(&self) -> Result<Vec<OperatorProfile>, DispatchError>;

    /// Available external operators that opted in to pending-mission alerts.
    async fn fetch_alertable_operators(&self) -> Result<Vec<OperatorProfile>, DispatchError>;
}
