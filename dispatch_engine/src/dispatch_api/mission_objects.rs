use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Amount, Mission, SettlementSnapshot},
    dispatch_api::DispatchSettings,
    traits::DispatchError,
};

/// What an admin may adjust when publishing a mission. Unset fields keep the estimate computed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub price: Option<Amount>,
    pub distance_km: Option<f64>,
}

impl PublishRequest {
    pub fn new(price: Amount, distance_km: f64) -> Self {
        Self { price: Some(price), distance_km: Some(distance_km) }
    }

    pub fn validate(&self) -> Result<(), DispatchError> {
        if let Some(price) = self.price {
            if !price.is_positive() {
                return Err(DispatchError::validation(format!("The price must be positive, not {price}.")));
            }
        }
        if let Some(d) = self.distance_km {
            if !d.is_finite() || d < 0.0 {
                return Err(DispatchError::validation(format!("{d} is not a valid distance.")));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.distance_km.is_none()
    }
}

/// A mission an operator may work on, as seen from that operator's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMission {
    pub mission: Mission,
    /// Distance from the operator to the client, rounded for display. `None` if the operator's position is unknown.
    pub distance_km: Option<f64>,
    /// The price the operator would get if they accepted now. Carries no commitment.
    pub preview_price: Amount,
}

/// Captures what the settlement transaction of a completed mission should record.
pub fn settlement_snapshot(
    mission: &Mission,
    settings: &DispatchSettings,
) -> Result<SettlementSnapshot, DispatchError> {
    let operator_id = mission.operator_id.ok_or_else(|| {
        DispatchError::validation(format!("Mission {} has no operator, so there is nobody to settle with.", mission.id))
    })?;
    Ok(SettlementSnapshot {
        operator_id,
        amount: mission.billable_price(),
        currency: mission.currency.clone(),
        commission_percent: settings.commission_percent,
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn publish_requests_are_validated() {
        assert!(PublishRequest::default().validate().is_ok());
        assert!(PublishRequest::default().is_empty());
        assert!(PublishRequest::new(Amount::from(12_000), 4.5).validate().is_ok());
        assert!(PublishRequest::new(Amount::from(0), 4.5).validate().is_err());
        assert!(PublishRequest::new(Amount::from(12_000), -1.0).validate().is_err());
        let nan = PublishRequest { price: None, distance_km: Some(f64::NAN) };
        assert!(nan.validate().is_err());
    }
}
