use std::{collections::HashMap, fmt::Display, str::FromStr};

use dispatch_common::helpers::{parse_boolean_flag, parse_value};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Amount, ServiceKind},
    helpers::TowingTariff,
    traits::{DispatchError, SettingsStore},
};

/// Keys read from the [`SettingsStore`].
pub mod keys {
    pub const COMMISSION_PERCENT: &str = "commission_percent";
    pub const TOWING_BASE_PRICE: &str = "towing_base_price";
    pub const TOWING_PRICE_PER_KM: &str = "towing_price_per_km";
    pub const MISSION_RADIUS_KM: &str = "mission_radius_km";
    pub const TOWING_RADIUS_KM: &str = "towing_radius_km";
    pub const AUTO_CANCEL_MINUTES: &str = "auto_cancel_minutes";
    pub const ALERT_INTERVAL_MS: &str = "alert_interval_ms";
    pub const ALERT_SUPPRESS_WHEN_BUSY: &str = "alert_suppress_when_busy";
    pub const ALERT_ENABLED: &str = "alert_enabled";
    pub const SUPPORT_PHONE: &str = "support_phone";
    /// Catalog prices are stored as `price.<service_kind>`, e.g. `price.battery_boost`.
    pub const PRICE_PREFIX: &str = "price.";
}

pub const DEFAULT_COMMISSION_PERCENT: f64 = 10.0;
pub const DEFAULT_TOWING_BASE_PRICE: Amount = Amount::new(10_000);
pub const DEFAULT_MISSION_RADIUS_KM: f64 = 10.0;
pub const DEFAULT_TOWING_RADIUS_KM: f64 = 30.0;
pub const DEFAULT_AUTO_CANCEL_MINUTES: i64 = 30;
pub const DEFAULT_ALERT_INTERVAL_MS: u64 = 300_000;

fn default_catalog_price(kind: ServiceKind) -> Amount {
    match kind {
        ServiceKind::Towing => DEFAULT_TOWING_BASE_PRICE,
        ServiceKind::BatteryBoost => Amount::new(5_000),
        ServiceKind::TireChange => Amount::new(5_000),
        ServiceKind::FuelDelivery => Amount::new(4_000),
        ServiceKind::Lockout => Amount::new(6_000),
    }
}

/// Business configuration, read fresh from the settings store by every operation that needs it.
///
/// Missing or unparseable values never fail an operation. They are logged and replaced by the defaults above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSettings {
    pub commission_percent: f64,
    pub towing: TowingTariff,
    pub mission_radius_km: f64,
    pub towing_radius_km: f64,
    pub auto_cancel_minutes: i64,
    pub alert_interval_ms: u64,
    pub alert_suppress_when_busy: bool,
    pub alert_enabled: bool,
    pub support_phone: Option<String>,
    catalog: HashMap<ServiceKind, Amount>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            commission_percent: DEFAULT_COMMISSION_PERCENT,
            towing: TowingTariff { base_price: DEFAULT_TOWING_BASE_PRICE, price_per_km: None },
            mission_radius_km: DEFAULT_MISSION_RADIUS_KM,
            towing_radius_km: DEFAULT_TOWING_RADIUS_KM,
            auto_cancel_minutes: DEFAULT_AUTO_CANCEL_MINUTES,
            alert_interval_ms: DEFAULT_ALERT_INTERVAL_MS,
            alert_suppress_when_busy: true,
            alert_enabled: true,
            support_phone: None,
            catalog: ServiceKind::ALL.into_iter().map(|k| (k, default_catalog_price(k))).collect(),
        }
    }
}

impl DispatchSettings {
    pub async fn load<S: SettingsStore>(store: &S) -> Result<Self, DispatchError> {
        let mut settings = Self::default();
        let commission = read(store, keys::COMMISSION_PERCENT, settings.commission_percent).await?;
        if (0.0..=100.0).contains(&commission) {
            settings.commission_percent = commission;
        } else {
            warn!("🪛️ Commission of {commission}% is out of range. Using {DEFAULT_COMMISSION_PERCENT}%");
        }
        let base = read(store, keys::TOWING_BASE_PRICE, settings.towing.base_price.value()).await?;
        settings.towing.base_price = Amount::from(base.max(0));
        settings.towing.price_per_km = read_optional::<i64, _>(store, keys::TOWING_PRICE_PER_KM)
            .await?
            .filter(|v| *v > 0)
            .map(Amount::from);
        settings.mission_radius_km = read(store, keys::MISSION_RADIUS_KM, settings.mission_radius_km).await?;
        settings.towing_radius_km = read(store, keys::TOWING_RADIUS_KM, settings.towing_radius_km).await?;
        settings.auto_cancel_minutes = read(store, keys::AUTO_CANCEL_MINUTES, settings.auto_cancel_minutes).await?;
        settings.alert_interval_ms = read(store, keys::ALERT_INTERVAL_MS, settings.alert_interval_ms).await?;
        let suppress = store.fetch_setting(keys::ALERT_SUPPRESS_WHEN_BUSY).await?;
        settings.alert_suppress_when_busy = parse_boolean_flag(suppress, settings.alert_suppress_when_busy);
        let enabled = store.fetch_setting(keys::ALERT_ENABLED).await?;
        settings.alert_enabled = parse_boolean_flag(enabled, settings.alert_enabled);
        settings.support_phone =
            store.fetch_setting(keys::SUPPORT_PHONE).await?.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        for kind in ServiceKind::ALL {
            let key = format!("{}{kind}", keys::PRICE_PREFIX);
            if let Some(price) = read_optional::<i64, _>(store, &key).await?.filter(|p| *p >= 0) {
                settings.catalog.insert(kind, Amount::from(price));
            }
        }
        trace!("🪛️ Loaded dispatch settings: {settings:?}");
        Ok(settings)
    }

    /// The flat price for a non-towing service. For towing, this is the base price.
    pub fn catalog_price(&self, kind: ServiceKind) -> Amount {
        if kind.is_towing() {
            return self.towing.base_price;
        }
        self.catalog.get(&kind).copied().unwrap_or_else(|| default_catalog_price(kind))
    }

    /// How far from an operator a published mission of this kind may be and still be offered to them.
    pub fn radius_for(&self, kind: ServiceKind) -> f64 {
        if kind.is_towing() {
            self.towing_radius_km
        } else {
            self.mission_radius_km
        }
    }

    pub fn auto_cancel_after(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.auto_cancel_minutes.max(1))
    }

    pub fn with_catalog_price(mut self, kind: ServiceKind, price: Amount) -> Self {
        self.catalog.insert(kind, price);
        self
    }
}

async fn read<T, S>(store: &S, key: &str, default: T) -> Result<T, DispatchError>
where
    T: FromStr + Display,
    T::Err: Display,
    S: SettingsStore,
{
    Ok(read_optional(store, key).await?.unwrap_or(default))
}

async fn read_optional<T, S>(store: &S, key: &str) -> Result<Option<T>, DispatchError>
where
    T: FromStr,
    T::Err: Display,
    S: SettingsStore,
{
    let Some(value) = store.fetch_setting(key).await? else {
        return Ok(None);
    };
    match parse_value::<T>(Some(value.as_str())) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            warn!("🪛️ Setting '{key}' {e}. Using the default.");
            Ok(None)
        },
    }
}
