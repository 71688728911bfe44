//! Pure helpers: great-circle distance and mission pricing. Nothing in here touches storage or the network.
mod geo;
mod pricing;

pub use geo::{haversine_km, round_km, GeoPoint, DISPLAY_PRECISION};
pub use pricing::{flat_price, towing_quote, PriceQuote, TowingTariff, LEGACY_PRICE_PER_KM};
