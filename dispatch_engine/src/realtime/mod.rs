//! # Realtime fan-out and presence
//!
//! * [`PresenceRegistry`] knows who is connected and holds a delivery channel per actor.
//! * [`RealtimeFanout`] turns engine events into [`RealtimeMessage`]s for a [`TargetSet`] of topics, and pushes a
//!   notification through a [`PushDelivery`] implementation when a targeted actor is offline.
mod fanout;
mod messages;
mod presence;
mod push;
mod topics;

pub use fanout::{FanoutReport, RealtimeFanout};
pub use messages::RealtimeMessage;
pub use presence::{ActorKey, Connection, OnlineOperator, OperatorMeta, PresenceRegistry};
pub use push::{LogOnlyPush, PushDelivery, PushError, PushNotification, PushReport};
pub use topics::{TargetSet, Topic};
