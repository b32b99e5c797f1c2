//! Dispensing engine and request gateway.
//!
//! The engine turns a profile + volume into poured ingredients: it validates,
//! runs a read-only pre-flight over every ingredient, then pours and deducts
//! them one by one, rolling back its own deductions if anything goes wrong
//! mid-pour. The gateway in front of it models the single physical dispensing
//! head: one request pours at a time, the rest wait in arrival order.

pub mod cancel;
pub mod clock;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod state;

pub use cancel::CancelHandle;
pub use clock::{DeliveryClock, TokioClock, VirtualClock};
pub use engine::DispensingEngine;
pub use error::DispenseError;
pub use gateway::{GatewayStats, RequestGateway};
pub use state::{RequestState, RequestTracker};
