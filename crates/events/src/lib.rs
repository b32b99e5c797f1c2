//! Dispenser events: the fact trait and the pub/sub mechanics used to fan
//! committed dispenses out to observers (telemetry, reporting, tests).

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
