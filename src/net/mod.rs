//! Payload delivery: blocking HTTP fetches and the background connection
//! that turns a simulation source into `model` / `states` events.

pub mod fetch;
pub mod transport;

pub use transport::{Connection, SimulationSource, TransportEvent};
