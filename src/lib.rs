/* Modules */
pub mod building;
pub mod config;
pub mod coordinator;
pub mod elevator;
pub mod shared;

pub use building::{Building, Floor, FloorRegistry};
pub use coordinator::{DestinationInput, DispatchController, DispatchObserver};
pub use elevator::{Elevator, ElevatorUnit};
pub use shared::{Direction, DispatchError, DispatchEvent, DispatchOutcome, Request};
