pub mod delay;
pub mod elevator;
pub mod unit;

pub use delay::{Delayer, InstantDelayer, TokioDelayer, UnitTiming};
pub use elevator::Elevator;
pub use unit::{ElevatorUnit, UnitLease};
