pub mod error;
pub mod macros;
pub mod structs;

pub use error::DispatchError;
pub use structs::Direction;
pub use structs::DirectionSet;
pub use structs::DispatchEvent;
pub use structs::DispatchOutcome;
pub use structs::ElevatorState;
pub use structs::MoveOutcome;
pub use structs::Request;
pub use structs::UnitStatus;
