/***************************************/
/*        3rd party libraries          */
/***************************************/
use thiserror::Error;

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid floor selected: {floor}")]
    InvalidFloor { floor: i32 },

    #[error("cannot determine direction for floor {floor}")]
    DirectionUndeterminable { floor: i32 },

    #[error("dispatch controller has not been initialized")]
    NotInitialized,

    #[error("no elevators are configured")]
    EmptyFleet,

    #[error("destination input unavailable: {0}")]
    Input(String),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
