/***************************************/
/*        3rd party libraries          */
/***************************************/
use uuid::Uuid;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::error::Result;
use crate::shared::Request;

/***************************************/
/*             Public API              */
/***************************************/
/// Supplies the drop-off floor once an elevator has loaded its passengers.
///
/// Called on a blocking thread, so implementations may wait on a console or a channel.
pub trait DestinationInput: Send + Sync {
    fn destination_floor(&self, elevator: Uuid, request: &Request) -> Result<i32>;
}

/// Always answers with the same floor.
#[derive(Debug, Clone, Copy)]
pub struct FixedDestination(pub i32);

impl DestinationInput for FixedDestination {
    fn destination_floor(&self, _elevator: Uuid, _request: &Request) -> Result<i32> {
        Ok(self.0)
    }
}

impl<F> DestinationInput for F
where
    F: Fn(Uuid, &Request) -> Result<i32> + Send + Sync,
{
    fn destination_floor(&self, elevator: Uuid, request: &Request) -> Result<i32> {
        self(elevator, request)
    }
}
