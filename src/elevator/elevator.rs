/***************************************/
/*        3rd party libraries          */
/***************************************/
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::Floor;
use crate::shared::error::{DispatchError, Result};
use crate::shared::{Direction, ElevatorState, UnitStatus};

pub const DEFAULT_CAPACITY: i32 = 10;

/***************************************/
/*       Public data structures        */
/***************************************/
/**
 * A single elevator car.
 *
 * # Fields
 * - `id`:                  Random identity assigned at construction.
 * - `max_occupants`:       Fixed capacity, always positive.
 * - `current_floor`:       Floor number the car is at, 0 (ground) until moved.
 * - `current_occupants`:   People inside, never above `max_occupants`.
 * - `direction`:           Direction of travel, `Stop` when not moving.
 * - `state`:               Operating state.
 * - `served_floors`:       Floors the car stops at, keyed by floor number.
 */
#[derive(Debug, Clone)]
pub struct Elevator {
    id: Uuid,
    max_occupants: u32,
    current_floor: i32,
    current_occupants: u32,
    direction: Direction,
    state: ElevatorState,
    served_floors: BTreeMap<i32, Arc<Floor>>,
}

impl Elevator {
    pub fn new(max_occupants: i32) -> Result<Elevator> {
        if max_occupants <= 0 {
            return Err(DispatchError::Validation(format!(
                "maximum occupants must be greater than zero, got {}",
                max_occupants
            )));
        }

        Ok(Elevator {
            id: Uuid::new_v4(),
            max_occupants: max_occupants as u32,
            current_floor: 0,
            current_occupants: 0,
            direction: Direction::Stop,
            state: ElevatorState::Stationary,
            served_floors: BTreeMap::new(),
        })
    }

    /// Adding a floor that is already served is a no-op.
    pub fn add_floor(&mut self, floor: &Arc<Floor>) {
        self.served_floors
            .entry(floor.number())
            .or_insert_with(|| floor.clone());
    }

    pub fn serves(&self, floor: i32) -> bool {
        self.served_floors.contains_key(&floor)
    }

    pub fn served_floor(&self, floor: i32) -> Option<&Arc<Floor>> {
        self.served_floors.get(&floor)
    }

    pub fn served_floors(&self) -> impl Iterator<Item = &Arc<Floor>> {
        self.served_floors.values()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn max_occupants(&self) -> u32 {
        self.max_occupants
    }

    pub fn current_floor(&self) -> i32 {
        self.current_floor
    }

    pub fn current_occupants(&self) -> u32 {
        self.current_occupants
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> ElevatorState {
        self.state
    }

    pub(crate) fn set_current_floor(&mut self, floor: i32) {
        self.current_floor = floor;
    }

    /// Clamped to capacity.
    pub(crate) fn set_current_occupants(&mut self, occupants: u32) {
        self.current_occupants = occupants.min(self.max_occupants);
    }

    pub(crate) fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn set_state(&mut self, state: ElevatorState) {
        self.state = state;
    }

    pub fn status(&self) -> UnitStatus {
        UnitStatus {
            id: self.id,
            max_occupants: self.max_occupants,
            current_floor: self.current_floor,
            current_occupants: self.current_occupants,
            direction: self.direction,
            state: self.state,
        }
    }
}
