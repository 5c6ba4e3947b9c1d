/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Deserialize;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::error::{DispatchError, Result};

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Stop,
}

impl Direction {
    /// Floor delta of one step in this direction.
    pub fn step(&self) -> i32 {
        match *self {
            Direction::Up => 1,
            Direction::Down => -1,
            Direction::Stop => 0,
        }
    }

    /// Direction of travel from `from` to `to`. Equal floors count as up.
    pub fn between(from: i32, to: i32) -> Direction {
        if from > to {
            Direction::Down
        } else {
            Direction::Up
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
            Direction::Stop => write!(f, "none"),
        }
    }
}

/// The directions a caller may choose from at a given floor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectionSet {
    pub up: bool,
    pub down: bool,
}

impl DirectionSet {
    pub const UP: DirectionSet = DirectionSet { up: true, down: false };
    pub const DOWN: DirectionSet = DirectionSet { up: false, down: true };
    pub const BOTH: DirectionSet = DirectionSet { up: true, down: true };

    pub fn contains(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Stop => false,
        }
    }

    /// The only available direction, if there is exactly one.
    pub fn single(&self) -> Option<Direction> {
        match (self.up, self.down) {
            (true, false) => Some(Direction::Up),
            (false, true) => Some(Direction::Down),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ElevatorState {
    #[default]
    Stationary,
    Moving,
    Loading,
    OutOfOrder,
}

/// A caller's need for an elevator: `people` waiting on `floor` wanting to travel in `direction`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    floor: i32,
    people: u32,
    direction: Direction,
}

impl Request {
    pub fn new(floor: i32, people: u32, direction: Direction) -> Result<Request> {
        if people == 0 {
            return Err(DispatchError::Validation(
                "a request needs at least one person".into(),
            ));
        }
        Ok(Request {
            floor,
            people,
            direction,
        })
    }

    pub fn floor(&self) -> i32 {
        self.floor
    }

    pub fn people(&self) -> u32 {
        self.people
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Splits into full loads of `max_capacity` plus one remainder, all for the same floor and direction.
    pub fn split(&self, max_capacity: u32) -> Vec<Request> {
        if max_capacity == 0 || self.people <= max_capacity {
            return vec![*self];
        }

        let full_loads = self.people / max_capacity;
        let remainder = self.people % max_capacity;

        let mut parts = vec![
            Request {
                people: max_capacity,
                ..*self
            };
            full_loads as usize
        ];
        if remainder > 0 {
            parts.push(Request {
                people: remainder,
                ..*self
            });
        }
        parts
    }
}

/// Point-in-time copy of one elevator, taken under a single lock.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UnitStatus {
    pub id: Uuid,
    #[serde(rename = "maxOccupants")]
    pub max_occupants: u32,
    #[serde(rename = "currentFloor")]
    pub current_floor: i32,
    #[serde(rename = "currentOccupants")]
    pub current_occupants: u32,
    pub direction: Direction,
    pub state: ElevatorState,
}

impl UnitStatus {
    pub fn has_space_for(&self, people: u32) -> bool {
        self.current_occupants.saturating_add(people) <= self.max_occupants
    }

    pub fn capacity_reached(&self) -> bool {
        self.current_occupants >= self.max_occupants
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum DispatchEvent {
    RequestReceived {
        floor: i32,
        direction: Direction,
    },
    ElevatorArrived {
        elevator: Uuid,
        floor: i32,
        direction: Direction,
    },
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchEvent::RequestReceived { floor, direction } => write!(
                f,
                "New elevator request received for floor {}, direction {}",
                floor, direction
            ),
            DispatchEvent::ElevatorArrived {
                elevator,
                floor,
                direction,
            } => write!(
                f,
                "Elevator {} has arrived on floor {} (requested {})",
                elevator, floor, direction
            ),
        }
    }
}

/// Result of a single unit operation. Cancellation is reported, not raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Arrived,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Picked up and dropped off at the requested destination.
    Delivered,
    /// An emergency stop interrupted the pickup or the move.
    Cancelled,
    /// No unit fit; the request went to the pending queue.
    Queued,
}

/***************************************/
/*             Unit tests              */
/***************************************/
