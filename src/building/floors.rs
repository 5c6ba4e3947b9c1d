/***************************************/
/*        3rd party libraries          */
/***************************************/
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::shared::error::{DispatchError, Result};
use crate::shared::DirectionSet;

const GROUND_FLOOR_NAME: &str = "Ground";

/***************************************/
/*       Public data structures        */
/***************************************/
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Floor {
    number: i32,
    name: String,
}

impl Floor {
    pub fn new(number: i32, name: impl Into<String>) -> Floor {
        Floor {
            number,
            name: name.into(),
        }
    }

    /// Floor 0 is the ground floor; every other floor is named after its number.
    pub fn numbered(number: i32) -> Floor {
        let name = if number == 0 {
            GROUND_FLOOR_NAME.to_string()
        } else {
            number.to_string()
        };
        Floor::new(number, name)
    }

    pub fn number(&self) -> i32 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/**
 * Ordered set of the floors served by an elevator group.
 *
 * Floors are shared with the elevators that stop at them, so the registry
 * hands out `Arc<Floor>` references rather than owned copies.
 */
#[derive(Debug, Clone, Default)]
pub struct FloorRegistry {
    floors: BTreeMap<i32, Arc<Floor>>,
}

impl FloorRegistry {
    pub fn new() -> FloorRegistry {
        FloorRegistry::default()
    }

    /// Builds `count` contiguous floors where the `ground`-th floor from the bottom is floor 0.
    ///
    /// `from_ground(3, 10)` yields floors -2 through 7.
    pub fn from_ground(ground: i32, count: i32) -> FloorRegistry {
        let mut registry = FloorRegistry::new();
        registry.extend_from_ground(ground, count);
        registry
    }

    pub fn extend_from_ground(&mut self, ground: i32, count: i32) {
        for number in (1 - ground)..(count - ground + 1) {
            self.add(Floor::numbered(number));
        }
    }

    /// Adds a floor, keeping the existing entry if the number is already registered.
    pub fn add(&mut self, floor: Floor) -> Arc<Floor> {
        self.floors
            .entry(floor.number)
            .or_insert_with(|| Arc::new(floor))
            .clone()
    }

    pub fn get(&self, number: i32) -> Option<&Arc<Floor>> {
        self.floors.get(&number)
    }

    pub fn contains(&self, number: i32) -> bool {
        self.floors.contains_key(&number)
    }

    pub fn floors(&self) -> impl Iterator<Item = &Arc<Floor>> {
        self.floors.values()
    }

    pub fn min_floor(&self) -> Option<i32> {
        self.floors.keys().next().copied()
    }

    pub fn max_floor(&self) -> Option<i32> {
        self.floors.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.floors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.floors.is_empty()
    }

    pub fn clear(&mut self) {
        self.floors.clear();
    }

    pub fn available_directions(&self, floor: i32) -> Result<DirectionSet> {
        let (lowest, highest) = match (self.min_floor(), self.max_floor()) {
            (Some(lowest), Some(highest)) => (lowest, highest),
            _ => return Err(DispatchError::DirectionUndeterminable { floor }),
        };

        if floor == lowest {
            Ok(DirectionSet::UP)
        } else if floor > lowest && floor < highest {
            Ok(DirectionSet::BOTH)
        } else if floor == highest {
            Ok(DirectionSet::DOWN)
        } else {
            Err(DispatchError::DirectionUndeterminable { floor })
        }
    }
}
