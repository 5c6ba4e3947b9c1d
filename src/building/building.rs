/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::info;
use std::sync::Arc;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::FloorRegistry;
use crate::config::Config;
use crate::elevator::{Delayer, Elevator, ElevatorUnit, UnitTiming};
use crate::shared::error::Result;

/***************************************/
/*             Public API              */
/***************************************/
/**
 * Floors and elevators of one building block, assembled before dispatching starts.
 *
 * This is the configuration step: elevators are created here, given their
 * served floors and finally handed to the dispatch controller as units.
 */
#[derive(Debug, Default)]
pub struct Building {
    floors: FloorRegistry,
    elevators: Vec<Elevator>,
}

impl Building {
    pub fn new() -> Building {
        Building::default()
    }

    /// Contiguous floors from the configured ground floor, each elevator serving all of them.
    pub fn from_config(config: &Config) -> Result<Building> {
        let mut building = Building::new();
        building.add_floors(
            config.building.ground_floor,
            config.building.floor_count,
            false,
        );
        for _ in 0..config.building.elevator_count {
            building.add_elevator(config.elevator.default_capacity)?;
        }
        Ok(building)
    }

    /// Adds floors and, when `apply_to_elevators` is set, makes existing elevators serve them too.
    pub fn add_floors(&mut self, ground: i32, count: i32, apply_to_elevators: bool) {
        self.floors.extend_from_ground(ground, count);
        info!(
            "Building has {} floors from {:?} to {:?}",
            self.floors.len(),
            self.floors.min_floor(),
            self.floors.max_floor()
        );

        if apply_to_elevators {
            for elevator in self.elevators.iter_mut() {
                for floor in self.floors.floors() {
                    elevator.add_floor(floor);
                }
            }
        }
    }

    /// New elevators serve every floor currently registered.
    pub fn add_elevator(&mut self, capacity: i32) -> Result<&Elevator> {
        let mut elevator = Elevator::new(capacity)?;
        for floor in self.floors.floors() {
            elevator.add_floor(floor);
        }
        info!("New elevator {} has been added", elevator.id());
        self.elevators.push(elevator);
        Ok(&self.elevators[self.elevators.len() - 1])
    }

    /// Drops every elevator and floor.
    pub fn reset(&mut self) {
        self.elevators.clear();
        self.floors.clear();
        info!("Building configuration has been reset");
    }

    pub fn floors(&self) -> &FloorRegistry {
        &self.floors
    }

    pub fn elevators(&self) -> &[Elevator] {
        &self.elevators
    }

    pub fn into_units(
        self,
        delayer: Arc<dyn Delayer>,
        timing: UnitTiming,
    ) -> (Vec<ElevatorUnit>, FloorRegistry) {
        let units = self
            .elevators
            .into_iter()
            .map(|elevator| ElevatorUnit::new(elevator, delayer.clone(), timing))
            .collect();
        (units, self.floors)
    }
}
