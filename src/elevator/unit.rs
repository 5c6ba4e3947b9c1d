/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::elevator::delay::{Delayer, UnitTiming};
use crate::elevator::Elevator;
use crate::shared::error::{DispatchError, Result};
use crate::shared::{Direction, ElevatorState, MoveOutcome, Request, UnitStatus};

/***************************************/
/*             Public API              */
/***************************************/
/**
 * Drives one `Elevator` through pickups and drop-offs.
 *
 * The unit is the only writer of its elevator's state. Reads take a short
 * lock and never hold it across a suspension point, so other dispatches
 * and the controller always observe a consistent snapshot.
 *
 * # Fields
 * - `elevator`:    The car being driven.
 * - `leased`:      Set while a dispatch holds the unit through a `UnitLease`.
 * - `delayer`:     Injected time source for door and floor delays.
 * - `timing`:      Durations for each simulated step.
 */
pub struct ElevatorUnit {
    id: Uuid,
    capacity: u32,
    elevator: Mutex<Elevator>,
    leased: AtomicBool,
    delayer: Arc<dyn Delayer>,
    timing: UnitTiming,
}

impl ElevatorUnit {
    pub fn new(elevator: Elevator, delayer: Arc<dyn Delayer>, timing: UnitTiming) -> ElevatorUnit {
        ElevatorUnit {
            id: elevator.id(),
            capacity: elevator.max_occupants(),
            elevator: Mutex::new(elevator),
            leased: AtomicBool::new(false),
            delayer,
            timing,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn status(&self) -> UnitStatus {
        self.elevator.lock().status()
    }

    pub fn current_floor(&self) -> i32 {
        self.elevator.lock().current_floor()
    }

    pub fn current_occupants(&self) -> u32 {
        self.elevator.lock().current_occupants()
    }

    pub fn state(&self) -> ElevatorState {
        self.elevator.lock().state()
    }

    pub fn direction(&self) -> Direction {
        self.elevator.lock().direction()
    }

    pub fn served_floors(&self) -> Vec<i32> {
        self.elevator
            .lock()
            .served_floors()
            .map(|floor| floor.number())
            .collect()
    }

    pub fn has_floor(&self, floor: i32) -> bool {
        self.elevator.lock().serves(floor)
    }

    pub fn floor_name(&self, floor: i32) -> Option<String> {
        self.elevator
            .lock()
            .served_floor(floor)
            .map(|floor| floor.name().to_string())
    }

    pub fn has_space_for(&self, people: u32) -> bool {
        self.status().has_space_for(people)
    }

    pub fn capacity_reached(&self) -> bool {
        self.status().capacity_reached()
    }

    pub fn is_leased(&self) -> bool {
        self.leased.load(Ordering::Acquire)
    }

    /// Takes the unit out of service. Nothing in the core brings it back.
    pub fn make_emergency_stop(&self) {
        warn!("Emergency stop requested. Stopping elevator {}", self.id);
        self.elevator.lock().set_state(ElevatorState::OutOfOrder);
    }

    /// Claims the unit for one dispatch. Returns `None` if another dispatch already holds it.
    pub fn try_lease(self: &Arc<Self>) -> Option<UnitLease> {
        self.leased
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UnitLease { unit: self.clone() })
    }

    /// Travels to the request floor (if not already there), opens the doors and boards the passengers.
    pub async fn process_request(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<MoveOutcome> {
        if !self.has_floor(request.floor()) {
            return Err(DispatchError::InvalidFloor {
                floor: request.floor(),
            });
        }

        info!(
            "Elevator {} is on the way to floor {} to pick up {} people",
            self.id,
            request.floor(),
            request.people()
        );

        if self.current_floor() != request.floor()
            && self.simulate_movement(request.floor(), cancel).await == MoveOutcome::Cancelled
        {
            return Ok(MoveOutcome::Cancelled);
        }

        info!("Elevator {} has arrived on floor {}", self.id, request.floor());
        {
            let mut elevator = self.elevator.lock();
            elevator.set_state(ElevatorState::Loading);
            elevator.set_current_floor(request.floor());
            elevator.set_direction(Direction::Stop);
        }
        self.simulate_doors_opening().await;

        self.elevator
            .lock()
            .set_current_occupants(request.people());

        Ok(MoveOutcome::Arrived)
    }

    /// Closes the doors, travels to `floor` and lets everyone out.
    pub async fn move_to_floor(
        &self,
        floor: i32,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<MoveOutcome> {
        let Some(name) = self.floor_name(floor) else {
            return Err(DispatchError::InvalidFloor { floor });
        };

        self.simulate_doors_closing().await;

        // A stop raised while loading or waiting for a destination lands here.
        if cancel.is_cancelled() {
            self.make_emergency_stop();
            return Ok(MoveOutcome::Cancelled);
        }

        let from = self.current_floor();
        if from != floor && Direction::between(from, floor) != direction {
            debug!(
                "Elevator {} was requested {} but travels {} to reach floor {}",
                self.id,
                direction,
                Direction::between(from, floor),
                floor
            );
        }

        info!("Elevator {} moving from floor {} to {}", self.id, from, floor);
        if from != floor && self.simulate_movement(floor, cancel).await == MoveOutcome::Cancelled {
            return Ok(MoveOutcome::Cancelled);
        }

        {
            let mut elevator = self.elevator.lock();
            elevator.set_current_floor(floor);
            elevator.set_state(ElevatorState::Stationary);
            elevator.set_direction(Direction::Stop);
        }
        self.simulate_doors_opening().await;
        info!("Elevator {} has arrived on floor {} ({})", self.id, floor, name);

        self.elevator.lock().set_current_occupants(0);

        Ok(MoveOutcome::Arrived)
    }

    /// Lets passengers out where the car stands and returns it to service.
    pub(crate) fn settle(&self) {
        let mut elevator = self.elevator.lock();
        if elevator.state() != ElevatorState::OutOfOrder {
            elevator.set_state(ElevatorState::Stationary);
        }
        elevator.set_direction(Direction::Stop);
        elevator.set_current_occupants(0);
    }

    async fn simulate_movement(&self, target: i32, cancel: &CancellationToken) -> MoveOutcome {
        let direction = {
            let mut elevator = self.elevator.lock();
            let direction = Direction::between(elevator.current_floor(), target);
            elevator.set_state(ElevatorState::Moving);
            elevator.set_direction(direction);
            direction
        };
        debug!("Elevator {} going {}", self.id, direction);

        while self.current_floor() != target {
            if cancel.is_cancelled() {
                self.make_emergency_stop();
                return MoveOutcome::Cancelled;
            }

            let (floor, occupants) = {
                let mut elevator = self.elevator.lock();
                let next = elevator.current_floor() + direction.step();
                elevator.set_current_floor(next);
                (next, elevator.current_occupants())
            };

            debug!(
                "Elevator {} moving with {} people. Current floor: {}",
                self.id, occupants, floor
            );
            self.delayer.delay(self.timing.floor_travel).await;
        }

        MoveOutcome::Arrived
    }

    async fn simulate_doors_closing(&self) {
        debug!("Elevator {}: doors closing...", self.id);
        self.delayer.delay(self.timing.door_transition).await;
        debug!("Elevator {}: doors closed.", self.id);
        self.delayer.delay(self.timing.door_settle).await;
    }

    async fn simulate_doors_opening(&self) {
        debug!("Elevator {}: doors opening...", self.id);
        self.delayer.delay(self.timing.door_transition).await;
        debug!("Elevator {}: doors open.", self.id);
    }

    #[cfg(test)]
    pub(crate) fn test_set_state(
        &self,
        floor: i32,
        state: ElevatorState,
        direction: Direction,
        occupants: u32,
    ) {
        let mut elevator = self.elevator.lock();
        elevator.set_current_floor(floor);
        elevator.set_state(state);
        elevator.set_direction(direction);
        elevator.set_current_occupants(occupants);
    }
}

/// Exclusive right to drive a unit for one dispatch. Released on drop.
pub struct UnitLease {
    unit: Arc<ElevatorUnit>,
}

impl Deref for UnitLease {
    type Target = ElevatorUnit;

    fn deref(&self) -> &ElevatorUnit {
        &self.unit
    }
}

impl Drop for UnitLease {
    fn drop(&mut self) {
        self.unit.leased.store(false, Ordering::Release);
    }
}
