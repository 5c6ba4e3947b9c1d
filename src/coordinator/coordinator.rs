/***************************************/
/*        3rd party libraries          */
/***************************************/
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/***************************************/
/*           Local modules             */
/***************************************/
use crate::building::FloorRegistry;
use crate::config::DispatchConfig;
use crate::coordinator::input::DestinationInput;
use crate::coordinator::notify::{DispatchObserver, Notifier};
use crate::elevator::{Delayer, ElevatorUnit, UnitLease};
use crate::shared::error::{DispatchError, Result};
use crate::shared::{
    Direction, DirectionSet, DispatchEvent, DispatchOutcome, ElevatorState, MoveOutcome, Request,
    UnitStatus,
};

struct Fleet {
    units: Vec<Arc<ElevatorUnit>>,
    floors: FloorRegistry,
}

/***************************************/
/*             Public API              */
/***************************************/
/**
 * Assigns requests to elevators and queues the ones no elevator can take yet.
 *
 * The controller is shared between callers (`Arc<DispatchController>`), so
 * every operation takes `&self`. A unit is driven by at most one dispatch at a
 * time: a dispatch must hold the unit's `UnitLease`, and a dispatch that loses
 * the race for a unit moves on to the next candidate.
 *
 * # Fields
 * - `fleet`:           Units and floors, set once by `initialize`.
 * - `pending`:         FIFO of requests waiting for a free unit.
 * - `active`:          Cancellation token of each unit's in-flight dispatch.
 * - `notifier`:        Observers of request and arrival events.
 * - `input`:           Collaborator asked for the drop-off floor.
 * - `delayer`:         Time source for the grace delay before draining.
 * - `grace_delay`:     Wait between queueing a request and draining the queue.
 */
pub struct DispatchController {
    fleet: OnceLock<Fleet>,
    pending: Mutex<VecDeque<Request>>,
    active: Mutex<HashMap<Uuid, CancellationToken>>,
    notifier: Notifier,
    input: Arc<dyn DestinationInput>,
    delayer: Arc<dyn Delayer>,
    grace_delay: Duration,
}

impl DispatchController {
    pub fn new(
        config: &DispatchConfig,
        input: Arc<dyn DestinationInput>,
        delayer: Arc<dyn Delayer>,
    ) -> DispatchController {
        DispatchController {
            fleet: OnceLock::new(),
            pending: Mutex::new(VecDeque::new()),
            active: Mutex::new(HashMap::new()),
            notifier: Notifier::new(),
            input,
            delayer,
            grace_delay: config.grace_delay(),
        }
    }

    /// Hands the fleet to the controller. Only the first call takes effect.
    pub fn initialize(&self, units: Vec<ElevatorUnit>, floors: FloorRegistry) -> bool {
        let fleet = Fleet {
            units: units.into_iter().map(Arc::new).collect(),
            floors,
        };
        let unit_count = fleet.units.len();

        match self.fleet.set(fleet) {
            Ok(()) => {
                info!("Dispatch controller initialized with {} elevators", unit_count);
                true
            }
            Err(_) => {
                warn!("Dispatch controller already initialized, keeping the original fleet");
                false
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.fleet.get().is_some()
    }

    pub fn subscribe(&self, observer: Arc<dyn DispatchObserver>) {
        self.notifier.subscribe(observer);
    }

    pub fn units(&self) -> &[Arc<ElevatorUnit>] {
        self.fleet
            .get()
            .map(|fleet| fleet.units.as_slice())
            .unwrap_or(&[])
    }

    pub fn unit(&self, id: Uuid) -> Option<&Arc<ElevatorUnit>> {
        self.units().iter().find(|unit| unit.id() == id)
    }

    pub fn fleet_status(&self) -> Vec<UnitStatus> {
        self.units().iter().map(|unit| unit.status()).collect()
    }

    pub fn pending_requests(&self) -> Vec<Request> {
        self.pending.lock().iter().copied().collect()
    }

    pub fn available_directions(&self, floor: i32) -> Result<DirectionSet> {
        self.fleet()?.floors.available_directions(floor)
    }

    /// Best unit for `request`, or `None` if no unit currently qualifies.
    pub fn select_unit(&self, request: &Request) -> Result<Option<Arc<ElevatorUnit>>> {
        Ok(self.rank_candidates(request)?.into_iter().next())
    }

    /// Queues `people` for `floor`, split into loads the largest elevator can carry.
    pub async fn enqueue_request(
        &self,
        floor: i32,
        people: u32,
        direction: Direction,
    ) -> Result<bool> {
        let max_capacity = self
            .fleet()?
            .units
            .iter()
            .map(|unit| unit.capacity())
            .max()
            .ok_or(DispatchError::EmptyFleet)?;

        let parts = Request::new(floor, people, direction)?.split(max_capacity);
        if parts.len() > 1 {
            info!(
                "We currently have no elevators that take {} people. Sending {} elevators instead",
                people,
                parts.len()
            );
        }

        self.pending.lock().extend(parts);
        self.notifier
            .emit(DispatchEvent::RequestReceived { floor, direction })
            .await;

        Ok(true)
    }

    /// Dispatches immediately if a unit is free, otherwise queues the request and drains the queue after the grace delay.
    pub async fn request_elevator(&self, request: Request) -> Result<DispatchOutcome> {
        if let Some(lease) = self.claim_unit(&request)? {
            return self.dispatch(lease, request).await;
        }

        if self
            .enqueue_request(request.floor(), request.people(), request.direction())
            .await?
        {
            self.delayer.delay(self.grace_delay).await;
            self.process_pending_requests().await?;
        }

        Ok(DispatchOutcome::Queued)
    }

    /// Drains the pending queue front to back. Requests that still find no unit go to the back again.
    pub async fn process_pending_requests(&self) -> Result<bool> {
        loop {
            let next = self.pending.lock().pop_front();
            let Some(request) = next else {
                break;
            };

            match self.claim_unit(&request)? {
                Some(lease) => {
                    if let Err(e) = self.dispatch(lease, request).await {
                        warn!("Dropping pending request {:?}: {}", request, e);
                    }
                }
                None => {
                    self.enqueue_request(request.floor(), request.people(), request.direction())
                        .await?;
                    self.delayer.delay(self.grace_delay).await;
                }
            }
        }

        Ok(true)
    }

    /// Stops a unit. An in-flight dispatch is cancelled at its next floor step.
    pub fn emergency_stop(&self, id: Uuid) -> bool {
        let Some(unit) = self.unit(id) else {
            return false;
        };

        match self.active.lock().get(&id) {
            Some(token) => token.cancel(),
            None => unit.make_emergency_stop(),
        }
        true
    }

    fn fleet(&self) -> Result<&Fleet> {
        self.fleet.get().ok_or(DispatchError::NotInitialized)
    }

    // Moving units still approaching the request floor first, then stationary ones, lowest floor wins.
    fn rank_candidates(&self, request: &Request) -> Result<Vec<Arc<ElevatorUnit>>> {
        let eligible: Vec<(Arc<ElevatorUnit>, UnitStatus)> = self
            .fleet()?
            .units
            .iter()
            .map(|unit| (Arc::clone(unit), unit.status()))
            .filter(|(_, status)| can_carry(status, request))
            .collect();

        let moving = eligible
            .iter()
            .filter(|(_, status)| is_approaching(status, request));
        let stationary = eligible
            .iter()
            .filter(|(_, status)| status.state == ElevatorState::Stationary);

        // Stable sort, so ties keep moving units ahead of stationary ones.
        let mut ranked: Vec<&(Arc<ElevatorUnit>, UnitStatus)> = moving.chain(stationary).collect();
        ranked.sort_by_key(|(_, status)| status.current_floor);

        Ok(ranked.into_iter().map(|(unit, _)| Arc::clone(unit)).collect())
    }

    fn claim_unit(&self, request: &Request) -> Result<Option<UnitLease>> {
        for unit in self.rank_candidates(request)? {
            let Some(lease) = unit.try_lease() else {
                debug!("Elevator {} is held by another dispatch", unit.id());
                continue;
            };

            let status = lease.status();
            if can_carry(&status, request)
                && matches!(
                    status.state,
                    ElevatorState::Stationary | ElevatorState::Moving
                )
            {
                return Ok(Some(lease));
            }
            debug!("Elevator {} changed state before it could be claimed", unit.id());
        }

        Ok(None)
    }

    async fn dispatch(&self, lease: UnitLease, request: Request) -> Result<DispatchOutcome> {
        let id = lease.id();
        let cancel = CancellationToken::new();
        self.active.lock().insert(id, cancel.clone());

        let outcome = self.pickup_and_move(&lease, request, &cancel).await;

        self.active.lock().remove(&id);
        outcome
    }

    async fn pickup_and_move(
        &self,
        lease: &UnitLease,
        request: Request,
        cancel: &CancellationToken,
    ) -> Result<DispatchOutcome> {
        if lease.process_request(&request, cancel).await? == MoveOutcome::Cancelled {
            info!("Move operation canceled for elevator {}", lease.id());
            return Ok(DispatchOutcome::Cancelled);
        }

        let destination = match self.ask_destination(lease.id(), request).await {
            Ok(floor) => floor,
            Err(e) => {
                lease.settle();
                return Err(e);
            }
        };

        match lease
            .move_to_floor(destination, request.direction(), cancel)
            .await
        {
            Ok(MoveOutcome::Arrived) => {
                self.notifier
                    .emit(DispatchEvent::ElevatorArrived {
                        elevator: lease.id(),
                        floor: destination,
                        direction: request.direction(),
                    })
                    .await;
                Ok(DispatchOutcome::Delivered)
            }
            Ok(MoveOutcome::Cancelled) => {
                info!("Move operation canceled for elevator {}", lease.id());
                Ok(DispatchOutcome::Cancelled)
            }
            Err(e) => {
                lease.settle();
                Err(e)
            }
        }
    }

    async fn ask_destination(&self, elevator: Uuid, request: Request) -> Result<i32> {
        info!("Elevator {} ready and loaded, waiting for a destination", elevator);
        let input = Arc::clone(&self.input);
        tokio::task::spawn_blocking(move || input.destination_floor(elevator, &request))
            .await
            .map_err(|e| DispatchError::Input(e.to_string()))?
    }
}

fn can_carry(status: &UnitStatus, request: &Request) -> bool {
    status.state != ElevatorState::OutOfOrder
        && !status.capacity_reached()
        && status.has_space_for(request.people())
}

fn is_approaching(status: &UnitStatus, request: &Request) -> bool {
    status.state == ElevatorState::Moving
        && status.direction == request.direction()
        && match request.direction() {
            Direction::Up => status.current_floor < request.floor(),
            Direction::Down => status.current_floor > request.floor(),
            Direction::Stop => false,
        }
}
