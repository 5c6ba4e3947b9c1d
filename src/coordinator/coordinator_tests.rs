/*
 * Unit tests for coordinator module
 *
 * The unit tests follows the Arrange, Act, Assert pattern.
 *
 * Every controller runs on a ten floor building (-2 to 7, ground is the
 * third floor from the bottom) with InstantDelayer, so nothing sleeps.
 * Tests that need a dispatch to stay in flight hold it in the destination
 * prompt with a crossbeam channel.
 *
 * Tests:
 *  - test_available_directions_*
 *  - test_initialize_*
 *  - test_select_unit_*
 *  - test_request_*
 *  - test_enqueue_*
 *  - test_concurrent_*
 *  - test_emergency_stop_*
 *  - test_observer_*
 *  - test_poller_drains_queue
 */

/***************************************/
/*             Unit tests              */
/***************************************/
#[cfg(test)]
mod coordinator_tests {
    use async_trait::async_trait;
    use crossbeam_channel::{unbounded, Receiver};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use uuid::Uuid;

    use crate::building::{Building, FloorRegistry};
    use crate::config::DispatchConfig;
    use crate::coordinator::{
        run_pending_poller, ChannelObserver, DestinationInput, DispatchController,
        DispatchObserver, FixedDestination,
    };
    use crate::elevator::{ElevatorUnit, InstantDelayer, UnitTiming};
    use crate::shared::{
        Direction, DirectionSet, DispatchError, DispatchEvent, DispatchOutcome, ElevatorState,
        Request,
    };

    fn setup_controller(
        elevator_count: usize,
        capacity: i32,
        input: Arc<dyn DestinationInput>,
    ) -> (Arc<DispatchController>, Vec<Arc<ElevatorUnit>>) {
        let mut building = Building::new();
        building.add_floors(3, 10, false);
        for _ in 0..elevator_count {
            building.add_elevator(capacity).unwrap();
        }
        let (units, floors) = building.into_units(Arc::new(InstantDelayer), UnitTiming::default());

        let controller = Arc::new(new_controller(input));
        assert!(controller.initialize(units, floors));
        let units = controller.units().to_vec();

        (controller, units)
    }

    fn new_controller(input: Arc<dyn DestinationInput>) -> DispatchController {
        let config = DispatchConfig {
            grace_delay: 0,
            polling_interval: 1,
        };
        DispatchController::new(&config, input, Arc::new(InstantDelayer))
    }

    /// Holds dispatches for floor -2 until a destination is sent; every other request is dropped off where it was picked up.
    fn gated_input(gate_rx: Receiver<i32>) -> Arc<dyn DestinationInput> {
        Arc::new(
            move |_: Uuid, request: &Request| -> Result<i32, DispatchError> {
                if request.floor() == -2 {
                    gate_rx
                        .recv()
                        .map_err(|e| DispatchError::Input(e.to_string()))
                } else {
                    Ok(request.floor())
                }
            },
        )
    }

    async fn wait_until(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition was not reached in time");
    }

    fn request(floor: i32, people: u32, direction: Direction) -> Request {
        Request::new(floor, people, direction).unwrap()
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<DispatchEvent>>,
    }

    impl RecordingObserver {
        fn requests_received(&self) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|event| matches!(event, DispatchEvent::RequestReceived { .. }))
                .count()
        }

        fn arrivals(&self) -> usize {
            self.events
                .lock()
                .iter()
                .filter(|event| matches!(event, DispatchEvent::ElevatorArrived { .. }))
                .count()
        }
    }

    #[async_trait]
    impl DispatchObserver for RecordingObserver {
        async fn notify(&self, event: &DispatchEvent) -> anyhow::Result<()> {
            self.events.lock().push(event.clone());
            Ok(())
        }
    }

    struct FailingObserver;

    #[async_trait]
    impl DispatchObserver for FailingObserver {
        async fn notify(&self, _event: &DispatchEvent) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("subscriber unavailable"))
        }
    }

    struct PanickingObserver;

    #[async_trait]
    impl DispatchObserver for PanickingObserver {
        async fn notify(&self, _event: &DispatchEvent) -> anyhow::Result<()> {
            panic!("subscriber crashed");
        }
    }

    #[test]
    fn test_available_directions_follow_floor_range() {
        // Arrange
        let (controller, _units) = setup_controller(3, 10, Arc::new(FixedDestination(0)));

        // Act / Assert
        assert_eq!(controller.available_directions(0), Ok(DirectionSet::BOTH));
        assert_eq!(controller.available_directions(-2), Ok(DirectionSet::UP));
        assert_eq!(controller.available_directions(7), Ok(DirectionSet::DOWN));
        assert_eq!(
            controller.available_directions(8),
            Err(DispatchError::DirectionUndeterminable { floor: 8 })
        );
    }

    #[tokio::test]
    async fn test_initialize_is_required() {
        // Arrange
        let controller = new_controller(Arc::new(FixedDestination(0)));

        // Act
        let directions = controller.available_directions(0);
        let outcome = controller.request_elevator(request(0, 1, Direction::Up)).await;

        // Assert
        assert!(!controller.is_initialized());
        assert!(controller.units().is_empty());
        assert_eq!(directions, Err(DispatchError::NotInitialized));
        assert_eq!(outcome, Err(DispatchError::NotInitialized));
    }

    #[test]
    fn test_initialize_twice_keeps_original_fleet() {
        // Arrange
        let (controller, _units) = setup_controller(3, 10, Arc::new(FixedDestination(0)));
        let mut other = Building::new();
        other.add_floors(1, 2, false);
        other.add_elevator(5).unwrap();
        let (other_units, other_floors) =
            other.into_units(Arc::new(InstantDelayer), UnitTiming::default());

        // Act
        let accepted = controller.initialize(other_units, other_floors);

        // Assert
        assert!(!accepted);
        assert_eq!(controller.units().len(), 3);
        assert_eq!(controller.available_directions(7), Ok(DirectionSet::DOWN));
    }

    #[test]
    fn test_select_unit_prefers_lowest_floor() {
        // Arrange
        let (controller, units) = setup_controller(3, 10, Arc::new(FixedDestination(0)));
        units[0].test_set_state(5, ElevatorState::Stationary, Direction::Stop, 0);
        units[1].test_set_state(1, ElevatorState::Moving, Direction::Up, 0);
        units[2].test_set_state(-2, ElevatorState::Stationary, Direction::Stop, 0);

        // Act
        let selected = controller
            .select_unit(&request(4, 2, Direction::Up))
            .unwrap()
            .unwrap();

        // Assert
        assert_eq!(selected.id(), units[2].id());
    }

    #[test]
    fn test_select_unit_prefers_approaching_unit_on_tie() {
        // Arrange
        let (controller, units) = setup_controller(3, 10, Arc::new(FixedDestination(0)));
        units[0].test_set_state(1, ElevatorState::Stationary, Direction::Stop, 0);
        units[1].test_set_state(1, ElevatorState::Moving, Direction::Up, 0);
        units[2].make_emergency_stop();

        // Act
        let selected = controller
            .select_unit(&request(4, 2, Direction::Up))
            .unwrap()
            .unwrap();

        // Assert
        assert_eq!(selected.id(), units[1].id());
    }

    #[test]
    fn test_select_unit_takes_unit_coming_down() {
        // Arrange
        let (controller, units) = setup_controller(3, 10, Arc::new(FixedDestination(0)));
        units[0].make_emergency_stop();
        units[1].test_set_state(6, ElevatorState::Moving, Direction::Down, 2);
        units[2].test_set_state(2, ElevatorState::Moving, Direction::Down, 2);

        // Act
        let selected = controller
            .select_unit(&request(3, 1, Direction::Down))
            .unwrap()
            .unwrap();

        // Assert
        assert_eq!(selected.id(), units[1].id());
    }

    #[test]
    fn test_select_unit_skips_units_moving_away_or_busy() {
        // Arrange
        let (controller, units) = setup_controller(3, 10, Arc::new(FixedDestination(0)));
        units[0].test_set_state(5, ElevatorState::Moving, Direction::Up, 0);
        units[1].test_set_state(6, ElevatorState::Moving, Direction::Down, 0);
        units[2].test_set_state(4, ElevatorState::Loading, Direction::Stop, 3);

        // Act
        let selected = controller.select_unit(&request(4, 2, Direction::Up)).unwrap();

        // Assert
        assert!(selected.is_none());
    }

    #[test]
    fn test_select_unit_respects_capacity() {
        // Arrange
        let (controller, units) = setup_controller(3, 10, Arc::new(FixedDestination(0)));
        units[0].test_set_state(-2, ElevatorState::Stationary, Direction::Stop, 9);
        units[1].test_set_state(-1, ElevatorState::Stationary, Direction::Stop, 10);
        units[2].test_set_state(3, ElevatorState::Stationary, Direction::Stop, 0);

        // Act
        let selected = controller
            .select_unit(&request(0, 2, Direction::Up))
            .unwrap()
            .unwrap();

        // Assert
        assert_eq!(selected.id(), units[2].id());
    }

    #[tokio::test]
    async fn test_request_dispatches_closest_elevator() {
        // Arrange
        let (controller, units) = setup_controller(3, 10, Arc::new(FixedDestination(7)));

        // Act
        let first = controller.request_elevator(request(-2, 10, Direction::Up)).await;
        let second = controller.request_elevator(request(7, 10, Direction::Up)).await;

        // Assert
        assert_eq!(first, Ok(DispatchOutcome::Delivered));
        assert_eq!(second, Ok(DispatchOutcome::Delivered));
        assert_eq!(units.iter().filter(|unit| unit.current_floor() == 7).count(), 2);
        assert!(units
            .iter()
            .all(|unit| unit.state() == ElevatorState::Stationary && unit.current_occupants() == 0));
    }

    #[tokio::test]
    async fn test_enqueue_splits_oversized_request() {
        // Arrange
        let (controller, _units) = setup_controller(3, 10, Arc::new(FixedDestination(7)));
        let recorder = Arc::new(RecordingObserver::default());
        controller.subscribe(recorder.clone());

        // Act
        let accepted = controller.enqueue_request(7, 100, Direction::Up).await;

        // Assert
        let pending = controller.pending_requests();
        assert_eq!(accepted, Ok(true));
        assert_eq!(pending.len(), 10);
        assert!(pending
            .iter()
            .all(|part| part.people() == 10 && part.floor() == 7 && part.direction() == Direction::Up));
        assert_eq!(recorder.requests_received(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_keeps_remainder() {
        // Arrange
        let (controller, _units) = setup_controller(2, 10, Arc::new(FixedDestination(0)));

        // Act
        controller.enqueue_request(-1, 25, Direction::Up).await.unwrap();

        // Assert
        let people: Vec<u32> = controller
            .pending_requests()
            .iter()
            .map(|part| part.people())
            .collect();
        assert_eq!(people, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn test_enqueue_without_elevators_fails() {
        // Arrange
        let controller = new_controller(Arc::new(FixedDestination(0)));
        controller.initialize(Vec::new(), FloorRegistry::from_ground(3, 10));

        // Act
        let accepted = controller.enqueue_request(2, 3, Direction::Up).await;

        // Assert
        assert_eq!(accepted, Err(DispatchError::EmptyFleet));
        assert!(controller.pending_requests().is_empty());
    }

    #[tokio::test]
    async fn test_request_above_capacity_sends_every_elevator() {
        // Arrange
        let (controller, units) = setup_controller(3, 10, Arc::new(FixedDestination(7)));
        let recorder = Arc::new(RecordingObserver::default());
        controller.subscribe(recorder.clone());

        // Act
        let outcome = controller.request_elevator(request(7, 100, Direction::Up)).await;

        // Assert
        assert_eq!(outcome, Ok(DispatchOutcome::Queued));
        assert!(controller.pending_requests().is_empty());
        assert!(units.iter().all(|unit| unit.current_floor() == 7));
        assert_eq!(recorder.requests_received(), 1);
        assert_eq!(recorder.arrivals(), 10);
    }

    #[tokio::test]
    async fn test_request_to_unserved_floor_fails() {
        // Arrange
        let (controller, units) = setup_controller(3, 10, Arc::new(FixedDestination(0)));
        let before = controller.fleet_status();

        // Act
        let outcome = controller.request_elevator(request(10, 2, Direction::Up)).await;

        // Assert
        assert_eq!(outcome, Err(DispatchError::InvalidFloor { floor: 10 }));
        assert_eq!(controller.fleet_status(), before);
        assert!(units.iter().all(|unit| !unit.is_leased()));
    }

    #[tokio::test]
    async fn test_request_with_unserved_destination_unloads_at_pickup() {
        // Arrange
        let (controller, units) = setup_controller(1, 10, Arc::new(FixedDestination(42)));

        // Act
        let outcome = controller.request_elevator(request(-2, 3, Direction::Up)).await;

        // Assert
        let status = units[0].status();
        assert_eq!(outcome, Err(DispatchError::InvalidFloor { floor: 42 }));
        assert_eq!(status.current_floor, -2);
        assert_eq!(status.state, ElevatorState::Stationary);
        assert_eq!(status.current_occupants, 0);
        assert!(!units[0].is_leased());
    }

    #[tokio::test]
    async fn test_process_pending_on_empty_queue() {
        let (controller, _units) = setup_controller(1, 10, Arc::new(FixedDestination(0)));

        assert_eq!(controller.process_pending_requests().await, Ok(true));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_requests_leave_ground_unit_for_next_request() {
        // Arrange
        let (gate_tx, gate_rx) = unbounded::<i32>();
        let (controller, units) = setup_controller(3, 10, gated_input(gate_rx));
        let basement = request(-2, 10, Direction::Up);

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.request_elevator(basement).await }
        });
        let second = tokio::spawn({
            let controller = controller.clone();
            async move { controller.request_elevator(basement).await }
        });

        wait_until(|| {
            units
                .iter()
                .filter(|unit| {
                    unit.current_floor() == -2 && unit.state() == ElevatorState::Loading
                })
                .count()
                == 2
        })
        .await;
        let stationed = units
            .iter()
            .find(|unit| unit.current_floor() == 0)
            .cloned()
            .expect("one elevator should still be at the ground floor");

        // Act
        let outcome = controller.request_elevator(request(7, 10, Direction::Up)).await;

        // Assert
        assert_eq!(outcome, Ok(DispatchOutcome::Delivered));
        assert_eq!(stationed.current_floor(), 7);
        assert_eq!(stationed.state(), ElevatorState::Stationary);

        // Cleanup
        gate_tx.send(0).unwrap();
        gate_tx.send(0).unwrap();
        assert_eq!(first.await.unwrap(), Ok(DispatchOutcome::Delivered));
        assert_eq!(second.await.unwrap(), Ok(DispatchOutcome::Delivered));
        assert_eq!(units.iter().filter(|unit| unit.current_floor() == 0).count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_drain_requeues_until_unit_frees() {
        // Arrange
        let (gate_tx, gate_rx) = unbounded::<i32>();
        let (controller, units) = setup_controller(1, 10, gated_input(gate_rx));
        let recorder = Arc::new(RecordingObserver::default());
        controller.subscribe(recorder.clone());

        let busy = tokio::spawn({
            let controller = controller.clone();
            async move { controller.request_elevator(request(-2, 4, Direction::Up)).await }
        });
        wait_until(|| units[0].state() == ElevatorState::Loading).await;
        controller.enqueue_request(3, 2, Direction::Up).await.unwrap();

        // Act
        let drain = tokio::spawn({
            let controller = controller.clone();
            async move { controller.process_pending_requests().await }
        });
        wait_until(|| recorder.requests_received() >= 2).await;
        gate_tx.send(0).unwrap();

        // Assert
        assert_eq!(busy.await.unwrap(), Ok(DispatchOutcome::Delivered));
        assert_eq!(drain.await.unwrap(), Ok(true));
        assert!(controller.pending_requests().is_empty());
        assert_eq!(units[0].current_floor(), 3);
    }

    #[tokio::test]
    async fn test_emergency_stop_idle_unit() {
        // Arrange
        let (controller, units) = setup_controller(2, 10, Arc::new(FixedDestination(0)));

        // Act
        let stopped = controller.emergency_stop(units[0].id());
        let unknown = controller.emergency_stop(Uuid::new_v4());
        let selected = controller
            .select_unit(&request(3, 1, Direction::Up))
            .unwrap()
            .unwrap();

        // Assert
        assert!(stopped);
        assert!(!unknown);
        assert_eq!(units[0].state(), ElevatorState::OutOfOrder);
        assert_eq!(selected.id(), units[1].id());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_emergency_stop_cancels_dispatch_in_flight() {
        // Arrange
        let (gate_tx, gate_rx) = unbounded::<i32>();
        let (controller, units) = setup_controller(1, 10, gated_input(gate_rx));
        let handle = tokio::spawn({
            let controller = controller.clone();
            async move { controller.request_elevator(request(-2, 4, Direction::Up)).await }
        });
        wait_until(|| {
            units[0].current_floor() == -2 && units[0].state() == ElevatorState::Loading
        })
        .await;

        // Act
        assert!(controller.emergency_stop(units[0].id()));
        gate_tx.send(7).unwrap();

        // Assert
        assert_eq!(handle.await.unwrap(), Ok(DispatchOutcome::Cancelled));
        assert_eq!(units[0].state(), ElevatorState::OutOfOrder);
        assert_eq!(units[0].current_floor(), -2);
        assert!(!units[0].is_leased());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_emergency_stop_while_loading_for_same_floor() {
        // Arrange
        let (gate_tx, gate_rx) = unbounded::<i32>();
        let (controller, units) = setup_controller(1, 10, gated_input(gate_rx));
        units[0].test_set_state(-2, ElevatorState::Stationary, Direction::Stop, 0);
        let handle = tokio::spawn({
            let controller = controller.clone();
            async move { controller.request_elevator(request(-2, 4, Direction::Up)).await }
        });
        wait_until(|| units[0].state() == ElevatorState::Loading).await;

        // Act
        assert!(controller.emergency_stop(units[0].id()));
        gate_tx.send(-2).unwrap();

        // Assert
        assert_eq!(handle.await.unwrap(), Ok(DispatchOutcome::Cancelled));
        assert_eq!(units[0].state(), ElevatorState::OutOfOrder);
        assert_eq!(units[0].current_floor(), -2);
        assert!(controller
            .select_unit(&request(0, 1, Direction::Up))
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_observer_failures_do_not_abort_dispatch() {
        // Arrange
        let (controller, _units) = setup_controller(1, 10, Arc::new(FixedDestination(5)));
        let recorder = Arc::new(RecordingObserver::default());
        controller.subscribe(Arc::new(FailingObserver));
        controller.subscribe(Arc::new(PanickingObserver));
        controller.subscribe(recorder.clone());

        // Act
        let outcome = controller.request_elevator(request(2, 3, Direction::Up)).await;

        // Assert
        assert_eq!(outcome, Ok(DispatchOutcome::Delivered));
        assert_eq!(recorder.arrivals(), 1);
    }

    #[tokio::test]
    async fn test_observer_channel_receives_arrival() {
        // Arrange
        let (controller, units) = setup_controller(1, 10, Arc::new(FixedDestination(5)));
        let (event_tx, event_rx) = unbounded::<DispatchEvent>();
        controller.subscribe(Arc::new(ChannelObserver::new(event_tx)));

        // Act
        controller
            .request_elevator(request(2, 3, Direction::Up))
            .await
            .unwrap();

        // Assert
        let events: Vec<DispatchEvent> = event_rx.try_iter().collect();
        assert_eq!(
            events,
            vec![DispatchEvent::ElevatorArrived {
                elevator: units[0].id(),
                floor: 5,
                direction: Direction::Up,
            }]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_poller_drains_queue() {
        // Arrange
        let (controller, units) = setup_controller(2, 10, Arc::new(FixedDestination(4)));
        controller.enqueue_request(1, 15, Direction::Up).await.unwrap();
        assert_eq!(controller.pending_requests().len(), 2);
        let shutdown = CancellationToken::new();

        // Act
        let poller = tokio::spawn(run_pending_poller(
            controller.clone(),
            Duration::from_millis(10),
            shutdown.clone(),
        ));
        wait_until(|| {
            controller.pending_requests().is_empty()
                && units.iter().all(|unit| {
                    unit.current_floor() == 4 && unit.state() == ElevatorState::Stationary
                })
        })
        .await;
        shutdown.cancel();

        // Assert
        poller.await.unwrap();
        assert!(units.iter().all(|unit| !unit.is_leased()));
    }
}
