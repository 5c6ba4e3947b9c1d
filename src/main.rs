/* 3rd party libraries */
use anyhow::{anyhow, bail, Context};
use clap::Parser;
use crossbeam_channel as cbc;
use log::{error, info};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::Builder;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/* Custom libraries */
use elevator_dispatch::building::Building;
use elevator_dispatch::config::load_config;
use elevator_dispatch::coordinator::{
    run_pending_poller, ChannelObserver, DestinationInput, DispatchController, LogObserver,
};
use elevator_dispatch::elevator::{Delayer, InstantDelayer, TokioDelayer, UnitTiming};
use elevator_dispatch::shared::{Direction, DispatchError, DispatchEvent, Request};
use elevator_dispatch::unwrap_or_exit;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Console front end for the elevator dispatch core")]
struct Args {
    /// Path to the configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides building.elevator_count
    #[clap(short, long)]
    elevators: Option<usize>,

    /// Overrides elevator.default_capacity
    #[clap(long)]
    capacity: Option<i32>,

    /// Skip the simulated door and travel delays
    #[clap(long)]
    instant: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Call {
        floor: i32,
        people: u32,
        direction: Option<Direction>,
    },
    Status,
    Pending,
    Stop(Uuid),
    Destination(i32),
    Quit,
}

/// Waits for a `dest <floor>` answer forwarded by the command loop.
struct ConsoleInput {
    destinations: cbc::Receiver<i32>,
}

impl DestinationInput for ConsoleInput {
    fn destination_floor(
        &self,
        elevator: Uuid,
        request: &Request,
    ) -> Result<i32, DispatchError> {
        println!(
            "Elevator {} loaded {} people on floor {}. Enter dest <floor>:",
            elevator,
            request.people(),
            request.floor()
        );
        self.destinations
            .recv()
            .map_err(|e| DispatchError::Input(e.to_string()))
    }
}

fn parse_command(line: &str) -> anyhow::Result<Command> {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        ["status"] => Ok(Command::Status),
        ["pending"] => Ok(Command::Pending),
        ["quit"] | ["exit"] => Ok(Command::Quit),
        ["dest", floor] => Ok(Command::Destination(
            floor
                .parse::<i32>()
                .with_context(|| format!("'{}' is not a floor", floor))?,
        )),
        ["stop", id] => Ok(Command::Stop(
            Uuid::parse_str(id).with_context(|| format!("'{}' is not an elevator id", id))?,
        )),
        [floor, people, rest @ ..] if rest.len() <= 1 => {
            let floor = floor
                .parse::<i32>()
                .with_context(|| format!("'{}' is not a floor", floor))?;
            let people = people
                .parse::<u32>()
                .with_context(|| format!("'{}' is not a number of people", people))?;
            let direction = match rest.first() {
                None => None,
                Some(&"up") => Some(Direction::Up),
                Some(&"down") => Some(Direction::Down),
                Some(other) => bail!("'{}' is not a direction, use up or down", other),
            };
            Ok(Command::Call {
                floor,
                people,
                direction,
            })
        }
        _ => Err(anyhow!(
            "usage: <floor> <people> [up|down] | dest <floor> | status | pending | stop <id> | quit"
        )),
    }
}

async fn call_elevator(
    controller: &DispatchController,
    floor: i32,
    people: u32,
    direction: Option<Direction>,
) -> anyhow::Result<()> {
    let available = controller.available_directions(floor)?;
    let direction = match direction {
        Some(direction) if available.contains(direction) => direction,
        Some(direction) => bail!("cannot go {} from floor {}", direction, floor),
        None => available
            .single()
            .ok_or_else(|| anyhow!("floor {} allows up and down, add a direction", floor))?,
    };

    let outcome = controller
        .request_elevator(Request::new(floor, people, direction)?)
        .await?;
    info!("Request for floor {} finished: {:?}", floor, outcome);
    Ok(())
}

/* Main */
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Load the configuration
    let mut config = unwrap_or_exit!(load_config(&args.config));
    if let Some(elevators) = args.elevators {
        config.building.elevator_count = elevators;
    }
    if let Some(capacity) = args.capacity {
        config.elevator.default_capacity = capacity;
    }
    unwrap_or_exit!(config.validate());

    // Build the fleet
    let building = unwrap_or_exit!(Building::from_config(&config));
    let delayer: Arc<dyn Delayer> = if args.instant {
        Arc::new(InstantDelayer)
    } else {
        Arc::new(TokioDelayer)
    };
    let (units, floors) = building.into_units(delayer.clone(), UnitTiming::from(&config.elevator));

    // Every console line goes to the command loop, which forwards destinations
    let (line_tx, line_rx) = cbc::unbounded::<String>();
    let (destination_tx, destination_rx) = cbc::unbounded::<i32>();
    let stdin_thread = Builder::new().name("stdin_reader".into());
    unwrap_or_exit!(stdin_thread.spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }
    }));

    let controller = Arc::new(DispatchController::new(
        &config.dispatch,
        Arc::new(ConsoleInput {
            destinations: destination_rx,
        }),
        delayer,
    ));
    controller.initialize(units, floors);
    controller.subscribe(Arc::new(LogObserver));

    // Print notifications from a plain thread
    let (event_tx, event_rx) = cbc::unbounded::<DispatchEvent>();
    controller.subscribe(Arc::new(ChannelObserver::new(event_tx)));
    let notification_thread = Builder::new().name("notifications".into());
    unwrap_or_exit!(notification_thread.spawn(move || {
        for event in event_rx.iter() {
            println!("Notification: {}", event);
        }
    }));

    let shutdown = CancellationToken::new();
    let poller = tokio::spawn(run_pending_poller(
        controller.clone(),
        config.dispatch.polling_interval(),
        shutdown.clone(),
    ));

    println!("Enter <floor> <people> [up|down], dest <floor>, status, pending, stop <id> or quit");
    loop {
        let lines = line_rx.clone();
        let line = match tokio::task::spawn_blocking(move || lines.recv()).await {
            Ok(Ok(line)) => line,
            _ => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Ok(Command::Call {
                floor,
                people,
                direction,
            }) => {
                let controller = controller.clone();
                tokio::spawn(async move {
                    if let Err(e) = call_elevator(&controller, floor, people, direction).await {
                        error!("{:#}", e);
                    }
                });
            }
            Ok(Command::Destination(floor)) => {
                if destination_tx.send(floor).is_err() {
                    error!("Destination prompt is closed");
                }
            }
            Ok(Command::Status) => match serde_json::to_string_pretty(&controller.fleet_status()) {
                Ok(json) => println!("{}", json),
                Err(e) => error!("Failed to serialize fleet status: {}", e),
            },
            Ok(Command::Pending) => {
                for request in controller.pending_requests() {
                    println!(
                        "{} people on floor {} going {}",
                        request.people(),
                        request.floor(),
                        request.direction()
                    );
                }
            }
            Ok(Command::Stop(id)) => {
                if !controller.emergency_stop(id) {
                    error!("No elevator with id {}", id);
                }
            }
            Ok(Command::Quit) => break,
            Err(e) => error!("{:#}", e),
        }
    }

    shutdown.cancel();
    if let Err(e) = poller.await {
        error!("Poller task failed: {}", e);
    }
    info!("Shutting down");
}

/***************************************/
/*             Unit tests              */
/***************************************/
