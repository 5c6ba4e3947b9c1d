/***************************************/
/*        3rd party libraries          */
/***************************************/
use async_trait::async_trait;
use std::time::Duration;

use crate::config::ElevatorConfig;

/***************************************/
/*       Public data structures        */
/***************************************/
/// Source of simulated time. Every door operation and floor step suspends through this.
#[async_trait]
pub trait Delayer: Send + Sync {
    async fn delay(&self, duration: Duration);
}

/// Real delays on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelayer;

#[async_trait]
impl Delayer for TokioDelayer {
    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Yields to the scheduler instead of sleeping, so other dispatches still interleave.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstantDelayer;

#[async_trait]
impl Delayer for InstantDelayer {
    async fn delay(&self, _duration: Duration) {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTiming {
    pub floor_travel: Duration,
    pub door_transition: Duration,
    pub door_settle: Duration,
}

impl Default for UnitTiming {
    fn default() -> Self {
        UnitTiming {
            floor_travel: Duration::from_millis(500),
            door_transition: Duration::from_millis(2000),
            door_settle: Duration::from_millis(1000),
        }
    }
}

impl From<&ElevatorConfig> for UnitTiming {
    fn from(config: &ElevatorConfig) -> Self {
        UnitTiming {
            floor_travel: config.floor_travel(),
            door_transition: config.door_transition(),
            door_settle: config.door_settle(),
        }
    }
}
