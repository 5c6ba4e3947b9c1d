pub mod coordinator;
pub mod coordinator_tests;
pub mod input;
pub mod notify;
pub mod poller;

pub use coordinator::DispatchController;
pub use input::{DestinationInput, FixedDestination};
pub use notify::{ChannelObserver, DispatchObserver, LogObserver, Notifier};
pub use poller::run_pending_poller;
