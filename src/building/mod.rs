pub mod building;
pub mod floors;

pub use building::Building;
pub use floors::Floor;
pub use floors::FloorRegistry;
