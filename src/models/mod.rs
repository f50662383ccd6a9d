pub mod actor;
pub mod location;
pub mod order;
pub mod rider;
