pub mod delivery;
pub mod dispatcher;
pub mod lifecycle;
pub mod registry;
