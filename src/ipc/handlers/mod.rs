pub mod core;
pub mod export;
pub mod roster;
pub mod rooms;
