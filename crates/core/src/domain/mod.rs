pub mod prices;
pub mod report;
pub mod target;
