pub mod diff;
pub mod migrate;
