// Core data models for BAO Flow
// These structs represent the domain entities

pub mod stage;
pub mod deal;
pub mod history;
pub mod profile;
pub mod rate;

pub use stage::*;
pub use deal::*;
pub use history::*;
pub use profile::*;
pub use rate::*;
