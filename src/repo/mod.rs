pub mod client;
pub mod deal;
pub mod history;
pub mod profile;
pub mod rate;

pub use client::*;
pub use deal::*;
pub use history::*;
pub use profile::*;
pub use rate::*;
