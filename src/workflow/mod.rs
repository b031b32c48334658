// Deal stage workflow: the write path and the selection control model

pub mod applier;
pub mod changer;

pub use applier::*;
pub use changer::*;
