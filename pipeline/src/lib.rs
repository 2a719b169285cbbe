mod controller;
pub mod notice;
mod stage;

pub use controller::*;
pub use notice::*;
