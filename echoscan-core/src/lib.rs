pub mod config;
pub mod error;
pub mod error_utils;
pub mod registry;
pub mod store;
pub mod types;
pub mod view;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use registry::*;
pub use store::*;
pub use types::*;
pub use view::*;
