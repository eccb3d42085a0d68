pub mod errors;
pub mod models;
pub mod ranking;

pub use errors::*;
pub use models::*;
pub use ranking::*;
