#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod time;

pub use config::ReceiverConfig;
pub use error::Error;
pub use error::Result;
pub use time::wall_clock_ns;
