pub mod checks;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod logging;
pub mod paths;
pub mod request;
pub mod scenarios;

pub use checks::Checks;
pub use config::ConformanceConfig;
pub use error::{HarnessError, Result};
pub use request::{Harness, Request, Response};
