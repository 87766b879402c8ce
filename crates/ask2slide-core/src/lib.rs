pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Ask2SlideConfig;
pub use error::{Ask2SlideError, Result};
pub use types::*;
