//! External processes: the acquisition tool and the Python prediction modules.

pub mod acquisition;
pub mod python;
pub mod runner;
pub mod template;

pub use acquisition::{AcquisitionMode, AcquisitionRequest, PreflightError, prepare_acquisition};
pub use runner::{ProcessCancelled, ProcessOutcome, ProcessSpec, run_process};
