mod executor;
mod job_manager;
mod process;

pub use executor::{Executor, UnitStatus};
