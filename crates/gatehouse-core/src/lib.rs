pub mod artifacts;
pub mod classifier;
pub mod error;
pub mod escalation;
pub mod gate;
pub mod io;
pub mod paths;
pub mod policy;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod run;
pub mod supervisor;
pub mod task;
pub mod task_diff;
pub mod task_list;
pub mod types;

pub use error::{GatehouseError, Result};
