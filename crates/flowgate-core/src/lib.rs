pub mod binding;
pub mod drift;
pub mod error;
pub mod gate;
pub mod git;
pub mod hook;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod proc;
pub mod reconcile;
pub mod types;
pub mod workitem;

pub use error::{FlowgateError, Result};
