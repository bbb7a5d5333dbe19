//! Shell command construction and execution

pub mod executor;
pub mod fake;
pub mod line;
pub mod result;

pub use executor::{Executor, ExecutorOptions, ProcessExecutor};
pub use line::{Arg, CommandLine, Step};
pub use result::{CombinedLog, CommandResult, Phase, PASSWORD_PLACEHOLDER, TOKEN_PLACEHOLDER};
