//! Agent lifecycle

pub mod run;
