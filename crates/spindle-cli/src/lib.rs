//! Document host and driver for the Spindle runtime.

pub mod host;
pub mod run;
pub mod trace;
