#![cfg_attr(feature = "precommit-checks", deny(warnings, clippy::pedantic, clippy::dbg_macro))]
#![cfg_attr(not(feature = "precommit-checks"), allow(dead_code, unused_variables, unused_imports))]

pub mod sim;
pub mod try_log;
pub use try_log::WorldExt as WorldTryLog;
