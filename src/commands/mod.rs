pub mod common;
pub mod create;
pub mod deploy;
pub mod status;
pub mod tasks;
pub mod verify;
