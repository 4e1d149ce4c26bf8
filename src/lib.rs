//! Milestone verification for student-deployed Rajdhani apps.
//!
//! A [`tasks::TaskCatalog`] lists the milestones in order. A
//! [`verify::VerificationRun`] walks it against one deployed [`site::Site`],
//! stopping at the first task whose checks do not all pass.

pub mod checks;
pub mod commands;
pub mod config;
pub mod deploy;
pub mod mail;
pub mod progress;
pub mod site;
pub mod tasks;
pub mod validation;
pub mod verify;
