#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod browse;
pub mod cli;
pub mod log;
pub mod settings;
