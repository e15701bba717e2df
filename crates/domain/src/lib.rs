#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod athlete;
mod distinct;
mod error;
mod listing;
mod name;
mod owner;
mod program;
mod program_day;
mod selection;
mod service;
mod subscription;
mod workout;

pub use athlete::*;
pub use distinct::*;
pub use error::*;
pub use listing::*;
pub use name::*;
pub use owner::*;
pub use program::*;
pub use program_day::*;
pub use selection::*;
pub use service::*;
pub use subscription::*;
pub use workout::*;
