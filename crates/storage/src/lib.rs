#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod schema;
pub mod sqlite;

pub use sqlite::Sqlite;
