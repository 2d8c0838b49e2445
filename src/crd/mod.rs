mod sqlite_database;

pub use sqlite_database::*;
