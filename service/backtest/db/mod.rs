/// gluesql backed asset store
pub mod gluesql;
mod writer;

pub use writer::*;
