pub mod batch;
pub mod gluesql;
pub mod log;
