mod date;
mod time;

pub use date::*;
pub use time::*;
