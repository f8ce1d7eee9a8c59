#[doc(hidden)]
pub mod model {
    pub use crate::*;
}

mod asset;
pub mod core;
mod error;
mod ownership;

pub use asset::*;
pub use crate::core::*;
pub use error::*;
pub use ownership::*;
