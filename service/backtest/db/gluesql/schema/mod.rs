pub mod equity;
pub mod exchange;
pub mod future;
pub mod mapping;
pub mod root_symbol;
pub mod router;
pub mod version;

pub use equity::*;
pub use exchange::*;
pub use future::*;
pub use mapping::*;
pub use root_symbol::*;
pub use router::*;
pub use version::*;
