pub mod logging;
pub mod radio;
pub mod system;
pub mod types;

pub use logging::*;
pub use radio::*;
pub use system::*;
pub use types::*;
