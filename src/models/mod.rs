pub mod anchor;
pub mod coordinate;
pub mod diagnostics;
pub mod events;
pub mod health;
pub mod messages;
pub mod result_code;

pub use anchor::{is_valid, try_colocalize, NetworkAnchor};
pub use coordinate::*;
pub use diagnostics::*;
pub use events::*;
pub use health::*;
pub use messages::*;
pub use result_code::*;
