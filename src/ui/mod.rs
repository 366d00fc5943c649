pub mod shared;

pub use shared::{is_equal, ListenerId, SharedState, StateListener};
