//! Orders, their phase buckets, and the operations that move them.

mod board;
mod phase_store;
mod types;

pub use board::{OrderBoard, ServerStatus, Transition, TransitionKind};
pub use phase_store::PhaseStore;
pub use types::{NewOrder, Order, OrderPhase, ReturnSource, UnknownPhase};
