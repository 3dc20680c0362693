//! Minimal state machine built from object nodes.
//!
//! States are either active or inactive. Transitions are edges wired to a
//! named signal on the source state, optionally gated by a guard.

pub mod machine;
pub mod node;
pub mod transition;

pub use machine::{StateMachine, Started, Stopped};
pub use node::{Entered, Exited, State};
pub use transition::{Guard, Transition, TransitionFired, Triggered};
