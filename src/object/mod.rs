//! Object ownership tree with a per-object signal/slot bus and event filters.

pub mod event;
pub mod node;
pub mod query;
pub mod signal;
pub mod tree;

pub use event::{Event, EventHandler, EventKind};
pub use node::{ObjectData, ObjectId};
pub use signal::{Connection, ConnectionId, Destroyed, Listener, ObjectNameChanged, Signal};
pub use tree::ObjectTree;
