//! # trellis-ui
//!
//! The object backbone of a retained-mode UI toolkit: an ownership tree with a
//! synchronous signal/slot bus, reactive properties, a small state machine and
//! two geometry solvers.
//!
//! Widgets are not part of this crate. They compose an object node for
//! lifetime and signals, attach [`property::Property`] cells for observable
//! attributes, and implement [`layout::LayoutWidget`] so a layout can size
//! them.
//!
//! ## Core Systems
//!
//! - **[`object`]**: slotmap-backed ownership tree, typed signals, event filters
//! - **[`property`]**: change-tracked values, validation, bindings, dynamic bag
//! - **[`state`]**: states, signal-triggered transitions, state machine
//! - **[`layout`]**: stretch-based box layout and uniform grid layout
//! - **[`runtime`]**: tokio event loop for deferred deletion and binding polls
//! - **[`geometry`]**: Offset, Size, Region, Spacing primitives
//!
//! ## Example
//!
//! ```
//! use trellis_ui::object::{ObjectData, ObjectTree};
//! use trellis_ui::property::{Property, PropertyOptions};
//!
//! let mut tree = ObjectTree::new();
//! let window = tree.create(ObjectData::new("Window").with_name("main"));
//! let title = Property::new(&mut tree, window, "title", PropertyOptions::new(String::new()));
//!
//! tree.connect_named::<trellis_ui::property::ValueChanged<String>>(
//!     window,
//!     "titleChanged",
//!     |_, change| println!("title is now {}", change.value),
//! );
//! title.set(&mut tree, "Hello".to_string()).unwrap();
//! assert_eq!(tree.property::<String>(window, "title").as_deref(), Some("Hello"));
//! ```

// Foundation
pub mod geometry;

// Object model
pub mod object;
pub mod property;
pub mod state;

// Geometry solvers
pub mod layout;

// Scheduling
pub mod runtime;

pub use object::{ObjectData, ObjectId, ObjectTree};
pub use runtime::{EventLoop, RuntimeConfig};
