//! Reactive properties: typed value cells with change notification,
//! validation, bindings, and a dynamic name-keyed property bag per object.

pub mod binding;
pub mod reactive;
pub(crate) mod store;

pub use binding::{BindingSource, PollId, Unbind};
pub use reactive::{
    Property, PropertyChange, PropertyChanged, PropertyError, PropertyOptions, ValueChanged,
};
