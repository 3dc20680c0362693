//! Geometry solvers: a stretch-based box layout and a uniform grid layout.
//!
//! A layout is attached to a container through [`Layout::set_parent_widget`].
//! On [`Layout::activate`] it reads the container's size, subtracts its
//! margins, solves, and pushes a geometry onto every child. Geometries are
//! relative to the container's own origin.
//!
//! Invalidation only marks the layout dirty; any number of invalidations
//! before the next `activate` (or geometry read) cost one solve. A layout
//! also re-solves on its own when the container size or a child's size
//! constraints changed since the last solve.

use std::rc::Rc;

use crate::geometry::{Region, Spacing};

pub mod boxed;
pub mod grid;
pub mod item;

pub use boxed::{solve_box, BoxItem, BoxLayout, Direction};
pub use grid::{solve_grid, GridCell, GridLayout};
pub use item::{Alignment, Frame, LayoutItem, LayoutWidget, Spacer};

/// Operations shared by every layout.
pub trait Layout {
    /// Attach the container whose geometry the layout fills.
    fn set_parent_widget(&mut self, parent: Rc<dyn LayoutWidget>);

    fn parent_widget(&self) -> Option<Rc<dyn LayoutWidget>>;

    /// Gap between neighbouring items. Negative values are treated as 0.
    fn set_spacing(&mut self, spacing: i32);

    fn spacing(&self) -> i32;

    /// Same margin on all four sides.
    fn set_margin(&mut self, margin: i32) {
        self.set_contents_margins(Spacing::all(margin));
    }

    /// Per-side margins. Negative sides are treated as 0.
    fn set_contents_margins(&mut self, margins: Spacing);

    fn contents_margins(&self) -> Spacing;

    /// Mark the layout for recomputation on the next activation.
    fn invalidate(&mut self);

    /// Whether the layout was invalidated since its last solve.
    fn is_dirty(&self) -> bool;

    /// Solve and apply geometries if anything changed. Returns `true` if a
    /// solve ran.
    fn activate(&mut self) -> bool;

    /// Remove `widget`. Absent widgets are ignored and return `false`.
    fn remove_widget(&mut self, widget: &dyn LayoutWidget) -> bool;

    /// Number of items, spacers included.
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// How many solves have run since the layout was created.
    fn solve_count(&self) -> u64;

    /// The container rectangle minus margins, relative to the container.
    fn contents_rect(&self) -> Option<Region> {
        let parent = self.parent_widget()?;
        Some(parent.geometry().size().to_region().shrink(self.contents_margins()))
    }
}

/// Bookkeeping shared by both layouts.
///
/// `I` is the snapshot of solver inputs; a solve is skipped when the layout
/// is clean and the inputs are unchanged.
pub(crate) struct LayoutState<I> {
    pub(crate) parent: Option<Rc<dyn LayoutWidget>>,
    pub(crate) spacing: i32,
    pub(crate) margins: Spacing,
    pub(crate) dirty: bool,
    pub(crate) solves: u64,
    last_inputs: Option<I>,
}

impl<I: PartialEq> LayoutState<I> {
    pub(crate) fn new() -> Self {
        Self {
            parent: None,
            spacing: 0,
            margins: Spacing::ZERO,
            dirty: true,
            solves: 0,
            last_inputs: None,
        }
    }

    pub(crate) fn contents_rect(&self) -> Option<Region> {
        let parent = self.parent.as_ref()?;
        Some(parent.geometry().size().to_region().shrink(self.margins))
    }

    pub(crate) fn needs_solve(&self, inputs: &I) -> bool {
        self.dirty || self.last_inputs.as_ref() != Some(inputs)
    }

    pub(crate) fn solved(&mut self, inputs: I) {
        self.dirty = false;
        self.solves += 1;
        self.last_inputs = Some(inputs);
    }
}
