//! Grid layout: a sparse `(row, column)` placement map over uniform cells.
//!
//! The row and column counts are the smallest that fit every placed item
//! including its span. Each cell is `content / count` pixels (rounded down)
//! on each axis. An item covering `n` cells gets `n` cells worth of size
//! minus one `spacing`, which leaves the gutter on its trailing edge. Cells
//! without an item stay empty.

use std::rc::Rc;

use crate::geometry::{Region, Spacing};

use super::item::{same_widget, LayoutWidget};
use super::{Layout, LayoutState};

/// Placement of one item: origin cell and span (each at least 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: usize,
    pub column: usize,
    pub row_span: usize,
    pub column_span: usize,
}

impl GridCell {
    pub fn new(row: usize, column: usize) -> Self {
        Self::spanning(row, column, 1, 1)
    }

    /// Spans of 0 are treated as 1.
    pub fn spanning(row: usize, column: usize, row_span: usize, column_span: usize) -> Self {
        Self {
            row,
            column,
            row_span: row_span.max(1),
            column_span: column_span.max(1),
        }
    }

    fn covers(&self, row: usize, column: usize) -> bool {
        let within = |at: usize, origin: usize, span: usize| {
            at.checked_sub(origin).is_some_and(|offset| offset < span)
        };
        within(row, self.row, self.row_span) && within(column, self.column, self.column_span)
    }
}

/// Smallest `(rows, columns)` accommodating every cell.
fn grid_extent(cells: &[GridCell]) -> (usize, usize) {
    cells.iter().fold((0, 0), |(rows, columns), c| {
        (
            rows.max(c.row.saturating_add(c.row_span)),
            columns.max(c.column.saturating_add(c.column_span)),
        )
    })
}

fn to_px(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Compute one rectangle per cell inside `content`.
pub fn solve_grid(content: Region, spacing: i32, cells: &[GridCell]) -> Vec<Region> {
    let (rows, columns) = grid_extent(cells);
    if rows == 0 || columns == 0 {
        return Vec::new();
    }
    let spacing = spacing.max(0);
    let cell_width = content.width.max(0) / to_px(columns);
    let cell_height = content.height.max(0) / to_px(rows);

    cells
        .iter()
        .map(|cell| {
            let width = cell_width.saturating_mul(to_px(cell.column_span)) - spacing;
            let height = cell_height.saturating_mul(to_px(cell.row_span)) - spacing;
            Region::new(
                content.x + cell_width.saturating_mul(to_px(cell.column)),
                content.y + cell_height.saturating_mul(to_px(cell.row)),
                width.max(0),
                height.max(0),
            )
        })
        .collect()
}

struct GridItem {
    widget: Rc<dyn LayoutWidget>,
    cell: GridCell,
}

/// A grid layout bound to a container.
pub struct GridLayout {
    items: Vec<GridItem>,
    state: LayoutState<(Region, Vec<GridCell>)>,
    geometries: Vec<Region>,
}

impl GridLayout {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            state: LayoutState::new(),
            geometries: Vec::new(),
        }
    }

    /// Place `widget` in a single cell.
    pub fn add_widget(&mut self, widget: Rc<dyn LayoutWidget>, row: usize, column: usize) {
        self.place(widget, GridCell::new(row, column));
    }

    /// Place `widget` at `(row, column)` covering `row_span` x `column_span`
    /// cells.
    pub fn add_widget_span(
        &mut self,
        widget: Rc<dyn LayoutWidget>,
        row: usize,
        column: usize,
        row_span: usize,
        column_span: usize,
    ) {
        self.place(widget, GridCell::spanning(row, column, row_span, column_span));
    }

    /// Whatever already sits at the same origin cell is replaced, and a
    /// widget already in the grid moves to its new cell.
    fn place(&mut self, widget: Rc<dyn LayoutWidget>, cell: GridCell) {
        self.items.retain(|item| {
            (item.cell.row, item.cell.column) != (cell.row, cell.column)
                && !same_widget(&item.widget, widget.as_ref())
        });
        self.items.push(GridItem { widget, cell });
        self.invalidate();
    }

    /// The widget covering `(row, column)`, spans included.
    pub fn item_at_position(&self, row: usize, column: usize) -> Option<Rc<dyn LayoutWidget>> {
        self.items
            .iter()
            .rev()
            .find(|item| item.cell.covers(row, column))
            .map(|item| item.widget.clone())
    }

    /// The placement of `widget`, if it is in the grid.
    pub fn cell_of(&self, widget: &dyn LayoutWidget) -> Option<GridCell> {
        self.items
            .iter()
            .find(|item| same_widget(&item.widget, widget))
            .map(|item| item.cell)
    }

    pub fn row_count(&self) -> usize {
        grid_extent(&self.cells()).0
    }

    pub fn column_count(&self) -> usize {
        grid_extent(&self.cells()).1
    }

    /// Geometry of every item in insertion order, solving first if needed.
    pub fn geometries(&mut self) -> &[Region] {
        self.activate();
        &self.geometries
    }

    fn cells(&self) -> Vec<GridCell> {
        self.items.iter().map(|item| item.cell).collect()
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl Layout for GridLayout {
    fn set_parent_widget(&mut self, parent: Rc<dyn LayoutWidget>) {
        self.state.parent = Some(parent);
        self.invalidate();
    }

    fn parent_widget(&self) -> Option<Rc<dyn LayoutWidget>> {
        self.state.parent.clone()
    }

    fn set_spacing(&mut self, spacing: i32) {
        let spacing = spacing.max(0);
        if self.state.spacing != spacing {
            self.state.spacing = spacing;
            self.invalidate();
        }
    }

    fn spacing(&self) -> i32 {
        self.state.spacing
    }

    fn set_contents_margins(&mut self, margins: Spacing) {
        let margins = margins.non_negative();
        if self.state.margins != margins {
            self.state.margins = margins;
            self.invalidate();
        }
    }

    fn contents_margins(&self) -> Spacing {
        self.state.margins
    }

    fn invalidate(&mut self) {
        self.state.dirty = true;
    }

    fn is_dirty(&self) -> bool {
        self.state.dirty
    }

    fn activate(&mut self) -> bool {
        let Some(content) = self.state.contents_rect() else {
            return false;
        };
        let inputs = (content, self.cells());
        if !self.state.needs_solve(&inputs) {
            return false;
        }
        let regions = solve_grid(content, self.state.spacing, &inputs.1);
        for (item, region) in self.items.iter().zip(&regions) {
            item.widget.set_geometry(*region);
        }
        self.geometries = regions;
        self.state.solved(inputs);
        tracing::trace!(
            items = self.items.len(),
            solves = self.state.solves,
            "grid layout recomputed"
        );
        true
    }

    fn remove_widget(&mut self, widget: &dyn LayoutWidget) -> bool {
        let before = self.items.len();
        self.items.retain(|item| !same_widget(&item.widget, widget));
        let removed = self.items.len() != before;
        if removed {
            self.invalidate();
        }
        removed
    }

    fn count(&self) -> usize {
        self.items.len()
    }

    fn solve_count(&self) -> u64 {
        self.state.solves
    }
}
