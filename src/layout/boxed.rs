//! Box layout: lines items up along one axis and shares leftover space by
//! stretch factor.
//!
//! Items with stretch 0 take their size hint along the main axis. Everything
//! left after those and the gaps between items is split among stretched
//! items in proportion to their stretch, rounding each share down. The
//! rounding remainder (at most one pixel per stretched item) is left unused.
//! Every computed size is clamped into the item's `[minimum, maximum]`.
//!
//! On the cross axis an item fills the content rectangle unless its own
//! constraints forbid it; then it sits inside the leftover space according
//! to its [`Alignment`].

use std::rc::Rc;

use crate::geometry::{clamp_extent, Region, Size, Spacing};

use super::item::{Alignment, LayoutItem, LayoutWidget};
use super::{Layout, LayoutState};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Main axis and placement order of a [`BoxLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    LeftToRight,
    /// Horizontal, first item at the right edge.
    RightToLeft,
    TopToBottom,
    /// Vertical, first item at the bottom edge.
    BottomToTop,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Direction::RightToLeft | Direction::BottomToTop)
    }

    fn main(self, size: Size) -> i32 {
        if self.is_horizontal() {
            size.width
        } else {
            size.height
        }
    }

    fn cross(self, size: Size) -> i32 {
        if self.is_horizontal() {
            size.height
        } else {
            size.width
        }
    }
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

/// Solver input for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxItem {
    pub hint: Size,
    pub minimum: Size,
    pub maximum: Size,
    pub stretch: u32,
    pub alignment: Alignment,
}

impl BoxItem {
    /// An unconstrained item that takes `hint` along the main axis.
    pub fn fixed(hint: Size) -> Self {
        Self {
            hint,
            minimum: Size::ZERO,
            maximum: Size::MAX,
            stretch: 0,
            alignment: Alignment::empty(),
        }
    }

    /// An unconstrained item claiming a `stretch` share of leftover space.
    pub fn stretched(stretch: u32) -> Self {
        Self {
            stretch,
            ..Self::fixed(Size::ZERO)
        }
    }

    pub fn with_minimum(mut self, minimum: Size) -> Self {
        self.minimum = minimum;
        self
    }

    pub fn with_maximum(mut self, maximum: Size) -> Self {
        self.maximum = maximum;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    fn from_item(item: &LayoutItem) -> Self {
        Self {
            hint: item.widget.size_hint(),
            minimum: item.widget.minimum_size(),
            maximum: item.widget.maximum_size(),
            stretch: item.stretch,
            alignment: item.alignment,
        }
    }
}

/// Compute one rectangle per item inside `content`.
///
/// Total over all inputs: an over-constrained layout squeezes stretched
/// items to their minimum (0 by default) instead of failing.
pub fn solve_box(
    content: Region,
    direction: Direction,
    spacing: i32,
    items: &[BoxItem],
) -> Vec<Region> {
    if items.is_empty() {
        return Vec::new();
    }
    let spacing = spacing.max(0);
    let horizontal = direction.is_horizontal();
    let main_extent = direction.main(content.size());
    let cross_extent = direction.cross(content.size());

    let mut total_fixed = i64::from(spacing) * (items.len() as i64 - 1);
    let mut stretch_sum: i64 = 0;
    for item in items {
        if item.stretch == 0 {
            total_fixed += i64::from(clamp_extent(
                direction.main(item.hint),
                direction.main(item.minimum),
                direction.main(item.maximum),
            ));
        } else {
            stretch_sum += i64::from(item.stretch);
        }
    }
    let available = (i64::from(main_extent) - total_fixed).max(0);

    let (main_start, cross_start) = if horizontal {
        (content.x, content.y)
    } else {
        (content.y, content.x)
    };
    let mut cursor = if direction.is_reversed() {
        main_start.saturating_add(main_extent)
    } else {
        main_start
    };

    let mut regions = Vec::with_capacity(items.len());
    for item in items {
        let raw = if item.stretch == 0 {
            direction.main(item.hint)
        } else {
            let share = available * i64::from(item.stretch) / stretch_sum;
            i32::try_from(share).unwrap_or(i32::MAX)
        };
        let main = clamp_extent(
            raw,
            direction.main(item.minimum),
            direction.main(item.maximum),
        );

        let position = if direction.is_reversed() {
            cursor = cursor.saturating_sub(main);
            let p = cursor;
            cursor = cursor.saturating_sub(spacing);
            p
        } else {
            let p = cursor;
            cursor = cursor.saturating_add(main).saturating_add(spacing);
            p
        };

        let cross = clamp_extent(
            cross_extent,
            direction.cross(item.minimum),
            direction.cross(item.maximum),
        );
        let region = if horizontal {
            let y = cross_start + item.alignment.vertical_offset(cross_extent, cross);
            Region::new(position, y, main, cross)
        } else {
            let x = cross_start + item.alignment.horizontal_offset(cross_extent, cross);
            Region::new(x, position, cross, main)
        };
        regions.push(region);
    }
    regions
}

// ---------------------------------------------------------------------------
// BoxLayout
// ---------------------------------------------------------------------------

/// A box layout bound to a container.
pub struct BoxLayout {
    direction: Direction,
    items: Vec<LayoutItem>,
    state: LayoutState<(Region, Vec<BoxItem>)>,
    geometries: Vec<Region>,
}

impl BoxLayout {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            items: Vec::new(),
            state: LayoutState::new(),
            geometries: Vec::new(),
        }
    }

    pub fn horizontal() -> Self {
        Self::new(Direction::LeftToRight)
    }

    pub fn vertical() -> Self {
        Self::new(Direction::TopToBottom)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_direction(&mut self, direction: Direction) {
        if self.direction != direction {
            self.direction = direction;
            self.invalidate();
        }
    }

    /// Append `widget` with stretch 0 and no alignment.
    pub fn add_widget(&mut self, widget: Rc<dyn LayoutWidget>) {
        self.add_widget_with(widget, 0, Alignment::empty());
    }

    /// Append `widget`. A widget already in this layout is moved to the end.
    pub fn add_widget_with(
        &mut self,
        widget: Rc<dyn LayoutWidget>,
        stretch: u32,
        alignment: Alignment,
    ) {
        self.insert_widget(self.items.len(), widget, stretch, alignment);
    }

    /// Insert `widget` before `index` (clamped to the item count).
    pub fn insert_widget(
        &mut self,
        index: usize,
        widget: Rc<dyn LayoutWidget>,
        stretch: u32,
        alignment: Alignment,
    ) {
        let mut index = index;
        if let Some(existing) = self.index_of(widget.as_ref()) {
            self.items.remove(existing);
            if existing < index {
                index -= 1;
            }
        }
        let index = index.min(self.items.len());
        self.items
            .insert(index, LayoutItem::new(widget, stretch, alignment));
        self.invalidate();
    }

    /// Append a fixed gap of `extent` pixels.
    pub fn add_spacing(&mut self, extent: i32) {
        self.items.push(LayoutItem::spacer(extent.max(0), 0));
        self.invalidate();
    }

    /// Append an empty item that soaks up a `stretch` share of leftover space.
    pub fn add_stretch(&mut self, stretch: u32) {
        self.items.push(LayoutItem::spacer(0, stretch));
        self.invalidate();
    }

    /// Move the item at `from` so it ends up at index `to`.
    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
            self.invalidate();
        }
        true
    }

    /// Remove and return the item at `index`.
    pub fn take_at(&mut self, index: usize) -> Option<LayoutItem> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.invalidate();
        Some(item)
    }

    pub fn item_at(&self, index: usize) -> Option<&LayoutItem> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[LayoutItem] {
        &self.items
    }

    pub fn index_of(&self, widget: &dyn LayoutWidget) -> Option<usize> {
        self.items.iter().position(|item| item.is(widget))
    }

    pub fn set_stretch_factor(&mut self, widget: &dyn LayoutWidget, stretch: u32) -> bool {
        let Some(index) = self.index_of(widget) else {
            return false;
        };
        if self.items[index].stretch != stretch {
            self.items[index].stretch = stretch;
            self.invalidate();
        }
        true
    }

    pub fn stretch_factor(&self, widget: &dyn LayoutWidget) -> Option<u32> {
        self.index_of(widget).map(|i| self.items[i].stretch)
    }

    pub fn set_alignment(&mut self, widget: &dyn LayoutWidget, alignment: Alignment) -> bool {
        let Some(index) = self.index_of(widget) else {
            return false;
        };
        if self.items[index].alignment != alignment {
            self.items[index].alignment = alignment;
            self.invalidate();
        }
        true
    }

    /// Geometry of every item (spacers included), solving first if needed.
    ///
    /// Empty until a parent widget is set.
    pub fn geometries(&mut self) -> &[Region] {
        self.activate();
        &self.geometries
    }
}

impl Default for BoxLayout {
    fn default() -> Self {
        Self::horizontal()
    }
}

impl Layout for BoxLayout {
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
        let inputs: Vec<BoxItem> = self.items.iter().map(BoxItem::from_item).collect();
        let inputs = (content, inputs);
        if !self.state.needs_solve(&inputs) {
            return false;
        }
        let regions = solve_box(content, self.direction, self.state.spacing, &inputs.1);
        for (item, region) in self.items.iter().zip(&regions) {
            item.widget.set_geometry(*region);
        }
        self.geometries = regions;
        self.state.solved(inputs);
        tracing::trace!(
            items = self.items.len(),
            solves = self.state.solves,
            "box layout recomputed"
        );
        true
    }

    fn remove_widget(&mut self, widget: &dyn LayoutWidget) -> bool {
        match self.index_of(widget) {
            Some(index) => {
                self.items.remove(index);
                self.invalidate();
                true
            }
            None => false,
        }
    }

    fn count(&self) -> usize {
        self.items.len()
    }

    fn solve_count(&self) -> u64 {
        self.state.solves
    }
}

// ===========================================================================
// Tests
// ===========================================================================
