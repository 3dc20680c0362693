//! Layout participants: the widget contract, alignment flags, items, spacers.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::geometry::{Region, Size};

// ---------------------------------------------------------------------------
// Widget contract
// ---------------------------------------------------------------------------

/// What a layout needs from anything it positions.
///
/// Layouts hold children as `Rc<dyn LayoutWidget>` and push results through
/// [`set_geometry`](Self::set_geometry), so implementations use interior
/// mutability for their geometry.
pub trait LayoutWidget {
    /// Current geometry, relative to the owning container.
    fn geometry(&self) -> Region;

    /// Receive a geometry computed by a layout.
    fn set_geometry(&self, region: Region);

    /// Preferred size. Items with stretch 0 use it along the layout axis.
    fn size_hint(&self) -> Size;

    fn minimum_size(&self) -> Size {
        Size::ZERO
    }

    fn maximum_size(&self) -> Size {
        Size::MAX
    }
}

/// Compare two widgets by address.
pub(crate) fn same_widget(a: &Rc<dyn LayoutWidget>, b: &dyn LayoutWidget) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), b)
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// A plain rectangle with adjustable size constraints.
///
/// Useful as a container whose geometry drives a layout, and as a stand-in
/// child wherever no richer widget exists.
pub struct Frame {
    geometry: Cell<Region>,
    hint: Cell<Size>,
    minimum: Cell<Size>,
    maximum: Cell<Size>,
}

impl Frame {
    /// A frame preferring `hint`, unconstrained otherwise.
    pub fn new(hint: Size) -> Self {
        Self {
            geometry: Cell::new(Region::EMPTY),
            hint: Cell::new(hint),
            minimum: Cell::new(Size::ZERO),
            maximum: Cell::new(Size::MAX),
        }
    }

    /// A container frame whose geometry is `width` x `height` at the origin.
    pub fn sized(width: i32, height: i32) -> Self {
        let frame = Self::new(Size::new(width, height));
        frame.geometry.set(Region::new(0, 0, width, height));
        frame
    }

    pub fn with_minimum_size(self, size: Size) -> Self {
        self.minimum.set(size);
        self
    }

    pub fn with_maximum_size(self, size: Size) -> Self {
        self.maximum.set(size);
        self
    }

    /// Fix the frame at `size`: hint, minimum and maximum all equal.
    pub fn with_fixed_size(self, size: Size) -> Self {
        self.hint.set(size);
        self.minimum.set(size);
        self.maximum.set(size);
        self
    }

    pub fn set_size_hint(&self, size: Size) {
        self.hint.set(size);
    }

    pub fn set_minimum_size(&self, size: Size) {
        self.minimum.set(size);
    }

    pub fn set_maximum_size(&self, size: Size) {
        self.maximum.set(size);
    }

    /// Resize the frame in place, keeping its position.
    pub fn resize(&self, width: i32, height: i32) {
        let g = self.geometry.get();
        self.geometry.set(Region::new(g.x, g.y, width, height));
    }
}

impl LayoutWidget for Frame {
    fn geometry(&self) -> Region {
        self.geometry.get()
    }

    fn set_geometry(&self, region: Region) {
        self.geometry.set(region);
    }

    fn size_hint(&self) -> Size {
        self.hint.get()
    }

    fn minimum_size(&self) -> Size {
        self.minimum.get()
    }

    fn maximum_size(&self) -> Size {
        self.maximum.get()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("geometry", &self.geometry.get())
            .field("hint", &self.hint.get())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Spacer
// ---------------------------------------------------------------------------

/// Empty space inside a box layout.
///
/// A fixed spacer prefers `n` pixels on both axes, so along the layout axis
/// it takes exactly `n` when its stretch is 0; on the cross axis it has no
/// constraints and fills.
#[derive(Debug)]
pub struct Spacer {
    hint: Size,
    geometry: Cell<Region>,
}

impl Spacer {
    pub fn new(extent: i32) -> Self {
        Self {
            hint: Size::new(extent, extent),
            geometry: Cell::new(Region::EMPTY),
        }
    }
}

impl LayoutWidget for Spacer {
    fn geometry(&self) -> Region {
        self.geometry.get()
    }

    fn set_geometry(&self, region: Region) {
        self.geometry.set(region);
    }

    fn size_hint(&self) -> Size {
        self.hint
    }
}

// ---------------------------------------------------------------------------
// Alignment
// ---------------------------------------------------------------------------

bitflags::bitflags! {
    /// Where an item sits inside leftover cross-axis space.
    ///
    /// Horizontal and vertical flags are independent. No flag on an axis
    /// means start (left or top).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Alignment: u8 {
        const LEFT     = 0b0000_0001;
        const RIGHT    = 0b0000_0010;
        const H_CENTER = 0b0000_0100;
        /// Stretch to the available width. Sizes are still clamped, so an
        /// item that cannot stretch sits at the start. Overrides `RIGHT` and
        /// `H_CENTER`.
        const JUSTIFY  = 0b0000_1000;
        const TOP      = 0b0001_0000;
        const BOTTOM   = 0b0010_0000;
        const V_CENTER = 0b0100_0000;
        /// Vertical counterpart of `JUSTIFY`.
        const V_JUSTIFY = 0b1000_0000;
        const CENTER   = Self::H_CENTER.bits() | Self::V_CENTER.bits();
    }
}

impl Alignment {
    /// Offset of an item of size `size` inside `extent`, horizontally.
    pub(crate) fn horizontal_offset(self, extent: i32, size: i32) -> i32 {
        let leftover = (extent - size).max(0);
        if self.contains(Alignment::JUSTIFY) {
            0
        } else if self.contains(Alignment::RIGHT) {
            leftover
        } else if self.contains(Alignment::H_CENTER) {
            leftover / 2
        } else {
            0
        }
    }

    /// Offset of an item of size `size` inside `extent`, vertically.
    pub(crate) fn vertical_offset(self, extent: i32, size: i32) -> i32 {
        let leftover = (extent - size).max(0);
        if self.contains(Alignment::V_JUSTIFY) {
            0
        } else if self.contains(Alignment::BOTTOM) {
            leftover
        } else if self.contains(Alignment::V_CENTER) {
            leftover / 2
        } else {
            0
        }
    }
}

// ---------------------------------------------------------------------------
// LayoutItem
// ---------------------------------------------------------------------------

/// One entry of a box layout: a widget (or spacer), its stretch factor and
/// alignment.
#[derive(Clone)]
pub struct LayoutItem {
    pub(crate) widget: Rc<dyn LayoutWidget>,
    pub(crate) stretch: u32,
    pub(crate) alignment: Alignment,
    pub(crate) spacer: bool,
}

impl LayoutItem {
    pub(crate) fn new(widget: Rc<dyn LayoutWidget>, stretch: u32, alignment: Alignment) -> Self {
        Self {
            widget,
            stretch,
            alignment,
            spacer: false,
        }
    }

    pub(crate) fn spacer(extent: i32, stretch: u32) -> Self {
        Self {
            widget: Rc::new(Spacer::new(extent)),
            stretch,
            alignment: Alignment::empty(),
            spacer: true,
        }
    }

    /// The widget, or `None` for spacers.
    pub fn widget(&self) -> Option<&Rc<dyn LayoutWidget>> {
        (!self.spacer).then_some(&self.widget)
    }

    pub fn stretch(&self) -> u32 {
        self.stretch
    }

    pub fn alignment(&self) -> Alignment {
        self.alignment
    }

    pub fn is_spacer(&self) -> bool {
        self.spacer
    }

    pub(crate) fn is(&self, widget: &dyn LayoutWidget) -> bool {
        !self.spacer && same_widget(&self.widget, widget)
    }
}

impl fmt::Debug for LayoutItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutItem")
            .field("spacer", &self.spacer)
            .field("stretch", &self.stretch)
            .field("alignment", &self.alignment)
            .field("geometry", &self.widget.geometry())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_defaults() {
        let frame = Frame::new(Size::new(40, 20));
        assert_eq!(frame.size_hint(), Size::new(40, 20));
        assert_eq!(frame.minimum_size(), Size::ZERO);
        assert_eq!(frame.maximum_size(), Size::MAX);
        assert_eq!(frame.geometry(), Region::EMPTY);
    }

    #[test]
    fn fixed_frame() {
        let frame = Frame::new(Size::ZERO).with_fixed_size(Size::new(5, 6));
        assert_eq!(frame.minimum_size(), frame.maximum_size());
        assert_eq!(frame.size_hint(), Size::new(5, 6));
    }

    #[test]
    fn sized_frame_has_geometry() {
        let frame = Frame::sized(300, 100);
        assert_eq!(frame.geometry(), Region::new(0, 0, 300, 100));
        frame.resize(200, 50);
        assert_eq!(frame.geometry(), Region::new(0, 0, 200, 50));
    }

    #[test]
    fn alignment_offsets() {
        assert_eq!(Alignment::empty().horizontal_offset(100, 40), 0);
        assert_eq!(Alignment::RIGHT.horizontal_offset(100, 40), 60);
        assert_eq!(Alignment::CENTER.horizontal_offset(100, 40), 30);
        assert_eq!(Alignment::JUSTIFY.horizontal_offset(100, 40), 0);
        assert_eq!(Alignment::BOTTOM.vertical_offset(100, 40), 60);
        assert_eq!(Alignment::CENTER.vertical_offset(100, 40), 30);
        assert_eq!(Alignment::V_JUSTIFY.vertical_offset(100, 40), 0);
        assert_eq!((Alignment::JUSTIFY | Alignment::RIGHT).horizontal_offset(100, 40), 0);
        assert_eq!((Alignment::V_JUSTIFY | Alignment::BOTTOM).vertical_offset(100, 40), 0);
        // Each axis reads only its own flags.
        assert_eq!(Alignment::JUSTIFY.union(Alignment::BOTTOM).vertical_offset(100, 40), 60);
        assert_eq!(Alignment::V_JUSTIFY.union(Alignment::RIGHT).horizontal_offset(100, 40), 60);
        // Oversized items never move backwards.
        assert_eq!(Alignment::RIGHT.horizontal_offset(10, 40), 0);
    }

    #[test]
    fn item_identity() {
        let a: Rc<dyn LayoutWidget> = Rc::new(Frame::new(Size::ZERO));
        let b = Frame::new(Size::ZERO);
        let item = LayoutItem::new(a.clone(), 0, Alignment::empty());
        assert!(item.is(a.as_ref()));
        assert!(!item.is(&b));
        assert!(item.widget().is_some());
        assert!(LayoutItem::spacer(10, 0).widget().is_none());
    }
}
