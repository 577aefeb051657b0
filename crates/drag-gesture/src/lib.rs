//! Drag Gesture Tracking
//!
//! Pointer-driven drag-and-drop state, independent of any UI toolkit.
//! Uses a movement threshold to distinguish click from drag.

/// Movement threshold in pixels to start dragging
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

/// Drop target types
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropTarget<I, C> {
    /// Pointer is over a concrete item
    Item(I),
    /// Pointer is over empty space inside a column
    Column(C),
}

/// Vertical extent of the hovered element
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HoverRect {
    pub top: f64,
    pub height: f64,
}

impl HoverRect {
    pub fn new(top: f64, height: f64) -> Self {
        Self { top, height }
    }

    pub fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// True when `pointer_y` lies strictly below the vertical midpoint.
    /// A pointer exactly on the midpoint counts as the upper half.
    pub fn is_below_midpoint(&self, pointer_y: f64) -> bool {
        pointer_y > self.midpoint()
    }
}

/// What the pointer is currently over, with the element box if known
#[derive(Clone, Debug, PartialEq)]
pub struct Hover<I, C> {
    pub target: DropTarget<I, C>,
    pub rect: Option<HoverRect>,
}

impl<I, C> Hover<I, C> {
    pub fn item(id: I, rect: HoverRect) -> Self {
        Self {
            target: DropTarget::Item(id),
            rect: Some(rect),
        }
    }

    pub fn column(column: C) -> Self {
        Self {
            target: DropTarget::Column(column),
            rect: None,
        }
    }
}

/// Events produced by the gesture tracker
#[derive(Clone, Debug, PartialEq)]
pub enum GestureEvent<I, C> {
    /// Movement crossed the threshold; the pressed item is now dragged
    DragStarted(I),
    /// Pointer moved while a drag is active
    DragMoved {
        pointer_y: f64,
        hover: Option<Hover<I, C>>,
    },
    /// Pointer released while dragging
    Dropped {
        dragged: I,
        pointer_y: f64,
        hover: Option<Hover<I, C>>,
    },
    /// Pointer released without crossing the threshold
    Clicked(I),
}

/// Gesture state for a single pointer
#[derive(Clone, Debug)]
pub struct DragGesture<I, C> {
    /// Pending item id (pressed but not yet dragging)
    pending: Option<I>,
    dragging: Option<I>,
    start_x: f64,
    start_y: f64,
    pointer_y: f64,
    hover: Option<Hover<I, C>>,
    threshold: f64,
}

impl<I, C> Default for DragGesture<I, C> {
    fn default() -> Self {
        Self::with_threshold(DRAG_THRESHOLD_PX)
    }
}

impl<I: Clone, C: Clone> DragGesture<I, C> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<I, C> DragGesture<I, C> {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            pending: None,
            dragging: None,
            start_x: 0.0,
            start_y: 0.0,
            pointer_y: 0.0,
            hover: None,
            threshold,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn dragging(&self) -> Option<&I> {
        self.dragging.as_ref()
    }

    pub fn hover(&self) -> Option<&Hover<I, C>> {
        self.hover.as_ref()
    }

    /// Pointer left every drop target
    pub fn leave(&mut self) {
        if self.dragging.is_some() {
            self.hover = None;
        }
    }

    /// Abandon any pending or active drag
    pub fn cancel(&mut self) {
        self.pending = None;
        self.dragging = None;
        self.hover = None;
    }
}

impl<I: Clone, C: Clone> DragGesture<I, C> {
    /// Primary button pressed on an item. Records a pending drag.
    pub fn press(&mut self, item: I, x: f64, y: f64) {
        self.pending = Some(item);
        self.dragging = None;
        self.hover = None;
        self.start_x = x;
        self.start_y = y;
        self.pointer_y = y;
    }

    /// Pointer moved. Starts the drag once movement exceeds the threshold.
    pub fn motion(
        &mut self,
        x: f64,
        y: f64,
        hover: Option<Hover<I, C>>,
    ) -> Option<GestureEvent<I, C>> {
        self.pointer_y = y;

        if self.dragging.is_none() {
            let pending = self.pending.clone()?;
            let dx = (x - self.start_x).abs();
            let dy = (y - self.start_y).abs();
            if dx <= self.threshold && dy <= self.threshold {
                return None;
            }
            self.dragging = Some(pending.clone());
            self.hover = hover;
            return Some(GestureEvent::DragStarted(pending));
        }

        self.hover = hover.clone();
        Some(GestureEvent::DragMoved { pointer_y: y, hover })
    }

    /// Pointer released. Ends the gesture either as a drop or a click.
    pub fn release(&mut self) -> Option<GestureEvent<I, C>> {
        let pending = self.pending.take();
        let hover = self.hover.take();

        match self.dragging.take() {
            Some(dragged) => Some(GestureEvent::Dropped {
                dragged,
                pointer_y: self.pointer_y,
                hover,
            }),
            None => pending.map(GestureEvent::Clicked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Gesture = DragGesture<&'static str, u8>;

    #[test]
    fn test_small_motion_is_a_click() {
        let mut g = Gesture::new();
        g.press("a", 10.0, 10.0);
        assert_eq!(g.motion(13.0, 12.0, None), None);
        assert!(!g.is_dragging());
        assert_eq!(g.release(), Some(GestureEvent::Clicked("a")));
    }

    #[test]
    fn test_threshold_starts_drag() {
        let mut g = Gesture::new();
        g.press("a", 10.0, 10.0);
        let ev = g.motion(10.0, 16.0, Some(Hover::column(1)));
        assert_eq!(ev, Some(GestureEvent::DragStarted("a")));
        assert_eq!(g.dragging(), Some(&"a"));
        assert_eq!(g.hover(), Some(&Hover::column(1)));
    }

    #[test]
    fn test_drop_reports_last_hover() {
        let mut g = Gesture::new();
        g.press("a", 0.0, 0.0);
        g.motion(0.0, 20.0, None);
        let rect = HoverRect::new(40.0, 20.0);
        g.motion(0.0, 45.0, Some(Hover::item("b", rect)));

        assert_eq!(
            g.release(),
            Some(GestureEvent::Dropped {
                dragged: "a",
                pointer_y: 45.0,
                hover: Some(Hover::item("b", rect)),
            })
        );
        assert!(!g.is_dragging());
    }

    #[test]
    fn test_leave_clears_hover() {
        let mut g = Gesture::new();
        g.press("a", 0.0, 0.0);
        g.motion(0.0, 20.0, Some(Hover::column(0)));
        g.leave();
        assert!(g.hover().is_none());
        match g.release() {
            Some(GestureEvent::Dropped { hover, .. }) => assert!(hover.is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_motion_without_press_is_ignored() {
        let mut g = Gesture::new();
        assert_eq!(g.motion(100.0, 100.0, None), None);
        assert_eq!(g.release(), None);
    }

    #[test]
    fn test_midpoint_tie_counts_as_upper_half() {
        let rect = HoverRect::new(100.0, 40.0);
        assert_eq!(rect.midpoint(), 120.0);
        assert!(!rect.is_below_midpoint(120.0));
        assert!(rect.is_below_midpoint(120.5));
    }
}
