//! The floating "I want this" bubble.

/// Text shown inside the bubble.
pub const BUBBLE_LABEL: &str = "I want this";

/// Position in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A single reusable bubble that glides toward the tile it belongs to.
#[derive(Debug, Clone)]
pub struct WantBubble {
    position: Point,
    target: Point,
    link: String,
    visible: bool,
    step: f32,
}

impl WantBubble {
    pub fn new(step: f32) -> Self {
        Self {
            position: Point::default(),
            target: Point::default(),
            link: String::new(),
            visible: false,
            step: if step > 0.0 { step } else { 1.0 },
        }
    }

    /// Point the bubble at a new tile. A hidden bubble appears at the
    /// target; a visible one travels there over the following ticks.
    pub fn show(&mut self, anchor: Point, link: impl Into<String>) {
        if !self.visible {
            self.position = anchor;
        }
        self.target = anchor;
        self.link = link.into();
        self.visible = true;
    }

    /// Move the target without changing the link, e.g. after a resize.
    pub fn retarget(&mut self, anchor: Point) {
        if self.visible {
            self.target = anchor;
        }
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn is_settled(&self) -> bool {
        self.position == self.target
    }

    /// Advance one animation tick. Returns whether the bubble moved.
    pub fn step(&mut self) -> bool {
        if !self.visible || self.is_settled() {
            return false;
        }

        let dx = self.target.x - self.position.x;
        let dy = self.target.y - self.position.y;
        if dx.abs() < 1.0 && dy.abs() < 1.0 {
            self.position = self.target;
            return true;
        }

        // Never overshoot, otherwise a step larger than the gap oscillates.
        let distance = dx.hypot(dy);
        let travel = self.step.min(distance);
        self.position.x += dx / distance * travel;
        self.position.y += dy / distance * travel;
        true
    }
}
