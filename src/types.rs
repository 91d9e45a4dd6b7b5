//! Core value types shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an item: section index plus item index within the section.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

impl fmt::Debug for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.section, self.item)
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.item)
    }
}

/// Monotonic counter stamped on every State.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gen({})", self.0)
    }
}

/// Identifies one enqueue call. Sub-batches produced by splitting share the
/// ticket of the changeset they came from.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Ticket(pub u64);

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ticket({})", self.0)
    }
}

/// How a modification is applied relative to the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Applied on the calling thread before the call returns.
    Synchronous,
    /// Computed on the scheduler; the call returns immediately.
    Asynchronous,
}

/// Scheduling priority for background computation.
///
/// Ordered from most to least urgent. Priority never reorders modifications
/// of one data source; it only decides which data source's pending work a
/// worker picks up first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Qos {
    UserInteractive,
    UserInitiated,
    #[default]
    Default,
    Background,
}

impl Qos {
    /// All levels, most urgent first.
    pub const ALL: [Qos; 4] = [
        Qos::UserInteractive,
        Qos::UserInitiated,
        Qos::Default,
        Qos::Background,
    ];

    pub fn rank(self) -> usize {
        match self {
            Qos::UserInteractive => 0,
            Qos::UserInitiated => 1,
            Qos::Default => 2,
            Qos::Background => 3,
        }
    }
}

/// Caller-supplied context threaded through to listeners untouched.
pub type UserInfo = serde_json::Map<String, serde_json::Value>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// The currently visible region, in the coordinate space items are laid out in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Size of the visible region (the scroll container's bounds).
    pub size: Size,
    /// Offset of the content origin from the visible region's origin.
    pub content_offset: Point,
}

impl Viewport {
    pub fn new(size: Size, content_offset: Point) -> Self {
        Self {
            size,
            content_offset,
        }
    }

    /// Visible `[start, end)` span along the given axis.
    pub fn span(&self, axis: Axis) -> (f64, f64) {
        match axis {
            Axis::Vertical => (
                self.content_offset.y,
                self.content_offset.y + self.size.height,
            ),
            Axis::Horizontal => (
                self.content_offset.x,
                self.content_offset.x + self.size.width,
            ),
        }
    }
}

/// Layout axis along which items are stacked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    #[default]
    Vertical,
    Horizontal,
}
