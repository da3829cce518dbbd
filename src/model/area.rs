//! Axis-aligned rectangles and points used for all layout geometry.

use serde::{Deserialize, Serialize};

use crate::layout_engine::Orientation;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self { Point { x, y } }

    pub fn along(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }

    pub fn distance(&self, other: Point) -> f64 { (self.x - other.x).hypot(self.y - other.y) }

    pub fn offset(&self, dx: f64, dy: f64) -> Point { Point::new(self.x + dx, self.y + dy) }

    pub fn delta_from(&self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// Rectangle spanning `[x, x2] × [y, y2]`.
///
/// Bounds are private so width, height and surface always follow them.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
#[serde(from = "Bounds", into = "Bounds")]
pub struct RenderableArea {
    x: f64,
    x2: f64,
    y: f64,
    y2: f64,
    width: f64,
    height: f64,
    surface: f64,
}

#[derive(Serialize, Deserialize)]
struct Bounds {
    x: f64,
    x2: f64,
    y: f64,
    y2: f64,
}

impl From<Bounds> for RenderableArea {
    fn from(b: Bounds) -> Self { RenderableArea::new(b.x, b.x2, b.y, b.y2) }
}

impl From<RenderableArea> for Bounds {
    fn from(a: RenderableArea) -> Self { Bounds { x: a.x, x2: a.x2, y: a.y, y2: a.y2 } }
}

impl RenderableArea {
    pub fn new(x: f64, x2: f64, y: f64, y2: f64) -> Self {
        let mut area = RenderableArea { x, x2, y, y2, ..Default::default() };
        area.recompute();
        area
    }

    pub fn from_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, x + width, y, y + height)
    }

    fn recompute(&mut self) {
        self.width = self.x2 - self.x;
        self.height = self.y2 - self.y;
        self.surface = self.width * self.height;
    }

    pub fn x(&self) -> f64 { self.x }

    pub fn x2(&self) -> f64 { self.x2 }

    pub fn y(&self) -> f64 { self.y }

    pub fn y2(&self) -> f64 { self.y2 }

    pub fn width(&self) -> f64 { self.width }

    pub fn height(&self) -> f64 { self.height }

    pub fn surface(&self) -> f64 { self.surface }

    pub fn set_x(&mut self, x: f64) {
        self.x = x;
        self.recompute();
    }

    pub fn set_x2(&mut self, x2: f64) {
        self.x2 = x2;
        self.recompute();
    }

    pub fn set_y(&mut self, y: f64) {
        self.y = y;
        self.recompute();
    }

    pub fn set_y2(&mut self, y2: f64) {
        self.y2 = y2;
        self.recompute();
    }

    pub fn origin(&self) -> Point { Point::new(self.x, self.y) }

    pub fn center(&self) -> Point { Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0) }

    pub fn size_along(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.width,
            Orientation::Vertical => self.height,
        }
    }

    pub fn start_along(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.x,
            Orientation::Vertical => self.y,
        }
    }

    /// A slice of this area of `length` px starting `offset` px along `orientation`,
    /// spanning the full cross axis.
    pub fn slice(&self, orientation: Orientation, offset: f64, length: f64) -> RenderableArea {
        match orientation {
            Orientation::Horizontal => {
                let x = self.x + offset;
                RenderableArea::new(x, x + length, self.y, self.y2)
            }
            Orientation::Vertical => {
                let y = self.y + offset;
                RenderableArea::new(self.x, self.x2, y, y + length)
            }
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> RenderableArea {
        RenderableArea::new(self.x + dx, self.x2 + dx, self.y + dy, self.y2 + dy)
    }

    pub fn contains(&self, point: Point) -> bool {
        (self.x..=self.x2).contains(&point.x) && (self.y..=self.y2).contains(&point.y)
    }

    pub fn contains_area(&self, other: &RenderableArea) -> bool {
        self.x <= other.x && self.y <= other.y && self.x2 >= other.x2 && self.y2 >= other.y2
    }

    pub fn intersection(&self, other: &RenderableArea) -> RenderableArea {
        let x = f64::max(self.x, other.x);
        let y = f64::max(self.y, other.y);
        let x2 = f64::max(f64::min(self.x2, other.x2), x);
        let y2 = f64::max(f64::min(self.y2, other.y2), y);
        RenderableArea::new(x, x2, y, y2)
    }

    pub fn clamp(&self, point: Point) -> Point {
        Point::new(point.x.clamp(self.x, self.x2), point.y.clamp(self.y, self.y2))
    }
}

pub trait Round {
    fn round(&self) -> Self;
}

impl Round for RenderableArea {
    fn round(&self) -> Self {
        RenderableArea::new(self.x.round(), self.x2.round(), self.y.round(), self.y2.round())
    }
}

impl Round for Point {
    fn round(&self) -> Self { Point::new(self.x.round(), self.y.round()) }
}

pub trait IsWithin {
    fn is_within(&self, how_much: f64, other: Self) -> bool;
}

impl IsWithin for RenderableArea {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x)
            && self.x2.is_within(how_much, other.x2)
            && self.y.is_within(how_much, other.y)
            && self.y2.is_within(how_much, other.y2)
    }
}

impl IsWithin for Point {
    fn is_within(&self, how_much: f64, other: Self) -> bool {
        self.x.is_within(how_much, other.x) && self.y.is_within(how_much, other.y)
    }
}

impl IsWithin for f64 {
    fn is_within(&self, how_much: f64, other: Self) -> bool { (self - other).abs() < how_much }
}

pub trait SameAs: IsWithin + Sized {
    fn same_as(&self, other: Self) -> bool { self.is_within(0.1, other) }
}

impl SameAs for RenderableArea {}
impl SameAs for Point {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_values() {
        let area = RenderableArea::new(10.0, 110.0, 20.0, 70.0);
        assert_eq!(area.width(), 100.0);
        assert_eq!(area.height(), 50.0);
        assert_eq!(area.surface(), 5000.0);
    }

    #[test]
    fn test_setters_recompute() {
        let mut area = RenderableArea::from_size(0.0, 0.0, 100.0, 100.0);
        area.set_x2(40.0);
        assert_eq!(area.width(), 40.0);
        assert_eq!(area.surface(), 4000.0);
        area.set_y(50.0);
        assert_eq!(area.height(), 50.0);
        assert_eq!(area.surface(), 2000.0);
        area.set_x(10.0);
        area.set_y2(60.0);
        assert_eq!((area.width(), area.height()), (30.0, 10.0));
    }

    #[test]
    fn test_round_area() {
        let area = RenderableArea::new(10.4, 110.6, 20.7, 220.2);
        let rounded = area.round();
        assert_eq!(rounded.x(), 10.0);
        assert_eq!(rounded.x2(), 111.0);
        assert_eq!(rounded.y(), 21.0);
        assert_eq!(rounded.height(), 199.0);
    }

    #[test]
    fn test_is_within_and_same_as() {
        let a = RenderableArea::new(10.0, 20.0, 30.0, 40.0);
        let b = RenderableArea::new(10.05, 20.05, 30.08, 40.0);
        assert!(a.is_within(0.1, b));
        assert!(!a.is_within(0.01, b));
        assert!(a.same_as(b));
        assert!(Point::new(1.0, 1.0).same_as(Point::new(1.05, 0.99)));
    }

    #[test]
    fn test_intersection() {
        let a = RenderableArea::from_size(0.0, 0.0, 100.0, 100.0);
        let b = RenderableArea::from_size(50.0, 50.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), RenderableArea::new(50.0, 100.0, 50.0, 100.0));

        let far = RenderableArea::from_size(200.0, 200.0, 10.0, 10.0);
        assert_eq!(a.intersection(&far).surface(), 0.0);
    }

    #[test]
    fn test_contains_point() {
        let area = RenderableArea::from_size(0.0, 0.0, 100.0, 100.0);
        assert!(area.contains(Point::new(50.0, 50.0)));
        assert!(area.contains(Point::new(0.0, 0.0)));
        assert!(area.contains(Point::new(100.0, 100.0)));
        assert!(!area.contains(Point::new(101.0, 50.0)));
        assert!(!area.contains(Point::new(-1.0, 50.0)));
    }

    #[test]
    fn test_contains_area_and_clamp() {
        let area = RenderableArea::from_size(0.0, 0.0, 100.0, 100.0);
        assert!(area.contains_area(&RenderableArea::from_size(10.0, 10.0, 80.0, 80.0)));
        assert!(!area.contains_area(&RenderableArea::from_size(-10.0, -10.0, 120.0, 120.0)));
        assert_eq!(area.clamp(Point::new(-5.0, 140.0)), Point::new(0.0, 100.0));
    }

    #[test]
    fn test_slice_and_translate() {
        let area = RenderableArea::from_size(10.0, 20.0, 300.0, 200.0);
        let col = area.slice(Orientation::Horizontal, 100.0, 50.0);
        assert_eq!(col, RenderableArea::new(110.0, 160.0, 20.0, 220.0));
        let row = area.slice(Orientation::Vertical, 0.0, 30.0);
        assert_eq!(row, RenderableArea::new(10.0, 310.0, 20.0, 50.0));
        assert_eq!(area.translate(5.0, -5.0).origin(), Point::new(15.0, 15.0));
    }

    #[test]
    fn test_serde_keeps_derived_values() {
        let area = RenderableArea::new(1.0, 4.0, 2.0, 8.0);
        let json = serde_json::to_string(&area).unwrap();
        assert_eq!(json, r#"{"x":1.0,"x2":4.0,"y":2.0,"y2":8.0}"#);
        let back: RenderableArea = serde_json::from_str(&json).unwrap();
        assert_eq!(back.surface(), 18.0);
    }
}
