//! Utility functions for axis-aligned bounding box arithmetic
//!
//! All boxes are closed: a box that only touches another one on an edge or a corner
//! still intersects it.

use geo::{Coord, Rect};

/// Degenerate bounding box of a single coordinate
#[inline(always)]
pub fn point_rect(coord: Coord<f64>) -> Rect<f64> {
    Rect::new(coord, coord)
}

/// Grow a box by `offset` units in all four directions
#[inline(always)]
pub fn expand_rect(rect: Rect<f64>, offset: f64) -> Rect<f64> {
    Rect::new(
        Coord {
            x: rect.min().x - offset,
            y: rect.min().y - offset,
        },
        Coord {
            x: rect.max().x + offset,
            y: rect.max().y + offset,
        },
    )
}

/// Smallest box containing both inputs
#[inline(always)]
pub fn union_rect(a: Rect<f64>, b: Rect<f64>) -> Rect<f64> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

/// Check if two boxes overlap (closed intervals)
#[inline(always)]
pub fn rects_intersect(a: Rect<f64>, b: Rect<f64>) -> bool {
    !(a.max().x < b.min().x
        || a.min().x > b.max().x
        || a.max().y < b.min().y
        || a.min().y > b.max().y)
}

/// Check if `outer` fully contains `inner` (closed intervals)
#[inline(always)]
pub fn rect_contains(outer: Rect<f64>, inner: Rect<f64>) -> bool {
    inner.min().x >= outer.min().x
        && inner.max().x <= outer.max().x
        && inner.min().y >= outer.min().y
        && inner.max().y <= outer.max().y
}

/// Bounding box of a coordinate sequence, `None` when empty
pub fn bounding_rect_of<I>(coords: I) -> Option<Rect<f64>>
where
    I: IntoIterator<Item = Coord<f64>>,
{
    let mut iter = coords.into_iter();
    let first = iter.next()?;
    let mut min = first;
    let mut max = first;
    for c in iter {
        min.x = min.x.min(c.x);
        min.y = min.y.min(c.y);
        max.x = max.x.max(c.x);
        max.y = max.y.max(c.y);
    }
    Some(Rect::new(min, max))
}
