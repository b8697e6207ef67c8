//! Quadtree spatial index over polyline bounding boxes
//!
//! This module provides a region quadtree rooted at the network's extent. Each entry is a
//! polyline index plus its axis-aligned bounding box, stored at the deepest node whose box
//! fully contains it. A range query returns every entry whose box intersects the query box;
//! it may over-approximate the exact answer but never misses an intersecting entry.

use crate::utils;
use geo::{Coord, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum depth of the quadtree to prevent infinite recursion
const MAX_DEPTH: u32 = 16;

/// Number of entries a node holds before it is subdivided
const MAX_ENTRIES_PER_NODE: usize = 8;

/// A polyline reference stored in the quadtree
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct IndexedBox {
    /// Index of the polyline in the network
    index: usize,
    /// Bounding box of the polyline
    bounding_box: Rect<f64>,
}

/// Root container for the quadtree spatial index
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quadtree {
    /// Root node covering the indexed extent
    root: QuadtreeNode,
    /// Number of stored entries
    len: usize,
}

/// A single node in the quadtree
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
struct QuadtreeNode {
    /// Bounding box of the region covered by this node
    bounding_box: Rect<f64>,
    /// Depth level in the tree (0 = root)
    level: u32,
    /// Entries that do not fit entirely into a single child
    entries: Vec<IndexedBox>,
    /// Child nodes (NW, NE, SW, SE) if subdivided
    children: Option<Box<[QuadtreeNode; 4]>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Quadtree {
    /// Create a new empty quadtree covering `bounds`
    ///
    /// Entries outside `bounds` are still accepted; they are kept at the root.
    pub fn new(bounds: Rect<f64>) -> Self {
        Self {
            root: QuadtreeNode::new(bounds, 0),
            len: 0,
        }
    }

    /// Build a quadtree from `(index, bounding box)` pairs
    pub fn from_entries<I>(bounds: Rect<f64>, entries: I) -> Self
    where
        I: IntoIterator<Item = (usize, Rect<f64>)>,
    {
        let mut quadtree = Self::new(bounds);
        for (index, bounding_box) in entries {
            quadtree.insert(index, bounding_box);
        }
        quadtree
    }

    /// Insert an entry at the deepest node that fully contains its box
    pub fn insert(&mut self, index: usize, bounding_box: Rect<f64>) {
        self.root.insert(IndexedBox {
            index,
            bounding_box,
        });
        self.len += 1;
    }

    /// Query for entries whose bounding box intersects `query`
    ///
    /// Indices are returned in no particular order.
    pub fn query(&self, query: Rect<f64>) -> Vec<usize> {
        let mut results = Vec::new();
        self.query_into(query, &mut results);
        results
    }

    /// Like [`Quadtree::query`], appending into an existing collection
    pub fn query_into<E: Extend<usize>>(&self, query: Rect<f64>, results: &mut E) {
        self.root.query(query, results);
    }

    /// Region covered by the root node
    #[inline]
    pub fn bounds(&self) -> Rect<f64> {
        self.root.bounding_box
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Depth of the deepest subdivided level
    pub fn depth(&self) -> u32 {
        self.root.depth()
    }
}

impl QuadtreeNode {
    fn new(bounding_box: Rect<f64>, level: u32) -> Self {
        Self {
            bounding_box,
            level,
            entries: Vec::new(),
            children: None,
        }
    }

    /// Subdivide this node into 4 children and push down entries that fit
    fn subdivide(&mut self) {
        if self.children.is_some() {
            return; // Already subdivided
        }

        let min = self.bounding_box.min();
        let max = self.bounding_box.max();
        let mid_x = (min.x + max.x) / 2.0;
        let mid_y = (min.y + max.y) / 2.0;

        let child_level = self.level + 1;

        // Create 4 children: NW, NE, SW, SE
        let nw = QuadtreeNode::new(
            Rect::new(Coord { x: min.x, y: mid_y }, Coord { x: mid_x, y: max.y }),
            child_level,
        );
        let ne = QuadtreeNode::new(
            Rect::new(Coord { x: mid_x, y: mid_y }, Coord { x: max.x, y: max.y }),
            child_level,
        );
        let sw = QuadtreeNode::new(
            Rect::new(Coord { x: min.x, y: min.y }, Coord { x: mid_x, y: mid_y }),
            child_level,
        );
        let se = QuadtreeNode::new(
            Rect::new(Coord { x: mid_x, y: min.y }, Coord { x: max.x, y: mid_y }),
            child_level,
        );

        self.children = Some(Box::new([nw, ne, sw, se]));

        // Redistribute entries that now fit entirely inside one child
        let entries = std::mem::take(&mut self.entries);
        for entry in entries {
            self.insert(entry);
        }
    }

    fn insert(&mut self, entry: IndexedBox) {
        if let Some(children) = &mut self.children {
            if let Some(child) = children
                .iter_mut()
                .find(|child| utils::rect_contains(child.bounding_box, entry.bounding_box))
            {
                child.insert(entry);
                return;
            }
            self.entries.push(entry);
            return;
        }

        self.entries.push(entry);

        if self.level < MAX_DEPTH && self.entries.len() > MAX_ENTRIES_PER_NODE {
            self.subdivide();
        }
    }

    fn query<E: Extend<usize>>(&self, query: Rect<f64>, results: &mut E) {
        // Entries are always tested: at the root they may lie outside the node's box
        results.extend(
            self.entries
                .iter()
                .filter(|entry| utils::rects_intersect(entry.bounding_box, query))
                .map(|entry| entry.index),
        );

        // Children only hold entries inside their own box, so they can be culled
        if let Some(children) = &self.children {
            for child in children.iter() {
                if utils::rects_intersect(child.bounding_box, query) {
                    child.query(query, results);
                }
            }
        }
    }

    fn depth(&self) -> u32 {
        match &self.children {
            Some(children) => children.iter().map(|c| c.depth()).max().unwrap_or(self.level),
            None => self.level,
        }
    }
}
