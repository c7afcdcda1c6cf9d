//! Region algebra over sets of non-overlapping rectangles.
//!
//! A [`Region`] is kept band-normalized at all times: rectangles are grouped
//! into horizontal bands sorted top to bottom, the rectangles inside a band
//! are sorted left to right and never touch, and vertically adjacent bands
//! with identical spans are merged. Two regions covering the same pixels
//! therefore compare equal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open integer rectangle `[x1, x2) × [y1, y2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    /// Rectangle from origin and size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x.saturating_add(width),
            y2: y.saturating_add(height),
        }
    }

    pub const fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub const fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub const fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    pub const fn is_empty(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    /// Pixel area; zero for empty rectangles.
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            i64::from(self.width()) * i64::from(self.height())
        }
    }

    pub const fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Intersection, `None` when the rectangles do not overlap.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let r = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        (!r.is_empty()).then_some(r)
    }

    pub const fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1.saturating_add(dx),
            y1: self.y1.saturating_add(dy),
            x2: self.x2.saturating_add(dx),
            y2: self.y2.saturating_add(dy),
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width(),
            self.height(),
            self.x1,
            self.y1
        )
    }
}

/// A normalized set of non-overlapping rectangles with cached extents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Region {
    rects: Vec<Rect>,
    extents: Rect,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Op {
    Union,
    Intersect,
    Subtract,
}

impl Region {
    /// The empty region.
    pub const fn new() -> Self {
        Self {
            rects: Vec::new(),
            extents: Rect::from_corners(0, 0, 0, 0),
        }
    }

    pub fn from_rect(rect: Rect) -> Self {
        if rect.is_empty() {
            return Self::new();
        }
        Self {
            rects: vec![rect],
            extents: rect,
        }
    }

    /// Union of an arbitrary (possibly overlapping) set of rectangles.
    pub fn from_rects<I: IntoIterator<Item = Rect>>(rects: I) -> Self {
        let mut region = Self::new();
        for rect in rects {
            region.union_rect(rect);
        }
        region
    }

    /// Rectangles in band order.
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub const fn extents(&self) -> Rect {
        self.extents
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn is_not_empty(&self) -> bool {
        !self.rects.is_empty()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
        self.extents = Rect::default();
    }

    /// Total pixel area.
    pub fn area(&self) -> i64 {
        self.rects.iter().map(Rect::area).sum()
    }

    /// Half-open point containment.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        if !self.extents.contains_point(x, y) {
            return false;
        }
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    // ── Pure operations ──────────────────────────────────────────────

    pub fn union(&self, other: &Self) -> Self {
        combine(self, other, Op::Union)
    }

    pub fn intersect(&self, other: &Self) -> Self {
        combine(self, other, Op::Intersect)
    }

    pub fn subtract(&self, other: &Self) -> Self {
        combine(self, other, Op::Subtract)
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        let mut out = self.clone();
        out.translate(dx, dy);
        out
    }

    // ── In-place operations ──────────────────────────────────────────

    pub fn union_with(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.clone_from(other);
            return;
        }
        *self = combine(self, other, Op::Union);
    }

    pub fn intersect_with(&mut self, other: &Self) {
        *self = combine(self, other, Op::Intersect);
    }

    pub fn subtract_with(&mut self, other: &Self) {
        if other.is_empty() || self.is_empty() {
            return;
        }
        *self = combine(self, other, Op::Subtract);
    }

    pub fn union_rect(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        self.union_with(&Self::from_rect(rect));
    }

    pub fn intersect_rect(&mut self, rect: Rect) {
        self.intersect_with(&Self::from_rect(rect));
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        for r in &mut self.rects {
            *r = r.translated(dx, dy);
        }
        if !self.rects.is_empty() {
            self.extents = self.extents.translated(dx, dy);
        }
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, r) in self.rects.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{r}")?;
        }
        write!(f, "]")
    }
}

// ── Band sweep ───────────────────────────────────────────────────────

/// Horizontal spans of `region` covering the whole of `[y1, y2)`.
///
/// `y1..y2` is always a slab between consecutive band edges of both
/// operands, so a rectangle either covers it completely or not at all.
fn spans_in(region: &Region, y1: i32, y2: i32) -> Vec<(i32, i32)> {
    region
        .rects
        .iter()
        .filter(|r| r.y1 <= y1 && r.y2 >= y2)
        .map(|r| (r.x1, r.x2))
        .collect()
}

fn union_spans(a: &[(i32, i32)], b: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut all: Vec<(i32, i32)> = a.iter().chain(b.iter()).copied().collect();
    all.sort_unstable();
    let mut out: Vec<(i32, i32)> = Vec::with_capacity(all.len());
    for (x1, x2) in all {
        match out.last_mut() {
            Some(last) if x1 <= last.1 => last.1 = last.1.max(x2),
            _ => out.push((x1, x2)),
        }
    }
    out
}

fn intersect_spans(a: &[(i32, i32)], b: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let x1 = a[i].0.max(b[j].0);
        let x2 = a[i].1.min(b[j].1);
        if x1 < x2 {
            out.push((x1, x2));
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

fn subtract_spans(a: &[(i32, i32)], b: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    for &(mut x1, x2) in a {
        for &(bx1, bx2) in b {
            if bx2 <= x1 {
                continue;
            }
            if bx1 >= x2 {
                break;
            }
            if bx1 > x1 {
                out.push((x1, bx1));
            }
            x1 = x1.max(bx2);
            if x1 >= x2 {
                break;
            }
        }
        if x1 < x2 {
            out.push((x1, x2));
        }
    }
    out
}

fn combine(a: &Region, b: &Region, op: Op) -> Region {
    match op {
        Op::Union if a.is_empty() => return b.clone(),
        Op::Union if b.is_empty() => return a.clone(),
        Op::Intersect if a.is_empty() || b.is_empty() => return Region::new(),
        Op::Intersect if a.intersect_extents_empty(b) => return Region::new(),
        Op::Subtract if a.is_empty() => return Region::new(),
        Op::Subtract if b.is_empty() || a.intersect_extents_empty(b) => return a.clone(),
        _ => {}
    }

    let mut edges: Vec<i32> = a
        .rects
        .iter()
        .chain(b.rects.iter())
        .flat_map(|r| [r.y1, r.y2])
        .collect();
    edges.sort_unstable();
    edges.dedup();

    let mut builder = BandBuilder::default();
    for slab in edges.windows(2) {
        let (y1, y2) = (slab[0], slab[1]);
        let sa = spans_in(a, y1, y2);
        let sb = spans_in(b, y1, y2);
        let spans = match op {
            Op::Union => union_spans(&sa, &sb),
            Op::Intersect => intersect_spans(&sa, &sb),
            Op::Subtract => subtract_spans(&sa, &sb),
        };
        builder.push_band(y1, y2, &spans);
    }
    builder.finish()
}

impl Region {
    fn intersect_extents_empty(&self, other: &Self) -> bool {
        self.extents.intersection(&other.extents).is_none()
    }
}

/// Accumulates bands top to bottom, coalescing a band into the previous one
/// when they touch vertically and have identical spans.
#[derive(Default)]
struct BandBuilder {
    rects: Vec<Rect>,
    /// Start index in `rects` of the last emitted band.
    last_band: usize,
}

impl BandBuilder {
    fn push_band(&mut self, y1: i32, y2: i32, spans: &[(i32, i32)]) {
        if spans.is_empty() {
            return;
        }
        let prev = &self.rects[self.last_band..];
        let coalesce = !prev.is_empty()
            && prev[0].y2 == y1
            && prev.len() == spans.len()
            && prev
                .iter()
                .zip(spans)
                .all(|(r, &(x1, x2))| r.x1 == x1 && r.x2 == x2);
        if coalesce {
            for r in &mut self.rects[self.last_band..] {
                r.y2 = y2;
            }
            return;
        }
        self.last_band = self.rects.len();
        self.rects
            .extend(spans.iter().map(|&(x1, x2)| Rect::from_corners(x1, y1, x2, y2)));
    }

    fn finish(self) -> Region {
        let extents = self
            .rects
            .iter()
            .copied()
            .reduce(|acc, r| Rect {
                x1: acc.x1.min(r.x1),
                y1: acc.y1.min(r.y1),
                x2: acc.x2.max(r.x2),
                y2: acc.y2.max(r.y2),
            })
            .unwrap_or_default();
        Region {
            rects: self.rects,
            extents,
        }
    }
}
