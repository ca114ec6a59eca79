use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use egui::{Pos2, Rect, Vec2};
use image::RgbaImage;

use super::stroke::{StrokeStyle, edge_coverage, rasterize_coverage, segment_distance};

/// Available shape primitives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Circle,
    Triangle,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "rectangle",
            ShapeKind::Circle => "circle",
            ShapeKind::Triangle => "triangle",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Circle => "Circle",
            ShapeKind::Triangle => "Triangle",
        }
    }

    pub fn all() -> &'static [ShapeKind] {
        &[ShapeKind::Rectangle, ShapeKind::Circle, ShapeKind::Triangle]
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShapeKind::all()
            .iter()
            .copied()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown shape '{}'", s))
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// A shape resolved from its two drag anchors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ShapeGeometry {
    /// Box from `origin` spanning `width × height`.  Either may be negative
    /// (dragged up/left); the box is then drawn backwards from `origin`.
    Rectangle { origin: Pos2, width: f32, height: f32 },
    Circle { center: Pos2, radius: f32 },
    /// Isoceles triangle mirrored across the start anchor's x.
    Triangle { vertices: [Pos2; 3] },
}

impl ShapeGeometry {
    pub fn from_anchors(kind: ShapeKind, start: Pos2, end: Pos2) -> Self {
        match kind {
            ShapeKind::Rectangle => ShapeGeometry::Rectangle {
                origin: start,
                width: end.x - start.x,
                height: end.y - start.y,
            },
            ShapeKind::Circle => ShapeGeometry::Circle {
                center: start,
                radius: start.distance(end),
            },
            ShapeKind::Triangle => ShapeGeometry::Triangle {
                vertices: [start, end, Pos2::new(start.x - (end.x - start.x), end.y)],
            },
        }
    }

    /// Outline vertices in path order (closed), `None` for circles.
    pub fn vertices(&self) -> Option<Vec<Pos2>> {
        match *self {
            ShapeGeometry::Rectangle { origin, width, height } => Some(vec![
                origin,
                origin + Vec2::new(width, 0.0),
                origin + Vec2::new(width, height),
                origin + Vec2::new(0.0, height),
            ]),
            ShapeGeometry::Triangle { vertices } => Some(vertices.to_vec()),
            ShapeGeometry::Circle { .. } => None,
        }
    }

    /// Geometric bounds of the outline path (no stroke width).
    pub fn bounds(&self) -> Rect {
        match *self {
            ShapeGeometry::Circle { center, radius } => {
                Rect::from_center_size(center, Vec2::splat(radius * 2.0))
            }
            _ => {
                let verts = self.vertices().unwrap_or_default();
                verts.iter().skip(1).fold(
                    Rect::from_min_max(verts[0], verts[0]),
                    |r, v| r.union(Rect::from_min_max(*v, *v)),
                )
            }
        }
    }

    /// Distance from `p` to the outline, and the arc-length position of the
    /// nearest outline point measured from the path start.
    fn outline_distance(&self, p: Pos2, closed_path: &[Pos2]) -> (f32, f32) {
        match *self {
            ShapeGeometry::Circle { center, radius } => {
                let v = p - center;
                let d = (v.length() - radius).abs();
                // Canvas arcs start at angle 0 and sweep clockwise in screen space.
                let angle = v.y.atan2(v.x).rem_euclid(TAU);
                (d, angle * radius)
            }
            _ => {
                let mut best = (f32::MAX, 0.0);
                let mut walked = 0.0;
                for (i, a) in closed_path.iter().enumerate() {
                    let b = closed_path[(i + 1) % closed_path.len()];
                    let len = a.distance(b);
                    let (d, t) = segment_distance(p, *a, b);
                    if d < best.0 {
                        best = (d, walked + t * len);
                    }
                    walked += len;
                }
                best
            }
        }
    }
}

/// Stroke the outline of `geometry` onto `pixels`.  Returns the touched bounds.
pub fn rasterize_outline(pixels: &mut RgbaImage, geometry: &ShapeGeometry, style: &StrokeStyle) -> Rect {
    let half = style.half_width();
    let bounds = geometry.bounds().expand(half + 1.0);
    let path = geometry.vertices().unwrap_or_default();
    rasterize_coverage(pixels, bounds, style, |p| {
        let (d, s) = geometry.outline_distance(p, &path);
        if style.in_dash_gap(s) {
            0.0
        } else {
            edge_coverage(d - half)
        }
    });
    bounds
}
