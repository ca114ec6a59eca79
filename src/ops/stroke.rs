use egui::{Pos2, Rect};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// How stroke coverage is applied to the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Compositing {
    /// Source-over painting.
    #[default]
    Normal,
    /// Destination-out: coverage removes destination alpha, color is ignored.
    Erase,
}

/// Resolved style for one stroke.  Caps and joins are always round: the
/// rasteriser works from distance-to-geometry, which is round by construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba<u8>,
    pub width: f32,
    pub alpha: f32,
    pub compositing: Compositing,
    /// `[on, off]` dash lengths in pixels along the outline.
    pub dash: Option<[f32; 2]>,
}

impl StrokeStyle {
    pub fn solid(color: Rgba<u8>, width: f32, alpha: f32) -> Self {
        Self {
            color,
            width,
            alpha: alpha.clamp(0.0, 1.0),
            compositing: Compositing::Normal,
            dash: None,
        }
    }

    pub fn eraser(width: f32) -> Self {
        Self {
            color: Rgba([0, 0, 0, 255]),
            width,
            alpha: 1.0,
            compositing: Compositing::Erase,
            dash: None,
        }
    }

    pub fn with_dash(mut self, on: f32, off: f32) -> Self {
        self.dash = Some([on, off]);
        self
    }

    pub(crate) fn half_width(&self) -> f32 {
        (self.width * 0.5).max(0.5)
    }

    /// True if a pixel at arc-length `s` along the outline falls in a gap.
    pub(crate) fn in_dash_gap(&self, s: f32) -> bool {
        match self.dash {
            Some([on, off]) if on > 0.0 && off > 0.0 => s.rem_euclid(on + off) >= on,
            _ => false,
        }
    }
}

// ============================================================================
// PIXEL BLENDING
// ============================================================================

/// Source-over of straight-alpha `top` onto `base`, with `top` alpha scaled by `opacity`.
pub fn blend_over(base: Rgba<u8>, top: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    if opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.min(1.0);
    let top_a = (top[3] as f32 / 255.0) * opacity;
    let base_a = base[3] as f32 / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }

    let channel = |i: usize| {
        let t = top[i] as f32 / 255.0;
        let b = base[i] as f32 / 255.0;
        let c = (t * top_a + b * base_a * (1.0 - top_a)) / out_a;
        (c * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        channel(0),
        channel(1),
        channel(2),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// Destination-out: remove `amount` (0..1) of the destination's alpha.
pub fn erase_pixel(base: Rgba<u8>, amount: f32) -> Rgba<u8> {
    if base[3] == 0 || amount <= 0.0 {
        return base;
    }
    let keep = 1.0 - amount.min(1.0);
    let a = (base[3] as f32 * keep).round() as u8;
    if a == 0 {
        TRANSPARENT
    } else {
        Rgba([base[0], base[1], base[2], a])
    }
}

/// Apply `coverage` (0..1) of `style` to one pixel.
#[inline]
pub fn apply_coverage(dst: &mut Rgba<u8>, coverage: f32, style: &StrokeStyle) {
    if coverage <= 0.001 {
        return;
    }
    let amount = coverage * style.alpha;
    *dst = match style.compositing {
        Compositing::Normal => blend_over(*dst, style.color, amount),
        Compositing::Erase => erase_pixel(*dst, amount),
    };
}

// ============================================================================
// DISTANCE FIELDS
// ============================================================================

/// Distance from `p` to segment `a-b`, plus the projection parameter `t` in 0..1.
pub fn segment_distance(p: Pos2, a: Pos2, b: Pos2) -> (f32, f32) {
    let ab = b - a;
    let ap = p - a;
    let len_sq = ab.length_sq();
    let t = if len_sq <= f32::EPSILON {
        0.0
    } else {
        (ap.dot(ab) / len_sq).clamp(0.0, 1.0)
    };
    ((ap - ab * t).length(), t)
}

/// One-pixel antialiasing ramp: 1 inside, 0 outside.
#[inline]
pub fn edge_coverage(signed_distance: f32) -> f32 {
    smoothstep(0.5, -0.5, signed_distance)
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Integer pixel range touched by `bounds`, clamped to the image.
pub(crate) fn pixel_span(bounds: Rect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = bounds.min.x.floor().max(0.0) as i64;
    let y0 = bounds.min.y.floor().max(0.0) as i64;
    let x1 = (bounds.max.x.ceil() as i64).min(width as i64);
    let y1 = (bounds.max.y.ceil() as i64).min(height as i64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

/// Run `coverage_at` over every pixel center in `bounds` and apply it with `style`.
/// Rows are processed in parallel.
pub(crate) fn rasterize_coverage<F>(
    pixels: &mut RgbaImage,
    bounds: Rect,
    style: &StrokeStyle,
    coverage_at: F,
) where
    F: Fn(Pos2) -> f32 + Sync,
{
    let (w, h) = pixels.dimensions();
    let Some((x0, y0, x1, y1)) = pixel_span(bounds, w, h) else {
        return;
    };
    let row_bytes = w as usize * 4;
    let raw: &mut [u8] = pixels.as_mut();
    raw[y0 as usize * row_bytes..y1 as usize * row_bytes]
        .par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(row, row_buf)| {
            let py = (y0 as usize + row) as f32 + 0.5;
            for x in x0..x1 {
                let coverage = coverage_at(Pos2::new(x as f32 + 0.5, py));
                if coverage > 0.001 {
                    let idx = x as usize * 4;
                    let mut px = Rgba([
                        row_buf[idx],
                        row_buf[idx + 1],
                        row_buf[idx + 2],
                        row_buf[idx + 3],
                    ]);
                    apply_coverage(&mut px, coverage, style);
                    row_buf[idx..idx + 4].copy_from_slice(&px.0);
                }
            }
        });
}

// ============================================================================
// SEGMENTS
// ============================================================================

/// Bounding rect of a round-capped segment.
pub fn segment_bounds(from: Pos2, to: Pos2, width: f32) -> Rect {
    let pad = (width * 0.5).max(0.5) + 1.0;
    Rect::from_two_pos(from, to).expand(pad)
}

/// Stroke one round-capped segment `from → to` onto `pixels`.
/// Returns the touched bounds (unclamped).
pub fn rasterize_segment(pixels: &mut RgbaImage, from: Pos2, to: Pos2, style: &StrokeStyle) -> Rect {
    let bounds = segment_bounds(from, to, style.width);
    let half = style.half_width();
    rasterize_coverage(pixels, bounds, style, |p| {
        let (d, _) = segment_distance(p, from, to);
        edge_coverage(d - half)
    });
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn over_on_transparent_keeps_source_color() {
        let out = blend_over(TRANSPARENT, Rgba([10, 20, 30, 255]), 0.4);
        assert_eq!(out, Rgba([10, 20, 30, 102]));
    }

    #[test]
    fn over_full_opacity_replaces() {
        assert_eq!(blend_over(Rgba([1, 2, 3, 255]), RED, 1.0), RED);
    }

    #[test]
    fn over_zero_opacity_is_noop() {
        let base = Rgba([1, 2, 3, 200]);
        assert_eq!(blend_over(base, RED, 0.0), base);
    }

    #[test]
    fn half_red_over_white() {
        let out = blend_over(Rgba([255, 255, 255, 255]), RED, 0.5);
        assert_eq!(out, Rgba([255, 128, 128, 255]));
    }

    #[test]
    fn erase_on_transparent_stays_transparent() {
        assert_eq!(erase_pixel(TRANSPARENT, 1.0), TRANSPARENT);
    }

    #[test]
    fn full_erase_clears_pixel() {
        assert_eq!(erase_pixel(RED, 1.0), TRANSPARENT);
        assert_eq!(erase_pixel(RED, 0.5)[3], 128);
    }

    #[test]
    fn segment_distance_projects_onto_segment() {
        let (d, t) = segment_distance(Pos2::new(5.0, 3.0), Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-5);
        assert!((t - 0.5).abs() < 1e-5);

        let (d, t) = segment_distance(Pos2::new(-4.0, 3.0), Pos2::new(0.0, 0.0), Pos2::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-5);
        assert_eq!(t, 0.0);
    }

    #[test]
    fn segment_paints_core_and_leaves_far_pixels() {
        let mut img = RgbaImage::new(40, 20);
        let style = StrokeStyle::solid(RED, 4.0, 1.0);
        rasterize_segment(&mut img, Pos2::new(5.0, 10.0), Pos2::new(30.0, 10.0), &style);
        assert_eq!(*img.get_pixel(15, 9), RED);
        assert_eq!(*img.get_pixel(15, 10), RED);
        assert_eq!(*img.get_pixel(15, 2), TRANSPARENT);
        assert_eq!(*img.get_pixel(38, 10), TRANSPARENT);
    }

    #[test]
    fn round_cap_extends_past_endpoint() {
        let mut img = RgbaImage::new(40, 20);
        let style = StrokeStyle::solid(RED, 6.0, 1.0);
        rasterize_segment(&mut img, Pos2::new(10.0, 10.0), Pos2::new(20.0, 10.0), &style);
        // Pixel center (21.5, 10.5) is 1.58 from the end point, well inside the 3px cap.
        assert_eq!(*img.get_pixel(21, 10), RED);
        // Cap corner is rounded: (22.5, 12.5) is ~3.54 away from the end point.
        assert!(img.get_pixel(22, 12)[3] < 255);
    }

    #[test]
    fn dashed_style_reports_gaps() {
        let style = StrokeStyle::solid(RED, 2.0, 1.0).with_dash(5.0, 5.0);
        assert!(!style.in_dash_gap(2.0));
        assert!(style.in_dash_gap(7.0));
        assert!(!style.in_dash_gap(12.0));
        assert!(!StrokeStyle::solid(RED, 2.0, 1.0).in_dash_gap(7.0));
    }
}
