use std::fmt;

use egui::{Pos2, Rect};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use uuid::Uuid;

use crate::io::{self, EncodedImage, SnapshotError};
use crate::ops::shapes::{ShapeGeometry, ShapeKind, rasterize_outline};
use crate::ops::stroke::{StrokeStyle, TRANSPARENT, blend_over, rasterize_segment};

/// Canvas-local position in pixels, origin top-left.
pub type Point = Pos2;

/// Grid overlay spacing in pixels.
pub const GRID_SPACING: u32 = 20;
/// Gray 128 at 0.3 alpha.
pub const GRID_COLOR: Rgba<u8> = Rgba([128, 128, 128, 77]);
/// A 0.5px line centred on a pixel boundary covers a quarter of the pixel
/// on each side of it.
const GRID_LINE_COVERAGE: f32 = 0.25;

/// Layers created for a fresh layered canvas, bottom to top.
pub const DEFAULT_LAYER_NAMES: [&str; 3] = ["Background", "Sketch", "Details"];
/// The layer that receives input on a fresh layered canvas.
const DEFAULT_ACTIVE_LAYER: usize = 1;

pub const SINGLE_CANVAS_ID: &str = "canvas";

/// Refuse allocations beyond ~256 megapixels.
const MAX_PIXELS: u64 = 256_000_000;

fn sanitize_dimensions(width: u32, height: u32) -> (u32, u32) {
    let total = (width as u64) * (height as u64);
    if total > MAX_PIXELS || width == 0 || height == 0 {
        log_warn!(
            "PixelSurface: dimensions {}×{} out of range, clamped to 1×1",
            width,
            height
        );
        (1, 1)
    } else {
        (width, height)
    }
}

// ============================================================================
// PIXEL SURFACE - one off-screen RGBA buffer
// ============================================================================

/// Fixed-size straight-alpha RGBA raster with the drawing primitives the
/// stroke engine needs.  Resizing reallocates; it never stretches content.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelSurface {
    pixels: RgbaImage,
}

impl PixelSurface {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        let (width, height) = sanitize_dimensions(width, height);
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn new_filled(width: u32, height: u32, fill: Option<Rgba<u8>>) -> Self {
        let mut surface = Self::new(width, height);
        surface.clear(fill);
        surface
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Pixel at `(x, y)`; transparent outside the buffer.
    pub fn get_pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        self.pixels.get_pixel_checked(x, y).copied().unwrap_or(TRANSPARENT)
    }

    /// True when every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    /// Wipe the buffer, then paint it with `fill` if given.
    pub fn clear(&mut self, fill: Option<Rgba<u8>>) {
        let color = fill.unwrap_or(TRANSPARENT);
        for px in self.pixels.pixels_mut() {
            *px = color;
        }
    }

    /// Stroke one round-capped segment.  Returns the touched bounds.
    pub fn stroke_segment(&mut self, from: Point, to: Point, style: &StrokeStyle) -> Rect {
        rasterize_segment(&mut self.pixels, from, to, style)
    }

    /// Stroke the outline of a shape built from two drag anchors.
    pub fn draw_shape_outline(
        &mut self,
        start: Point,
        end: Point,
        kind: ShapeKind,
        style: &StrokeStyle,
    ) -> Rect {
        self.draw_geometry(&ShapeGeometry::from_anchors(kind, start, end), style)
    }

    pub fn draw_geometry(&mut self, geometry: &ShapeGeometry, style: &StrokeStyle) -> Rect {
        rasterize_outline(&mut self.pixels, geometry, style)
    }

    /// Reallocate at the new size and paint it with `fill`.  Prior content is
    /// dropped; restoring it is the caller's job.
    pub fn resize(&mut self, width: u32, height: u32, fill: Option<Rgba<u8>>) {
        *self = Self::new_filled(width, height, fill);
    }

    /// Serialise the full buffer.
    pub fn to_image(&self) -> Result<EncodedImage, SnapshotError> {
        io::encode_png(&self.pixels)
    }

    /// Decode `data` and install it.  On error the surface is untouched.
    pub fn from_image(&mut self, data: &[u8], fill: Option<Rgba<u8>>) -> Result<(), SnapshotError> {
        let decoded = io::decode_png(data)?;
        self.restore_decoded(&decoded, fill);
        Ok(())
    }

    /// Install an already-decoded image anchored at the origin.  Same-size
    /// images replace the buffer exactly; otherwise the surface is first
    /// painted with `fill` and the overlapping region is copied in.
    pub fn restore_decoded(&mut self, decoded: &RgbaImage, fill: Option<Rgba<u8>>) {
        if decoded.dimensions() == self.pixels.dimensions() {
            self.pixels.clone_from(decoded);
            return;
        }
        self.clear(fill);
        image::imageops::replace(&mut self.pixels, decoded, 0, 0);
    }
}

// ============================================================================
// LAYER
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a layer created after initialisation.
    pub fn generate() -> Self {
        Self(format!("layer-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    opacity: f32,
    /// Opaque layers are repainted with the canvas background on clear,
    /// resize and decode fallback; the rest go transparent.
    pub opaque: bool,
    pub surface: PixelSurface,
}

impl Layer {
    pub fn new(id: LayerId, name: String, width: u32, height: u32, background: Option<Rgba<u8>>) -> Self {
        Self {
            id,
            name,
            visible: true,
            opacity: 1.0,
            opaque: background.is_some(),
            surface: PixelSurface::new_filled(width, height, background),
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Clamp to `[0, 1]` and store.  NaN is ignored.  Returns the stored value.
    pub fn set_opacity(&mut self, opacity: f32) -> f32 {
        if opacity.is_nan() {
            log_warn!("Layer '{}': ignoring NaN opacity", self.name);
        } else {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
        self.opacity
    }

    /// Fill used when this layer is wiped.
    pub fn fill_color(&self, background: Rgba<u8>) -> Option<Rgba<u8>> {
        self.opaque.then_some(background)
    }
}

// ============================================================================
// LAYER STACK + COMPOSITOR
// ============================================================================

/// Ordered layers (index 0 = bottom) plus the transient preview overlay and
/// the last rendered frame.  Owns every surface.
#[derive(Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active_layer_index: usize,
    width: u32,
    height: u32,
    background_color: Rgba<u8>,
    /// Shape previews are drawn here, never onto a layer.
    preview_layer: PixelSurface,
    pub show_grid: bool,
    frame: RgbaImage,
}

impl LayerStack {
    /// Background / Sketch / Details with Sketch active.
    pub fn new(width: u32, height: u32, background_color: Rgba<u8>) -> Self {
        let mut stack = Self::empty(width, height, background_color);
        for (index, name) in DEFAULT_LAYER_NAMES.iter().enumerate() {
            let fill = (index == 0).then_some(background_color);
            stack.layers.push(Layer::new(
                LayerId::new(format!("layer-{}", index)),
                name.to_string(),
                stack.width,
                stack.height,
                fill,
            ));
        }
        stack.active_layer_index = DEFAULT_ACTIVE_LAYER;
        stack
    }

    /// One opaque layer: the whole-canvas drawing mode.
    pub fn single_canvas(width: u32, height: u32, background_color: Rgba<u8>) -> Self {
        let mut stack = Self::empty(width, height, background_color);
        stack.layers.push(Layer::new(
            LayerId::from(SINGLE_CANVAS_ID),
            "Canvas".to_string(),
            stack.width,
            stack.height,
            Some(background_color),
        ));
        stack
    }

    fn empty(width: u32, height: u32, background_color: Rgba<u8>) -> Self {
        let (width, height) = sanitize_dimensions(width, height);
        Self {
            layers: Vec::new(),
            active_layer_index: 0,
            width,
            height,
            background_color,
            preview_layer: PixelSurface::new(width, height),
            show_grid: false,
            frame: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn background_color(&self) -> Rgba<u8> {
        self.background_color
    }

    /// Affects later clears, resizes and fallbacks only.
    pub fn set_background_color(&mut self, color: Rgba<u8>) {
        self.background_color = color;
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|l| &l.id == id)
    }

    pub fn layer(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| &l.id == id)
    }

    pub fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| &l.id == id)
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.layers.get(self.active_layer_index)
    }

    pub fn active_layer_mut(&mut self) -> Option<&mut Layer> {
        self.layers.get_mut(self.active_layer_index)
    }

    pub fn active_layer_id(&self) -> Option<&LayerId> {
        self.active_layer().map(|l| &l.id)
    }

    pub fn set_active_layer(&mut self, id: &LayerId) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.active_layer_index = index;
                true
            }
            None => {
                log_warn!("set_active_layer: no layer '{}'", id);
                false
            }
        }
    }

    pub fn set_visibility(&mut self, id: &LayerId, visible: bool) -> bool {
        match self.layer_mut(id) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Flip visibility; returns the new state.
    pub fn toggle_visibility(&mut self, id: &LayerId) -> Option<bool> {
        let layer = self.layer_mut(id)?;
        layer.visible = !layer.visible;
        Some(layer.visible)
    }

    /// Clamped opacity actually stored, or `None` for an unknown layer.
    pub fn set_opacity(&mut self, id: &LayerId, opacity: f32) -> Option<f32> {
        self.layer_mut(id).map(|l| l.set_opacity(opacity))
    }

    /// Append a transparent layer on top of the stack.
    pub fn add_layer(&mut self, name: &str) -> LayerId {
        let id = LayerId::generate();
        self.layers.push(Layer::new(id.clone(), name.to_string(), self.width, self.height, None));
        id
    }

    /// The fill a layer is wiped to, or `None` for an unknown layer.
    pub fn fill_for(&self, id: &LayerId) -> Option<Option<Rgba<u8>>> {
        self.layer(id).map(|l| l.fill_color(self.background_color))
    }

    /// Wipe a layer back to its background.
    pub fn reset_layer(&mut self, id: &LayerId) -> bool {
        let background = self.background_color;
        match self.layer_mut(id) {
            Some(layer) => {
                let fill = layer.fill_color(background);
                layer.surface.clear(fill);
                true
            }
            None => false,
        }
    }

    /// Reallocate every surface at the new size, each painted with its
    /// background.  Content restore is the caller's job.
    pub fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = sanitize_dimensions(width, height);
        self.width = width;
        self.height = height;
        let background = self.background_color;
        for layer in &mut self.layers {
            let fill = layer.fill_color(background);
            layer.surface.resize(width, height, fill);
        }
        self.preview_layer = PixelSurface::new(width, height);
        self.frame = RgbaImage::new(width, height);
    }

    pub fn preview(&self) -> &PixelSurface {
        &self.preview_layer
    }

    pub fn preview_mut(&mut self) -> &mut PixelSurface {
        &mut self.preview_layer
    }

    pub fn clear_preview(&mut self) {
        self.preview_layer.clear(None);
    }

    /// Visible layers, bottom to top, at their opacity.  This is the export
    /// image: no grid, no preview.
    pub fn composite(&self) -> RgbaImage {
        let mut result = RgbaImage::new(self.width, self.height);
        let sources: Vec<(&RgbaImage, f32)> = self
            .layers
            .iter()
            .filter(|l| l.visible && l.opacity > 0.0)
            .filter_map(|l| {
                if l.surface.dimensions() == (self.width, self.height) {
                    Some((l.surface.pixels(), l.opacity))
                } else {
                    log_err!(
                        "composite: layer '{}' is {:?}, canvas is {}×{}; skipped",
                        l.name,
                        l.surface.dimensions(),
                        self.width,
                        self.height
                    );
                    None
                }
            })
            .collect();
        if sources.is_empty() {
            return result;
        }

        let row_bytes = self.width as usize * 4;
        let raw: &mut [u8] = result.as_mut();
        raw.par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                let start = y * row_bytes;
                for (src, opacity) in &sources {
                    let src_row = &src.as_raw()[start..start + row_bytes];
                    for (dst, top) in row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                        let base = Rgba([dst[0], dst[1], dst[2], dst[3]]);
                        let top = Rgba([top[0], top[1], top[2], top[3]]);
                        dst.copy_from_slice(&blend_over(base, top, *opacity).0);
                    }
                }
            });
        result
    }

    /// Rebuild the visible frame: composite, grid overlay, then the shape preview.
    pub fn render_frame(&mut self) -> &RgbaImage {
        let mut frame = self.composite();
        if self.show_grid {
            draw_grid(&mut frame);
        }
        for (dst, src) in frame.pixels_mut().zip(self.preview_layer.pixels().pixels()) {
            if src[3] != 0 {
                *dst = blend_over(*dst, *src, 1.0);
            }
        }
        self.frame = frame;
        &self.frame
    }

    /// The frame produced by the last `render_frame`.
    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }
}

fn draw_grid(frame: &mut RgbaImage) {
    let (w, h) = frame.dimensions();
    let step = GRID_SPACING as usize;
    // Lines sit on integer coordinates 0..=size, straddling two pixels.
    for x in (0..=w).step_by(step) {
        for col in [x.checked_sub(1), Some(x)].into_iter().flatten().filter(|&c| c < w) {
            for y in 0..h {
                let px = frame.get_pixel_mut(col, y);
                *px = blend_over(*px, GRID_COLOR, GRID_LINE_COVERAGE);
            }
        }
    }
    for y in (0..=h).step_by(step) {
        for row in [y.checked_sub(1), Some(y)].into_iter().flatten().filter(|&r| r < h) {
            for x in 0..w {
                let px = frame.get_pixel_mut(x, row);
                *px = blend_over(*px, GRID_COLOR, GRID_LINE_COVERAGE);
            }
        }
    }
}
