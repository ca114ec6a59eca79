use std::fmt;
use std::str::FromStr;

use egui::Color32;
use image::Rgba;

use crate::canvas::{LayerId, LayerStack, Point};
use crate::ops::shapes::ShapeKind;
use crate::ops::stroke::StrokeStyle;

pub const MIN_BRUSH_SIZE: f32 = 1.0;
pub const MAX_BRUSH_SIZE: f32 = 50.0;
pub const DEFAULT_BRUSH_SIZE: f32 = 4.0;

/// Shape preview: fainter than the committed outline, and dashed.
pub const PREVIEW_ALPHA: f32 = 0.8;
pub const PREVIEW_DASH: [f32; 2] = [5.0, 5.0];

/// Preset swatches offered next to the free color input.
pub const PALETTE: [Color32; 12] = [
    Color32::from_rgb(0x00, 0x00, 0x00),
    Color32::from_rgb(0xFF, 0xFF, 0xFF),
    Color32::from_rgb(0xFF, 0x3B, 0x30),
    Color32::from_rgb(0xFF, 0x95, 0x00),
    Color32::from_rgb(0xFF, 0xCC, 0x02),
    Color32::from_rgb(0x34, 0xC7, 0x59),
    Color32::from_rgb(0x00, 0x7A, 0xFF),
    Color32::from_rgb(0x58, 0x56, 0xD6),
    Color32::from_rgb(0xAF, 0x52, 0xDE),
    Color32::from_rgb(0xFF, 0x2D, 0x92),
    Color32::from_rgb(0xA2, 0x84, 0x5E),
    Color32::from_rgb(0x8E, 0x8E, 0x93),
];

// ============================================================================
// TOOL ENUMS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Tool {
    #[default]
    Pen,
    Eraser,
    Highlighter,
    Shapes,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Pen => "pen",
            Tool::Eraser => "eraser",
            Tool::Highlighter => "highlighter",
            Tool::Shapes => "shapes",
        }
    }

    pub fn all() -> &'static [Tool] {
        &[Tool::Pen, Tool::Eraser, Tool::Highlighter, Tool::Shapes]
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::all()
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown tool '{}'", s))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PenVariant {
    #[default]
    Normal,
    Marker,
    Highlighter,
}

impl PenVariant {
    pub fn name(&self) -> &'static str {
        match self {
            PenVariant::Normal => "normal",
            PenVariant::Marker => "marker",
            PenVariant::Highlighter => "highlighter",
        }
    }

    pub fn all() -> &'static [PenVariant] {
        &[PenVariant::Normal, PenVariant::Marker, PenVariant::Highlighter]
    }
}

impl fmt::Display for PenVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PenVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PenVariant::all()
            .iter()
            .copied()
            .find(|v| v.name() == s)
            .ok_or_else(|| format!("unknown pen variant '{}'", s))
    }
}

// ============================================================================
// COLORS
// ============================================================================

/// Parse `#rrggbb` (the `#` is optional).
pub fn parse_hex_color(s: &str) -> Option<Color32> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let val = u32::from_str_radix(hex, 16).ok()?;
    Some(Color32::from_rgb(
        ((val >> 16) & 0xFF) as u8,
        ((val >> 8) & 0xFF) as u8,
        (val & 0xFF) as u8,
    ))
}

pub fn color_to_hex(color: Color32) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b())
}

pub fn color_to_rgba(color: Color32) -> Rgba<u8> {
    Rgba([color.r(), color.g(), color.b(), color.a()])
}

// ============================================================================
// TOOL PROPERTIES - the current drawing configuration
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct ToolProperties {
    pub tool: Tool,
    pub color: Color32,
    size: f32,
    pub pen_variant: PenVariant,
    pub shape: ShapeKind,
}

impl Default for ToolProperties {
    fn default() -> Self {
        Self {
            tool: Tool::Pen,
            color: Color32::BLACK,
            size: DEFAULT_BRUSH_SIZE,
            pen_variant: PenVariant::Normal,
            shape: ShapeKind::Rectangle,
        }
    }
}

impl ToolProperties {
    pub fn size(&self) -> f32 {
        self.size
    }

    /// Clamp to the brush range and store.  NaN is ignored.
    pub fn set_size(&mut self, size: f32) -> f32 {
        if size.is_nan() {
            log_warn!("ToolProperties: ignoring NaN brush size");
        } else {
            self.size = size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE);
        }
        self.size
    }

    /// Style a gesture commits with.
    pub fn stroke_style(&self) -> StrokeStyle {
        let color = color_to_rgba(self.color);
        let size = self.size;
        match self.tool {
            Tool::Pen => match self.pen_variant {
                PenVariant::Normal => StrokeStyle::solid(color, size, 1.0),
                PenVariant::Marker => StrokeStyle::solid(color, size * 1.5, 0.9),
                PenVariant::Highlighter => StrokeStyle::solid(color, size * 2.5, 0.4),
            },
            Tool::Highlighter => StrokeStyle::solid(color, size * 2.0, 0.4),
            Tool::Eraser => StrokeStyle::eraser(size),
            Tool::Shapes => StrokeStyle::solid(color, size, 1.0),
        }
    }

    /// Style of the transient shape preview.
    pub fn preview_style(&self) -> StrokeStyle {
        StrokeStyle::solid(color_to_rgba(self.color), self.size, PREVIEW_ALPHA)
            .with_dash(PREVIEW_DASH[0], PREVIEW_DASH[1])
    }

    pub fn description(&self) -> &'static str {
        match self.tool {
            Tool::Pen => match self.pen_variant {
                PenVariant::Normal => "Pen Stroke",
                PenVariant::Marker => "Marker Stroke",
                PenVariant::Highlighter => "Highlighter Pen Stroke",
            },
            Tool::Highlighter => "Highlighter Stroke",
            Tool::Eraser => "Eraser Stroke",
            Tool::Shapes => self.shape.label(),
        }
    }
}

// ============================================================================
// STROKE ENGINE - pointer gesture state machine
// ============================================================================

#[derive(Clone, Debug)]
enum GestureKind {
    Freehand {
        last: Point,
    },
    /// Previewing: the committed surface is untouched until release.
    Shape {
        anchor: Point,
        current: Point,
        kind: ShapeKind,
        preview: StrokeStyle,
    },
}

/// Everything read from the configuration at pointer-down, frozen until release.
#[derive(Clone, Debug)]
struct Gesture {
    layer_id: LayerId,
    style: StrokeStyle,
    kind: GestureKind,
    description: &'static str,
}

/// Emitted when a gesture completes; the caller snapshots `layer_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeEvent {
    pub layer_id: LayerId,
    pub description: String,
}

#[derive(Debug, Default)]
pub struct StrokeEngine {
    gesture: Option<Gesture>,
}

impl StrokeEngine {
    pub fn is_drawing(&self) -> bool {
        self.gesture.is_some()
    }

    /// Layer the current gesture paints on.
    pub fn target_layer(&self) -> Option<&LayerId> {
        self.gesture.as_ref().map(|g| &g.layer_id)
    }

    /// Idle → Drawing.  Freezes the style and target layer.
    pub fn pointer_down(&mut self, point: Point, props: &ToolProperties, stack: &mut LayerStack) -> bool {
        if self.gesture.is_some() {
            log_warn!("StrokeEngine: pointer down while a gesture is open, ignored");
            return false;
        }
        let Some(layer_id) = stack.active_layer_id().cloned() else {
            log_warn!("StrokeEngine: no active layer");
            return false;
        };

        let kind = if props.tool == Tool::Shapes {
            stack.clear_preview();
            GestureKind::Shape {
                anchor: point,
                current: point,
                kind: props.shape,
                preview: props.preview_style(),
            }
        } else {
            GestureKind::Freehand { last: point }
        };

        self.gesture = Some(Gesture {
            layer_id,
            style: props.stroke_style(),
            kind,
            description: props.description(),
        });
        true
    }

    /// Extend the freehand path or redraw the shape preview.
    pub fn pointer_move(&mut self, point: Point, stack: &mut LayerStack) -> bool {
        let Some(gesture) = self.gesture.as_mut() else {
            return false;
        };
        match &mut gesture.kind {
            GestureKind::Freehand { last } => {
                let from = *last;
                *last = point;
                let Some(layer) = stack.layer_mut(&gesture.layer_id) else {
                    log_warn!("StrokeEngine: layer '{}' vanished mid-stroke", gesture.layer_id);
                    return false;
                };
                layer.surface.stroke_segment(from, point, &gesture.style);
            }
            GestureKind::Shape {
                anchor,
                current,
                kind,
                preview,
            } => {
                *current = point;
                stack.clear_preview();
                stack.preview_mut().draw_shape_outline(*anchor, point, *kind, preview);
            }
        }
        true
    }

    pub fn pointer_up(&mut self, point: Option<Point>, stack: &mut LayerStack) -> Option<StrokeEvent> {
        self.finish(point, stack)
    }

    /// Leaving the canvas finalises exactly like a release.
    pub fn pointer_leave(&mut self, point: Option<Point>, stack: &mut LayerStack) -> Option<StrokeEvent> {
        self.finish(point, stack)
    }

    /// Drawing → Idle.  Shapes commit one outline from the anchor to `point`
    /// (or the last move position).  Idle calls return `None`.
    fn finish(&mut self, point: Option<Point>, stack: &mut LayerStack) -> Option<StrokeEvent> {
        let gesture = self.gesture.take()?;

        if let GestureKind::Shape {
            anchor,
            current,
            kind,
            ..
        } = gesture.kind
        {
            stack.clear_preview();
            let end = point.unwrap_or(current);
            match stack.layer_mut(&gesture.layer_id) {
                Some(layer) => {
                    layer.surface.draw_shape_outline(anchor, end, kind, &gesture.style);
                }
                None => {
                    log_warn!("StrokeEngine: layer '{}' vanished before commit", gesture.layer_id);
                    return None;
                }
            }
        }

        log_info!("{} on '{}'", gesture.description, gesture.layer_id);
        Some(StrokeEvent {
            layer_id: gesture.layer_id,
            description: gesture.description.to_string(),
        })
    }

    /// Drop the gesture without committing anything further.
    pub fn cancel(&mut self, stack: &mut LayerStack) {
        if self.gesture.take().is_some() {
            stack.clear_preview();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Pos2;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn stack() -> LayerStack {
        LayerStack::new(80, 60, WHITE)
    }

    fn sketch(stack: &LayerStack) -> &crate::canvas::PixelSurface {
        &stack.layer(&LayerId::from("layer-1")).unwrap().surface
    }

    #[test]
    fn style_table() {
        let mut props = ToolProperties::default();
        props.set_size(10.0);

        let s = props.stroke_style();
        assert_eq!((s.width, s.alpha), (10.0, 1.0));

        props.pen_variant = PenVariant::Marker;
        let s = props.stroke_style();
        assert_eq!((s.width, s.alpha), (15.0, 0.9));

        props.pen_variant = PenVariant::Highlighter;
        let s = props.stroke_style();
        assert_eq!((s.width, s.alpha), (25.0, 0.4));

        props.tool = Tool::Highlighter;
        let s = props.stroke_style();
        assert_eq!((s.width, s.alpha), (20.0, 0.4));

        props.tool = Tool::Eraser;
        let s = props.stroke_style();
        assert_eq!(s.width, 10.0);
        assert_eq!(s.compositing, crate::ops::stroke::Compositing::Erase);

        props.tool = Tool::Shapes;
        assert_eq!(props.stroke_style().alpha, 1.0);
        let p = props.preview_style();
        assert_eq!(p.alpha, PREVIEW_ALPHA);
        assert_eq!(p.dash, Some(PREVIEW_DASH));
    }

    #[test]
    fn brush_size_is_clamped() {
        let mut props = ToolProperties::default();
        assert_eq!(props.size(), DEFAULT_BRUSH_SIZE);
        assert_eq!(props.set_size(0.0), MIN_BRUSH_SIZE);
        assert_eq!(props.set_size(500.0), MAX_BRUSH_SIZE);
        assert_eq!(props.set_size(f32::NAN), MAX_BRUSH_SIZE);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#FF3B30"), Some(Color32::from_rgb(255, 59, 48)));
        assert_eq!(parse_hex_color("007aff"), Some(Color32::from_rgb(0, 122, 255)));
        assert_eq!(parse_hex_color("#12345"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
        assert_eq!(color_to_hex(PALETTE[2]), "#ff3b30");
    }

    #[test]
    fn names_parse() {
        assert_eq!("eraser".parse::<Tool>(), Ok(Tool::Eraser));
        assert_eq!("marker".parse::<PenVariant>(), Ok(PenVariant::Marker));
        assert!("brush".parse::<Tool>().is_err());
    }

    #[test]
    fn freehand_gesture_paints_active_layer() {
        let mut stack = stack();
        let mut engine = StrokeEngine::default();
        let props = ToolProperties::default();

        assert!(engine.pointer_down(Pos2::new(10.0, 30.0), &props, &mut stack));
        assert!(engine.is_drawing());
        engine.pointer_move(Pos2::new(40.0, 30.0), &mut stack);
        engine.pointer_move(Pos2::new(70.0, 30.0), &mut stack);
        let event = engine.pointer_up(Some(Pos2::new(70.0, 30.0)), &mut stack).unwrap();

        assert_eq!(event.layer_id, LayerId::from("layer-1"));
        assert_eq!(event.description, "Pen Stroke");
        assert_eq!(sketch(&stack).get_pixel(50, 29)[3], 255);
        assert!(!engine.is_drawing());
    }

    #[test]
    fn release_while_idle_is_noop() {
        let mut stack = stack();
        let mut engine = StrokeEngine::default();
        assert!(engine.pointer_up(None, &mut stack).is_none());
        assert!(engine.pointer_leave(Some(Pos2::new(1.0, 1.0)), &mut stack).is_none());
        assert!(!engine.pointer_move(Pos2::new(5.0, 5.0), &mut stack));
    }

    #[test]
    fn style_is_frozen_for_the_gesture() {
        let mut stack = stack();
        let mut engine = StrokeEngine::default();
        let mut props = ToolProperties::default();
        engine.pointer_down(Pos2::new(10.0, 30.0), &props, &mut stack);
        props.tool = Tool::Eraser;
        props.color = Color32::RED;
        engine.pointer_move(Pos2::new(50.0, 30.0), &mut stack);
        engine.pointer_up(None, &mut stack);
        assert_eq!(sketch(&stack).get_pixel(30, 29), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn active_layer_change_mid_gesture_keeps_target() {
        let mut stack = stack();
        let mut engine = StrokeEngine::default();
        engine.pointer_down(Pos2::new(10.0, 30.0), &ToolProperties::default(), &mut stack);
        stack.set_active_layer(&LayerId::from("layer-2"));
        engine.pointer_move(Pos2::new(50.0, 30.0), &mut stack);
        let event = engine.pointer_leave(None, &mut stack).unwrap();
        assert_eq!(event.layer_id, LayerId::from("layer-1"));
        assert!(stack.layer(&LayerId::from("layer-2")).unwrap().surface.is_blank());
    }

    #[test]
    fn shape_previews_then_commits_once() {
        let mut stack = stack();
        let mut engine = StrokeEngine::default();
        let props = ToolProperties {
            tool: Tool::Shapes,
            ..Default::default()
        };

        engine.pointer_down(Pos2::new(10.0, 10.0), &props, &mut stack);
        engine.pointer_move(Pos2::new(30.0, 20.0), &mut stack);
        engine.pointer_move(Pos2::new(50.0, 30.0), &mut stack);
        assert!(sketch(&stack).is_blank());
        assert!(!stack.preview().is_blank());

        let event = engine.pointer_up(Some(Pos2::new(50.0, 30.0)), &mut stack).unwrap();
        assert_eq!(event.description, "Rectangle");
        assert!(stack.preview().is_blank());
        // Top edge of the committed rectangle, solid.
        assert_eq!(sketch(&stack).get_pixel(12, 9)[3], 255);
        // Right edge at x=50; nothing remains of the intermediate preview at x=30.
        assert_eq!(sketch(&stack).get_pixel(49, 25)[3], 255);
        assert_eq!(sketch(&stack).get_pixel(30, 15)[3], 0);
    }

    #[test]
    fn shape_leave_commits_at_last_position() {
        let mut stack = stack();
        let mut engine = StrokeEngine::default();
        let props = ToolProperties {
            tool: Tool::Shapes,
            shape: ShapeKind::Circle,
            ..Default::default()
        };
        engine.pointer_down(Pos2::new(40.0, 30.0), &props, &mut stack);
        engine.pointer_move(Pos2::new(60.0, 30.0), &mut stack);
        assert!(engine.pointer_leave(None, &mut stack).is_some());
        assert_eq!(sketch(&stack).get_pixel(59, 29)[3], 255);
        assert!(stack.preview().is_blank());
    }

    #[test]
    fn cancel_clears_preview() {
        let mut stack = stack();
        let mut engine = StrokeEngine::default();
        let props = ToolProperties {
            tool: Tool::Shapes,
            ..Default::default()
        };
        engine.pointer_down(Pos2::new(10.0, 10.0), &props, &mut stack);
        engine.pointer_move(Pos2::new(30.0, 30.0), &mut stack);
        engine.cancel(&mut stack);
        assert!(!engine.is_drawing());
        assert!(stack.preview().is_blank());
        assert!(sketch(&stack).is_blank());
    }
}
