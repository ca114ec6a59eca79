// ============================================================================
// OPS - CPU rasterisers used by the pixel surfaces
// ============================================================================
//
//   stroke.rs: pixel blending, distance helpers, round-capped segments
//   shapes.rs: rectangle / circle / triangle outlines from two anchors
// ============================================================================

pub mod shapes;
pub mod stroke;
