// ============================================================================
// COMPONENTS - stateful pieces driven by pointer and keyboard input
// ============================================================================
//
//   history.rs: per-domain undo/redo of PNG snapshots
//   tools.rs:   drawing configuration and the stroke state machine
// ============================================================================

pub mod history;
pub mod tools;
