//! The session logger is process-global, so it gets its own test binary.

use egui::Pos2;
use sketchpad::{Project, logger};

#[test]
fn session_log_records_absorbed_failures() {
    let dir = std::env::temp_dir().join(format!("sketchpad-log-{}", uuid::Uuid::new_v4()));
    let path = dir.join("session.log");
    assert!(logger::init_at(&path));
    assert!(!logger::init_at(&path));
    assert_eq!(logger::log_path(), Some(&path));

    let mut p = Project::default();
    assert!(!p.set_color_hex("not-a-color"));
    assert!(p.pointer_down(Pos2::new(10.0, 10.0)));
    assert!(p.pointer_up(None));

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("=== Sketchpad session started"));
    assert!(content.contains("[WARN] set_color: rejected 'not-a-color'"));
    assert!(content.contains("[INFO] Pen Stroke on 'layer-1'"));
    let _ = std::fs::remove_dir_all(&dir);
}
