use std::collections::HashMap;

use egui::{Key, Modifiers};

// ============================================================================
// KEY COMBOS
// ============================================================================

/// A key plus modifier flags.  `ctrl` also matches Cmd on macOS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyCombo {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: Key,
}

impl KeyCombo {
    pub fn key(k: Key) -> Self {
        Self { ctrl: false, shift: false, alt: false, key: k }
    }
    pub fn ctrl_key(k: Key) -> Self {
        Self { ctrl: true, shift: false, alt: false, key: k }
    }
    pub fn ctrl_shift_key(k: Key) -> Self {
        Self { ctrl: true, shift: true, alt: false, key: k }
    }

    /// Human-readable form, e.g. `Ctrl+Shift+Z`.
    pub fn display(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl { parts.push("Ctrl"); }
        if self.shift { parts.push("Shift"); }
        if self.alt { parts.push("Alt"); }
        parts.push(key_name(self.key));
        parts.join("+")
    }

    /// Serialize to config string, e.g. `ctrl+shift+key:Z`.
    pub fn to_config_string(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl { parts.push("ctrl".to_string()); }
        if self.shift { parts.push("shift".to_string()); }
        if self.alt { parts.push("alt".to_string()); }
        parts.push(format!("key:{}", key_name(self.key)));
        parts.join("+")
    }

    pub fn from_config_string(s: &str) -> Option<Self> {
        let (mut ctrl, mut shift, mut alt, mut key) = (false, false, false, None);
        for part in s.split('+') {
            match part.trim() {
                "ctrl" => ctrl = true,
                "shift" => shift = true,
                "alt" => alt = true,
                other => {
                    if let Some(name) = other.strip_prefix("key:") {
                        key = parse_key_name(name);
                    }
                }
            }
        }
        key.map(|key| Self { ctrl, shift, alt, key })
    }

    /// Exact match on shift/alt; ctrl is satisfied by Ctrl or Cmd.
    pub fn matches(&self, key: Key, modifiers: Modifiers) -> bool {
        let ctrl_down = modifiers.ctrl || modifiers.command || modifiers.mac_cmd;
        self.key == key
            && self.ctrl == ctrl_down
            && self.shift == modifiers.shift
            && self.alt == modifiers.alt
    }
}

// ============================================================================
// ACTIONS + BINDING MAP
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindableAction {
    Undo,
    Redo,
    ToolPen,
    ToolEraser,
    ToolHighlighter,
    ToolShapes,
    /// Handed back to the shell; the engine has no toolbar.
    ToggleToolbar,
}

impl BindableAction {
    pub fn all() -> &'static [BindableAction] {
        &[
            BindableAction::Undo,
            BindableAction::Redo,
            BindableAction::ToolPen,
            BindableAction::ToolEraser,
            BindableAction::ToolHighlighter,
            BindableAction::ToolShapes,
            BindableAction::ToggleToolbar,
        ]
    }

    /// Name used in `keybind.<Name>=` config lines.
    pub fn config_name(&self) -> &'static str {
        match self {
            BindableAction::Undo => "Undo",
            BindableAction::Redo => "Redo",
            BindableAction::ToolPen => "ToolPen",
            BindableAction::ToolEraser => "ToolEraser",
            BindableAction::ToolHighlighter => "ToolHighlighter",
            BindableAction::ToolShapes => "ToolShapes",
            BindableAction::ToggleToolbar => "ToggleToolbar",
        }
    }

    pub fn from_config_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|a| a.config_name() == name)
    }
}

/// Action → combos.  An action may have several combos (redo has two).
#[derive(Clone, Debug, PartialEq)]
pub struct KeyBindings {
    pub bindings: HashMap<BindableAction, Vec<KeyCombo>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        use BindableAction::*;
        let mut map = HashMap::new();
        map.insert(Undo,            vec![KeyCombo::ctrl_key(Key::Z)]);
        map.insert(Redo,            vec![KeyCombo::ctrl_shift_key(Key::Z), KeyCombo::ctrl_key(Key::Y)]);
        map.insert(ToolPen,         vec![KeyCombo::key(Key::P)]);
        map.insert(ToolEraser,      vec![KeyCombo::key(Key::E)]);
        map.insert(ToolHighlighter, vec![KeyCombo::key(Key::H)]);
        map.insert(ToolShapes,      vec![KeyCombo::key(Key::S)]);
        map.insert(ToggleToolbar,   vec![KeyCombo::key(Key::T)]);
        Self { bindings: map }
    }
}

impl KeyBindings {
    pub fn get(&self, action: BindableAction) -> &[KeyCombo] {
        self.bindings.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace every combo bound to `action`.
    pub fn set(&mut self, action: BindableAction, combos: Vec<KeyCombo>) {
        self.bindings.insert(action, combos);
    }

    /// First action (in declaration order) bound to this key press.
    pub fn resolve(&self, key: Key, modifiers: Modifiers) -> Option<BindableAction> {
        BindableAction::all()
            .iter()
            .copied()
            .find(|a| self.get(*a).iter().any(|c| c.matches(key, modifiers)))
    }

    /// One `keybind.<Action>=combo|combo` line per bound action.
    pub fn to_config_lines(&self) -> Vec<String> {
        BindableAction::all()
            .iter()
            .filter_map(|action| {
                let combos = self.bindings.get(action)?;
                let joined: Vec<String> = combos.iter().map(KeyCombo::to_config_string).collect();
                Some(format!("keybind.{}={}", action.config_name(), joined.join("|")))
            })
            .collect()
    }

    /// Apply one config line.  Unknown actions and unparsable combos are
    /// skipped; returns whether the binding changed.
    pub fn load_config_line(&mut self, action_name: &str, combo_str: &str) -> bool {
        let Some(action) = BindableAction::from_config_name(action_name) else {
            return false;
        };
        let combos: Vec<KeyCombo> = combo_str
            .split('|')
            .filter_map(KeyCombo::from_config_string)
            .collect();
        if combos.is_empty() {
            return false;
        }
        self.bindings.insert(action, combos);
        true
    }
}

// ============================================================================
// KEY NAMES
// ============================================================================

const KEY_NAMES: &[(Key, &str)] = &[
    (Key::ArrowDown, "Down"),
    (Key::ArrowLeft, "Left"),
    (Key::ArrowRight, "Right"),
    (Key::ArrowUp, "Up"),
    (Key::Escape, "Esc"),
    (Key::Tab, "Tab"),
    (Key::Backspace, "Backspace"),
    (Key::Enter, "Enter"),
    (Key::Space, "Space"),
    (Key::Delete, "Delete"),
    (Key::Home, "Home"),
    (Key::End, "End"),
    (Key::Minus, "-"),
    (Key::PlusEquals, "+"),
    (Key::Num0, "0"), (Key::Num1, "1"), (Key::Num2, "2"), (Key::Num3, "3"), (Key::Num4, "4"),
    (Key::Num5, "5"), (Key::Num6, "6"), (Key::Num7, "7"), (Key::Num8, "8"), (Key::Num9, "9"),
    (Key::A, "A"), (Key::B, "B"), (Key::C, "C"), (Key::D, "D"), (Key::E, "E"), (Key::F, "F"),
    (Key::G, "G"), (Key::H, "H"), (Key::I, "I"), (Key::J, "J"), (Key::K, "K"), (Key::L, "L"),
    (Key::M, "M"), (Key::N, "N"), (Key::O, "O"), (Key::P, "P"), (Key::Q, "Q"), (Key::R, "R"),
    (Key::S, "S"), (Key::T, "T"), (Key::U, "U"), (Key::V, "V"), (Key::W, "W"), (Key::X, "X"),
    (Key::Y, "Y"), (Key::Z, "Z"),
];

fn key_name(k: Key) -> &'static str {
    KEY_NAMES
        .iter()
        .find(|(key, _)| *key == k)
        .map(|(_, name)| *name)
        .unwrap_or("?")
}

fn parse_key_name(s: &str) -> Option<Key> {
    KEY_NAMES.iter().find(|(_, name)| *name == s).map(|(key, _)| *key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl() -> Modifiers {
        Modifiers { ctrl: true, command: true, ..Default::default() }
    }

    #[test]
    fn default_shortcuts_resolve() {
        let kb = KeyBindings::default();
        assert_eq!(kb.resolve(Key::Z, ctrl()), Some(BindableAction::Undo));
        assert_eq!(
            kb.resolve(Key::Z, Modifiers { shift: true, ..ctrl() }),
            Some(BindableAction::Redo)
        );
        assert_eq!(kb.resolve(Key::Y, ctrl()), Some(BindableAction::Redo));
        assert_eq!(kb.resolve(Key::P, Modifiers::NONE), Some(BindableAction::ToolPen));
        assert_eq!(kb.resolve(Key::T, Modifiers::NONE), Some(BindableAction::ToggleToolbar));
    }

    #[test]
    fn cmd_counts_as_ctrl() {
        let kb = KeyBindings::default();
        let cmd = Modifiers { mac_cmd: true, command: true, ..Default::default() };
        assert_eq!(kb.resolve(Key::Z, cmd), Some(BindableAction::Undo));
    }

    #[test]
    fn modifiers_must_match() {
        let kb = KeyBindings::default();
        assert_eq!(kb.resolve(Key::Z, Modifiers::NONE), None);
        assert_eq!(kb.resolve(Key::P, ctrl()), None);
        assert_eq!(kb.resolve(Key::P, Modifiers::SHIFT), None);
    }

    #[test]
    fn combo_config_round_trip() {
        let combo = KeyCombo::ctrl_shift_key(Key::Z);
        assert_eq!(combo.to_config_string(), "ctrl+shift+key:Z");
        assert_eq!(KeyCombo::from_config_string("ctrl+shift+key:Z"), Some(combo));
        assert_eq!(combo.display(), "Ctrl+Shift+Z");
        assert_eq!(KeyCombo::from_config_string("ctrl+shift"), None);
    }

    #[test]
    fn config_lines_rebind() {
        let mut kb = KeyBindings::default();
        let lines = kb.to_config_lines();
        assert!(lines.contains(&"keybind.Redo=ctrl+shift+key:Z|ctrl+key:Y".to_string()));

        assert!(kb.load_config_line("ToolPen", "key:B"));
        assert_eq!(kb.resolve(Key::B, Modifiers::NONE), Some(BindableAction::ToolPen));
        assert_eq!(kb.resolve(Key::P, Modifiers::NONE), None);

        assert!(!kb.load_config_line("ToolLasso", "key:L"));
        assert!(!kb.load_config_line("Undo", "key:Nope"));
        assert_eq!(kb.get(BindableAction::Undo), &[KeyCombo::ctrl_key(Key::Z)]);
    }
}
