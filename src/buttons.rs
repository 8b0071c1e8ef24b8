//! Mouse button to gamepad button remapping
//!
//! Bindings are written by name in the config file (`"left"`, `"south"`,
//! `"BTN_EXTRA"`) or as raw evdev key codes, and serialize back as the
//! canonical name.

use crate::error::BridgeError;
use evdev::Key;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{HashMap, HashSet};

/// Known button names. The first name listed for a code is canonical.
const BUTTON_NAMES: &[(&str, Key)] = &[
    // Mouse
    ("left", Key::BTN_LEFT),
    ("right", Key::BTN_RIGHT),
    ("middle", Key::BTN_MIDDLE),
    ("side", Key::BTN_SIDE),
    ("extra", Key::BTN_EXTRA),
    ("forward", Key::BTN_FORWARD),
    ("back", Key::BTN_BACK),
    ("task", Key::BTN_TASK),
    // Gamepad
    ("south", Key::BTN_SOUTH),
    ("a", Key::BTN_SOUTH),
    ("east", Key::BTN_EAST),
    ("b", Key::BTN_EAST),
    ("north", Key::BTN_NORTH),
    ("x", Key::BTN_NORTH),
    ("west", Key::BTN_WEST),
    ("y", Key::BTN_WEST),
    ("tl", Key::BTN_TL),
    ("lb", Key::BTN_TL),
    ("tr", Key::BTN_TR),
    ("rb", Key::BTN_TR),
    ("select", Key::BTN_SELECT),
    ("start", Key::BTN_START),
    ("mode", Key::BTN_MODE),
    ("thumbl", Key::BTN_THUMBL),
    ("thumbr", Key::BTN_THUMBR),
];

/// Resolve a button name or numeric code to an evdev key code
///
/// Names are case-insensitive and may carry a `BTN_` prefix.
pub fn button_code_from_name(name: &str) -> Option<u16> {
    let trimmed = name.trim();
    if let Ok(code) = trimmed.parse::<u16>() {
        return Some(code);
    }
    let lower = trimmed.to_ascii_lowercase();
    let bare = lower.strip_prefix("btn_").unwrap_or(lower.as_str());
    BUTTON_NAMES
        .iter()
        .find(|(n, _)| *n == bare)
        .map(|(_, key)| key.code())
}

/// Canonical name for a key code, if it has one
pub fn button_name(code: u16) -> Option<&'static str> {
    BUTTON_NAMES
        .iter()
        .find(|(_, key)| key.code() == code)
        .map(|(n, _)| *n)
}

fn serialize_button<S: Serializer>(code: &u16, s: S) -> Result<S::Ok, S::Error> {
    match button_name(*code) {
        Some(name) => s.serialize_str(name),
        None => s.serialize_u16(*code),
    }
}

fn deserialize_button<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ButtonRepr {
        Code(u16),
        Name(String),
    }

    match ButtonRepr::deserialize(d)? {
        ButtonRepr::Code(code) => Ok(code),
        ButtonRepr::Name(name) => button_code_from_name(&name).ok_or_else(|| {
            serde::de::Error::custom(format!("unknown button name: \"{name}\""))
        }),
    }
}

/// One mouse button routed to one gamepad button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonBinding {
    #[serde(
        serialize_with = "serialize_button",
        deserialize_with = "deserialize_button"
    )]
    pub mouse: u16,
    #[serde(
        serialize_with = "serialize_button",
        deserialize_with = "deserialize_button"
    )]
    pub gamepad: u16,
}

impl ButtonBinding {
    pub fn new(mouse: Key, gamepad: Key) -> Self {
        Self {
            mouse: mouse.code(),
            gamepad: gamepad.code(),
        }
    }
}

/// Left click is A, right click is B
pub fn default_bindings() -> Vec<ButtonBinding> {
    vec![
        ButtonBinding::new(Key::BTN_LEFT, Key::BTN_SOUTH),
        ButtonBinding::new(Key::BTN_RIGHT, Key::BTN_EAST),
    ]
}

/// Immutable physical-to-virtual button table
#[derive(Debug, Clone)]
pub struct ButtonMap {
    table: HashMap<u16, u16>,
}

impl ButtonMap {
    /// Build the table, rejecting a mouse button bound twice or two mouse
    /// buttons sharing one gamepad button
    pub fn new(bindings: &[ButtonBinding]) -> Result<Self, BridgeError> {
        let mut table = HashMap::with_capacity(bindings.len());
        let mut targets = HashSet::with_capacity(bindings.len());
        for binding in bindings {
            if table.insert(binding.mouse, binding.gamepad).is_some() {
                return Err(BridgeError::Config(format!(
                    "mouse button {} is bound more than once",
                    display_code(binding.mouse)
                )));
            }
            if !targets.insert(binding.gamepad) {
                return Err(BridgeError::Config(format!(
                    "gamepad button {} is bound more than once",
                    display_code(binding.gamepad)
                )));
            }
        }
        Ok(Self { table })
    }

    /// Gamepad code for a mouse button; `None` means drop the event
    pub fn lookup(&self, mouse_code: u16) -> Option<u16> {
        self.table.get(&mouse_code).copied()
    }

    /// Gamepad buttons the virtual device must advertise
    pub fn gamepad_buttons(&self) -> Vec<u16> {
        let mut codes: Vec<u16> = self.table.values().copied().collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for ButtonMap {
    fn default() -> Self {
        let table = default_bindings()
            .iter()
            .map(|b| (b.mouse, b.gamepad))
            .collect();
        Self { table }
    }
}

fn display_code(code: u16) -> String {
    match button_name(code) {
        Some(name) => format!("\"{name}\""),
        None => code.to_string(),
    }
}
