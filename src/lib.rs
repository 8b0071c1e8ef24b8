//! Mouse-to-Gamepad Bridge
//!
//! Reads a Linux mouse through evdev and drives the left stick and face
//! buttons of a uinput virtual gamepad.

pub mod buttons;
pub mod config;
pub mod error;
pub mod gamepad;
pub mod mapper;
pub mod source;
pub mod translate;

pub use buttons::{ButtonBinding, ButtonMap};
pub use config::BridgeConfig;
pub use error::BridgeError;
pub use gamepad::{clamp_axis, FrameWriter, GamepadOutput, GamepadSpec, VirtualGamepad};
pub use mapper::{transform, Axis, Sensitivity, StickPosition, StickState};
pub use source::{DeviceSummary, EventClass, EventSource, MouseSource, SourceEvent};
pub use translate::{LoopState, RunSummary, Translator};
