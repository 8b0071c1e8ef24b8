//! Physical mouse input: discovery and event reading

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use evdev::{Device, EventStream, EventType, InputEvent, Key, RelativeAxisType};
use tracing::{debug, info};

use crate::error::BridgeError;

/// Event classes the bridge distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    RelativeMotion,
    Key,
    /// SYN, MSC and everything else; never acted on
    Other(u16),
}

/// One event read from the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceEvent {
    pub class: EventClass,
    pub code: u16,
    pub value: i32,
}

impl SourceEvent {
    pub fn relative(axis: RelativeAxisType, value: i32) -> Self {
        Self {
            class: EventClass::RelativeMotion,
            code: axis.0,
            value,
        }
    }

    pub fn key(key: Key, value: i32) -> Self {
        Self {
            class: EventClass::Key,
            code: key.code(),
            value,
        }
    }
}

impl From<InputEvent> for SourceEvent {
    fn from(event: InputEvent) -> Self {
        let class = match event.event_type() {
            EventType::RELATIVE => EventClass::RelativeMotion,
            EventType::KEY => EventClass::Key,
            other => EventClass::Other(other.0),
        };
        Self {
            class,
            code: event.code(),
            value: event.value(),
        }
    }
}

/// Readable side of the bridge
///
/// `next_event` blocks until an event arrives; it is the translation loop's
/// only suspension point and must be cancel-safe.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Result<SourceEvent, BridgeError>;

    /// Release the device. Calling it again is a no-op.
    fn close(&mut self) -> io::Result<()>;
}

/// evdev mouse read through the tokio reactor
pub struct MouseSource {
    path: PathBuf,
    stream: Option<EventStream>,
}

impl MouseSource {
    /// Open a mouse, optionally grabbing it so the cursor stops moving
    pub fn open(path: &Path, grab: bool) -> Result<Self, BridgeError> {
        let mut device = Device::open(path).map_err(BridgeError::SourceUnavailable)?;
        info!(
            "Using mouse device: {} ({})",
            path.display(),
            device.name().unwrap_or("Unknown")
        );

        if grab {
            device.grab().map_err(BridgeError::SourceUnavailable)?;
            info!("Grabbed {} for exclusive access", path.display());
        }

        let stream = device
            .into_event_stream()
            .map_err(BridgeError::SourceUnavailable)?;

        Ok(Self {
            path: path.to_path_buf(),
            stream: Some(stream),
        })
    }
}

#[async_trait]
impl EventSource for MouseSource {
    async fn next_event(&mut self) -> Result<SourceEvent, BridgeError> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            BridgeError::SourceUnavailable(io::Error::new(
                io::ErrorKind::NotConnected,
                "mouse closed",
            ))
        })?;
        let event = stream
            .next_event()
            .await
            .map_err(BridgeError::SourceUnavailable)?;
        Ok(SourceEvent::from(event))
    }

    fn close(&mut self) -> io::Result<()> {
        // Dropping the fd also releases any grab
        if self.stream.take().is_some() {
            debug!("Closed mouse device {}", self.path.display());
        }
        Ok(())
    }
}

/// Input device found under /dev/input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub path: PathBuf,
    pub name: String,
    /// Reports REL_X and REL_Y
    pub has_relative_xy: bool,
    pub has_left_button: bool,
}

impl DeviceSummary {
    fn from_device(path: PathBuf, device: &Device) -> Self {
        let has_relative_xy = device.supported_relative_axes().map_or(false, |axes| {
            axes.contains(RelativeAxisType::REL_X) && axes.contains(RelativeAxisType::REL_Y)
        });
        let has_left_button = device
            .supported_keys()
            .map_or(false, |keys| keys.contains(Key::BTN_LEFT));
        Self {
            path,
            name: device.name().unwrap_or("Unknown").to_string(),
            has_relative_xy,
            has_left_button,
        }
    }

    /// Reports pointer motion and a primary button
    pub fn looks_like_mouse(&self) -> bool {
        self.has_relative_xy && self.has_left_button
    }
}

/// List readable input devices ordered by event number
pub fn list_devices() -> Vec<DeviceSummary> {
    let mut devices: Vec<DeviceSummary> = evdev::enumerate()
        .map(|(path, device)| DeviceSummary::from_device(path, &device))
        .collect();
    devices.sort_by_key(|d| (event_number(&d.path), d.path.clone()));
    debug!("Found {} input devices", devices.len());
    devices
}

fn event_number(path: &Path) -> u32 {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("event"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(u32::MAX)
}

/// Choose a mouse among the listed devices
///
/// Prefers a name containing "mouse" but not "keyboard" (combo receivers
/// expose both); otherwise the first device with pointer motion and a left
/// button.
pub fn pick_mouse(devices: &[DeviceSummary]) -> Option<&DeviceSummary> {
    devices
        .iter()
        .find(|d| {
            let name = d.name.to_lowercase();
            name.contains("mouse") && !name.contains("keyboard")
        })
        .or_else(|| devices.iter().find(|d| d.looks_like_mouse()))
}

/// Resolve the mouse path: the configured one, else auto-detect
pub fn resolve_mouse_path(configured: Option<&Path>) -> Result<PathBuf, BridgeError> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }
    let devices = list_devices();
    let mouse = pick_mouse(&devices).ok_or(BridgeError::NoMouseFound)?;
    info!("Auto-detected mouse: {} - {}", mouse.path.display(), mouse.name);
    Ok(mouse.path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(path: &str, name: &str, rel: bool, left: bool) -> DeviceSummary {
        DeviceSummary {
            path: PathBuf::from(path),
            name: name.to_string(),
            has_relative_xy: rel,
            has_left_button: left,
        }
    }

    #[test]
    fn test_pick_by_name() {
        let devices = vec![
            summary("/dev/input/event0", "Power Button", false, false),
            summary("/dev/input/event3", "Logitech USB Keyboard Mouse", true, true),
            summary("/dev/input/event5", "Logitech G102 Gaming Mouse", true, true),
        ];
        let picked = pick_mouse(&devices).unwrap();
        assert_eq!(picked.path, PathBuf::from("/dev/input/event5"));
    }

    #[test]
    fn test_pick_by_capabilities() {
        let devices = vec![
            summary("/dev/input/event1", "AT Translated Set 2 keyboard", false, false),
            summary("/dev/input/event7", "SynPS/2 Synaptics TouchPad", true, true),
        ];
        let picked = pick_mouse(&devices).unwrap();
        assert_eq!(picked.name, "SynPS/2 Synaptics TouchPad");
    }

    #[test]
    fn test_pick_none() {
        let devices = vec![summary("/dev/input/event1", "Lid Switch", false, false)];
        assert!(pick_mouse(&devices).is_none());
        assert!(pick_mouse(&[]).is_none());
    }

    #[test]
    fn test_configured_path_wins() {
        let path = resolve_mouse_path(Some(Path::new("/dev/input/event9"))).unwrap();
        assert_eq!(path, PathBuf::from("/dev/input/event9"));
    }

    #[test]
    fn test_event_number_ordering() {
        assert_eq!(event_number(Path::new("/dev/input/event12")), 12);
        assert_eq!(event_number(Path::new("/dev/input/mice")), u32::MAX);
    }

    #[test]
    fn test_classify_evdev_events() {
        let rel = SourceEvent::from(InputEvent::new(
            EventType::RELATIVE,
            RelativeAxisType::REL_X.0,
            -3,
        ));
        assert_eq!(rel, SourceEvent::relative(RelativeAxisType::REL_X, -3));

        let key = SourceEvent::from(InputEvent::new(EventType::KEY, Key::BTN_LEFT.code(), 1));
        assert_eq!(key, SourceEvent::key(Key::BTN_LEFT, 1));

        let syn = SourceEvent::from(InputEvent::new(EventType::SYNCHRONIZATION, 0, 0));
        assert_eq!(syn.class, EventClass::Other(EventType::SYNCHRONIZATION.0));
    }
}
