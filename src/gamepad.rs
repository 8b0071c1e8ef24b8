//! Virtual gamepad device using evdev/uinput
//!
//! Creates a virtual gamepad with a left stick and a handful of face buttons
//! that appears as a standard controller to games and applications.

use crate::error::BridgeError;
use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};
use std::io;
use tracing::{debug, info};

/// Default stick range (standard for most games)
pub const DEFAULT_AXIS_MAX: i32 = 32767;

/// Capabilities and identity declared when the virtual device is created
#[derive(Debug, Clone)]
pub struct GamepadSpec {
    /// Device name (shown in `evtest` and game controller settings)
    pub name: String,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    /// ABS_X and ABS_Y both span `[-axis_max, axis_max]`
    pub axis_max: i32,
    /// Gamepad button codes to advertise
    pub buttons: Vec<u16>,
}

/// Writable side of the bridge
///
/// A frame is a batch of events followed by a SYN_REPORT barrier. It is not
/// complete until `write_frame` returns `Ok`.
pub trait FrameWriter {
    fn write_frame(&mut self, events: &[InputEvent]) -> io::Result<()>;

    /// Release the device. Calling it again is a no-op.
    fn close(&mut self) -> io::Result<()>;
}

/// uinput-backed gamepad
pub struct VirtualGamepad {
    device: Option<VirtualDevice>,
}

impl VirtualGamepad {
    /// Create the uinput device
    pub fn create(spec: &GamepadSpec) -> Result<Self, BridgeError> {
        let mut keys = AttributeSet::<Key>::new();
        for &code in &spec.buttons {
            keys.insert(Key::new(code));
        }

        let stick_range = || AbsInfo::new(0, -spec.axis_max, spec.axis_max, 0, 0, 0);
        let abs_x = UinputAbsSetup::new(AbsoluteAxisType::ABS_X, stick_range());
        let abs_y = UinputAbsSetup::new(AbsoluteAxisType::ABS_Y, stick_range());

        let device = VirtualDeviceBuilder::new()
            .map_err(BridgeError::SinkUnavailable)?
            .name(&spec.name)
            .input_id(InputId::new(
                BusType::BUS_USB,
                spec.vendor,
                spec.product,
                spec.version,
            ))
            .with_keys(&keys)
            .map_err(BridgeError::SinkUnavailable)?
            .with_absolute_axis(&abs_x)
            .map_err(BridgeError::SinkUnavailable)?
            .with_absolute_axis(&abs_y)
            .map_err(BridgeError::SinkUnavailable)?
            .build()
            .map_err(BridgeError::SinkUnavailable)?;

        info!(
            "Created virtual gamepad \"{}\" ({:04x}:{:04x} v{:x})",
            spec.name, spec.vendor, spec.product, spec.version
        );

        Ok(Self {
            device: Some(device),
        })
    }

    /// Get the device path (e.g., /dev/input/eventX)
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .as_mut()?
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }
}

impl FrameWriter for VirtualGamepad {
    fn write_frame(&mut self, events: &[InputEvent]) -> io::Result<()> {
        let device = self
            .device
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "gamepad closed"))?;
        // emit() appends the SYN_REPORT
        device.emit(events)?;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.device.take().is_some() {
            debug!("Virtual gamepad destroyed");
        }
        Ok(())
    }
}

/// Clamp a stick coordinate to `[-axis_max, axis_max]`
pub fn clamp_axis(value: i64, axis_max: i32) -> i32 {
    let max = i64::from(axis_max);
    value.clamp(-max, max) as i32
}

/// Output adapter: turns stick and button updates into synced frames
pub struct GamepadOutput<W> {
    writer: W,
    axis_max: i32,
    frames: u64,
}

impl<W: FrameWriter> GamepadOutput<W> {
    /// Wrap a writer whose sticks span `[-axis_max, axis_max]`; `axis_max`
    /// must be positive
    pub fn new(writer: W, axis_max: i32) -> Result<Self, BridgeError> {
        if axis_max <= 0 {
            return Err(BridgeError::Config(format!(
                "axis_max must be positive, got {axis_max}"
            )));
        }
        Ok(Self {
            writer,
            axis_max,
            frames: 0,
        })
    }

    /// Write both stick coordinates as one frame
    pub fn emit_axes(&mut self, x: i64, y: i64) -> Result<(), BridgeError> {
        let x = clamp_axis(x, self.axis_max);
        let y = clamp_axis(y, self.axis_max);
        let events = [
            InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_X.0, x),
            InputEvent::new(EventType::ABSOLUTE, AbsoluteAxisType::ABS_Y.0, y),
        ];
        self.write(&events)
    }

    /// Write a single button state as one frame
    pub fn emit_button(&mut self, code: u16, pressed: bool) -> Result<(), BridgeError> {
        let event = InputEvent::new(EventType::KEY, code, i32::from(pressed));
        self.write(&[event])
    }

    fn write(&mut self, events: &[InputEvent]) -> Result<(), BridgeError> {
        self.writer
            .write_frame(events)
            .map_err(BridgeError::SinkUnavailable)?;
        self.frames += 1;
        Ok(())
    }

    /// Frames successfully written so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn close(&mut self) -> io::Result<()> {
        self.writer.close()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<Vec<(u16, u16, i32)>>,
        fail: bool,
    }

    impl FrameWriter for Recorder {
        fn write_frame(&mut self, events: &[InputEvent]) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::from_raw_os_error(19)); // ENODEV
            }
            self.frames.push(
                events
                    .iter()
                    .map(|e| (e.event_type().0, e.code(), e.value()))
                    .collect(),
            );
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_clamp_bounds_and_idempotence() {
        let b = DEFAULT_AXIS_MAX;
        for v in [
            i64::MIN,
            -655_340,
            -32768,
            -32767,
            -1,
            0,
            1,
            6553,
            32767,
            32768,
            i64::MAX,
        ] {
            let once = clamp_axis(v, b);
            assert!((-b..=b).contains(&once));
            assert_eq!(clamp_axis(i64::from(once), b), once);
        }
        assert_eq!(clamp_axis(655_340, b), 32767);
        assert_eq!(clamp_axis(-655_340, b), -32767);
        assert_eq!(clamp_axis(6553, b), 6553);
    }

    #[test]
    fn test_emit_axes_writes_pair_in_one_frame() {
        let mut out = GamepadOutput::new(Recorder::default(), DEFAULT_AXIS_MAX).unwrap();
        out.emit_axes(100_000, -5).unwrap();
        assert_eq!(out.frames(), 1);
        let abs = EventType::ABSOLUTE.0;
        assert_eq!(
            out.writer().frames,
            vec![vec![
                (abs, AbsoluteAxisType::ABS_X.0, 32767),
                (abs, AbsoluteAxisType::ABS_Y.0, -5),
            ]]
        );
    }

    #[test]
    fn test_emit_button() {
        let mut out = GamepadOutput::new(Recorder::default(), DEFAULT_AXIS_MAX).unwrap();
        out.emit_button(Key::BTN_SOUTH.code(), true).unwrap();
        out.emit_button(Key::BTN_SOUTH.code(), false).unwrap();
        let key = EventType::KEY.0;
        assert_eq!(
            out.writer().frames,
            vec![
                vec![(key, Key::BTN_SOUTH.code(), 1)],
                vec![(key, Key::BTN_SOUTH.code(), 0)],
            ]
        );
    }

    #[test]
    fn test_write_failure_is_sink_unavailable() {
        let recorder = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut out = GamepadOutput::new(recorder, DEFAULT_AXIS_MAX).unwrap();
        let err = out.emit_axes(1, 1).unwrap_err();
        assert!(matches!(err, BridgeError::SinkUnavailable(_)));
        assert_eq!(out.frames(), 0);
    }

    #[test]
    fn test_non_positive_axis_max_rejected() {
        for axis_max in [0, -1, -32767, i32::MIN] {
            let result = GamepadOutput::new(Recorder::default(), axis_max);
            assert!(matches!(result, Err(BridgeError::Config(_))));
        }
        assert!(GamepadOutput::new(Recorder::default(), 1).is_ok());
    }

    #[test]
    #[ignore] // Requires uinput access (run with: cargo test -- --ignored)
    fn test_create_gamepad() {
        let spec = GamepadSpec {
            name: "Test Gamepad".to_string(),
            vendor: 0x1234,
            product: 0x5678,
            version: 0x100,
            axis_max: DEFAULT_AXIS_MAX,
            buttons: vec![Key::BTN_SOUTH.code(), Key::BTN_EAST.code()],
        };
        let mut gamepad = VirtualGamepad::create(&spec).unwrap();
        gamepad
            .write_frame(&[InputEvent::new(
                EventType::ABSOLUTE,
                AbsoluteAxisType::ABS_X.0,
                0,
            )])
            .unwrap();
        gamepad.close().unwrap();
        gamepad.close().unwrap();
    }
}
