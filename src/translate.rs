//! The mouse-to-gamepad translation loop
//!
//! Reads one source event at a time, turns it into at most one gamepad frame
//! and writes that frame before reading again. Runs until the shutdown
//! future resolves or a device fails, then closes the mouse and the gamepad
//! in that order.

use std::future::Future;

use evdev::RelativeAxisType;
use tracing::{debug, info, trace, warn};

use crate::buttons::ButtonMap;
use crate::error::BridgeError;
use crate::gamepad::{FrameWriter, GamepadOutput};
use crate::mapper::{transform, Axis, Sensitivity, StickState};
use crate::source::{EventClass, EventSource, SourceEvent};

/// Loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    ShuttingDown,
    Terminated,
}

/// Counters reported when the loop stops on request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub events_read: u64,
    pub frames_emitted: u64,
}

/// Owns both device handles for the lifetime of one run
pub struct Translator<S, W> {
    source: S,
    output: GamepadOutput<W>,
    sensitivity: Sensitivity,
    buttons: ButtonMap,
    stick: StickState,
    state: LoopState,
    events_read: u64,
}

impl<S: EventSource, W: FrameWriter> Translator<S, W> {
    pub fn new(
        source: S,
        output: GamepadOutput<W>,
        sensitivity: Sensitivity,
        buttons: ButtonMap,
    ) -> Self {
        Self {
            source,
            output,
            sensitivity,
            buttons,
            stick: StickState::new(),
            state: LoopState::Running,
            events_read: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn output(&self) -> &GamepadOutput<W> {
        &self.output
    }

    /// Run until `shutdown` resolves or a device fails
    ///
    /// Shutdown is only observed while waiting for the next event, so an
    /// event already read is always fully written first. Both devices are
    /// closed on every exit path, so call this once; close failures are
    /// logged and never replace the error that ended the loop.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<RunSummary, BridgeError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let result = loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Interrupt received, stopping");
                    break Ok(());
                }
                event = self.source.next_event() => event,
            };

            let event = match event {
                Ok(event) => event,
                Err(e) => break Err(e),
            };
            self.events_read += 1;

            if let Err(e) = self.dispatch(event) {
                break Err(e);
            }
        };

        self.state = LoopState::ShuttingDown;
        if let Err(e) = &result {
            warn!("Stopping after device failure: {}", e);
        }
        self.close_devices();
        self.state = LoopState::Terminated;

        let summary = RunSummary {
            events_read: self.events_read,
            frames_emitted: self.output.frames(),
        };
        debug!(
            "Loop terminated: {} events read, {} frames emitted",
            summary.events_read, summary.frames_emitted
        );
        result.map(|()| summary)
    }

    /// Route one event; emits zero or one frame
    fn dispatch(&mut self, event: SourceEvent) -> Result<(), BridgeError> {
        trace!(
            "type:{:?} code:{} value:{}",
            event.class,
            event.code,
            event.value
        );

        match event.class {
            EventClass::RelativeMotion => {
                let axis = match RelativeAxisType(event.code) {
                    RelativeAxisType::REL_X => Axis::X,
                    RelativeAxisType::REL_Y => Axis::Y,
                    _ => return Ok(()),
                };
                let value = transform(event.value, &self.sensitivity);
                let pos = self.stick.apply_motion(axis, value);
                trace!("stick x:{} y:{}", pos.x, pos.y);
                self.output.emit_axes(pos.x, pos.y)
            }
            EventClass::Key => match self.buttons.lookup(event.code) {
                Some(gamepad_code) => {
                    let pressed = event.value != 0;
                    trace!("button {} -> {} pressed:{}", event.code, gamepad_code, pressed);
                    self.output.emit_button(gamepad_code, pressed)
                }
                None => Ok(()),
            },
            EventClass::Other(_) => Ok(()),
        }
    }

    fn close_devices(&mut self) {
        if let Err(e) = self.source.close() {
            warn!("Failed to close mouse device: {}", e);
        }
        if let Err(e) = self.output.close() {
            warn!("Failed to close virtual gamepad: {}", e);
        }
    }
}
