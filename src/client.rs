//! Switch Client
//!
//! The public face of the driver. Validates parameters, builds frames and
//! hands them to the supervisor; requests that expect a reply wait on the
//! correlator.
//!
//! Input numbers are one-based here and zero-based on the wire.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, SwitchError};
use crate::network::{ConnectionState, Correlator, Observer, Supervisor};
use crate::protocol::{decode, encode_command, Command, Frame};

/// Longest LED timeout the switch accepts, in seconds
pub const MAX_LED_TIMEOUT_SECS: u8 = 30;

/// Client for one HDMI matrix switch
///
/// Cheap to share behind an `Arc`; concurrent requests are serialized
/// internally. Dropping the client closes the connection.
pub struct SwitchClient {
    correlator: Arc<Correlator>,
    supervisor: Supervisor,
}

impl SwitchClient {
    /// Connect to the switch; fails if the first dial fails
    pub fn connect(config: Config) -> Result<Self> {
        Self::start(config, None)
    }

    /// Connect and route unsolicited frames to `observer`
    ///
    /// The observer runs on the read loop thread and must return quickly.
    pub fn connect_with_observer<F>(config: Config, observer: F) -> Result<Self>
    where
        F: Fn(Frame) + Send + Sync + 'static,
    {
        Self::start(config, Some(Arc::new(observer)))
    }

    fn start(config: Config, observer: Option<Observer>) -> Result<Self> {
        let correlator = Arc::new(Correlator::new(observer));
        let supervisor = Supervisor::start(config, Arc::clone(&correlator))?;
        Ok(Self {
            correlator,
            supervisor,
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Select input `input` (1..=port count) and return the input the switch
    /// reports back
    pub fn switch_input(&self, input: i32) -> Result<u8> {
        let ports = self.supervisor.config().model.port_count();
        let index = check_range("input", input, 1, ports)? - 1;

        tracing::debug!("Switching to input {}", input);
        let reply = self.request(Command::SwitchInput { index })?;
        decode(reply.as_bytes())
    }

    /// Set the LED display timeout in seconds (0 disables it)
    pub fn set_led_timeout(&self, seconds: i32) -> Result<()> {
        let seconds = check_range("LED timeout", seconds, 0, MAX_LED_TIMEOUT_SECS)?;
        self.send(Command::SetLedTimeout { seconds })
    }

    pub fn mute_buzzer(&self) -> Result<()> {
        self.send(Command::MuteBuzzer)
    }

    pub fn unmute_buzzer(&self) -> Result<()> {
        self.send(Command::UnmuteBuzzer)
    }

    /// Only honoured by the 8-port hardware; sent regardless of model
    pub fn enable_auto_input_detection(&self) -> Result<()> {
        self.send(Command::EnableAutoInputDetection)
    }

    /// Only honoured by the 8-port hardware; sent regardless of model
    pub fn disable_auto_input_detection(&self) -> Result<()> {
        self.send(Command::DisableAutoInputDetection)
    }

    /// Ask the switch which input is active
    pub fn get_current_input(&self) -> Result<u8> {
        let reply = self.request(Command::GetCurrentInput)?;
        decode(reply.as_bytes())
    }

    /// Send any command; returns the raw reply for commands that have one
    pub fn execute(&self, command: Command) -> Result<Option<Frame>> {
        if command.expects_response() {
            self.request(command).map(Some)
        } else {
            self.send(command).map(|_| None)
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    /// Block until the link reaches `state` or `timeout` passes
    pub fn wait_for_state(&self, state: ConnectionState, timeout: Duration) -> bool {
        self.supervisor.wait_for_state(state, timeout)
    }

    pub fn config(&self) -> &Config {
        self.supervisor.config()
    }

    /// Close the connection; later calls fail with `Shutdown`
    pub fn shutdown(&self) {
        self.supervisor.shutdown();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Fire-and-forget write
    fn send(&self, command: Command) -> Result<()> {
        let frame = encode_command(&command);
        self.supervisor.send(&frame)?;
        Ok(())
    }

    /// Write and wait for the next frame
    fn request(&self, command: Command) -> Result<Frame> {
        let frame = encode_command(&command);

        let mut flight = self.correlator.begin();
        self.supervisor
            .send_with(&frame, |generation| flight.arm(generation))?;

        let reply = flight.wait(self.supervisor.config().response_timeout())?;
        tracing::debug!("Reply to {}: {}", frame, reply);
        Ok(reply)
    }
}

/// Check `min <= value <= max` before any I/O
fn check_range(name: &'static str, value: i32, min: u8, max: u8) -> Result<u8> {
    if value < i32::from(min) || value > i32::from(max) {
        return Err(SwitchError::InvalidParameter {
            name,
            value: i64::from(value),
            min: i64::from(min),
            max: i64::from(max),
        });
    }
    // In range, so it fits in a byte
    Ok(value as u8)
}
