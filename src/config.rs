//! Configuration for the switch driver
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{Result, SwitchError};

/// Main configuration for a switch connection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Control endpoint of the switch (host:port)
    pub addr: String,

    /// Hardware variant, decides the valid input range
    pub model: Model,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Dial timeout (milliseconds)
    pub dial_timeout_ms: u64,

    /// Socket read deadline (milliseconds)
    ///
    /// Expiry means the link is idle, not dead. Also bounds how long the
    /// read loop takes to notice a shutdown.
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds)
    pub write_timeout_ms: u64,

    /// How long a caller waits for a reply frame (milliseconds)
    pub response_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Reconnect Configuration
    // -------------------------------------------------------------------------
    /// First delay after a failed redial (milliseconds)
    pub reconnect_initial_backoff_ms: u64,

    /// Upper bound for the redial delay (milliseconds)
    pub reconnect_max_backoff_ms: u64,
}

/// Switch hardware variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
    /// 8-port switch (inputs 1-8)
    EightPort,

    /// 16-port switch (inputs 1-16)
    #[default]
    SixteenPort,
}

impl Model {
    /// Number of selectable inputs
    pub fn port_count(self) -> u8 {
        match self {
            Model::EightPort => 8,
            Model::SixteenPort => 16,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "192.168.1.10:5000".to_string(),
            model: Model::default(),
            dial_timeout_ms: 5000,
            read_timeout_ms: 200,
            write_timeout_ms: 1000,
            response_timeout_ms: 2000,
            reconnect_initial_backoff_ms: 250,
            reconnect_max_backoff_ms: 10_000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the config can drive a connection
    pub fn validate(&self) -> Result<()> {
        if self.addr.trim().is_empty() {
            return Err(SwitchError::Config("address must not be empty".to_string()));
        }

        let timeouts = [
            ("dial_timeout_ms", self.dial_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
            ("response_timeout_ms", self.response_timeout_ms),
            ("reconnect_initial_backoff_ms", self.reconnect_initial_backoff_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(SwitchError::Config(format!("{} must be non-zero", name)));
            }
        }

        if self.reconnect_max_backoff_ms < self.reconnect_initial_backoff_ms {
            return Err(SwitchError::Config(format!(
                "reconnect_max_backoff_ms ({}) is below reconnect_initial_backoff_ms ({})",
                self.reconnect_max_backoff_ms, self.reconnect_initial_backoff_ms
            )));
        }

        Ok(())
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the control endpoint (host:port)
    pub fn addr(mut self, addr: impl Into<String>) -> Self {
        self.config.addr = addr.into();
        self
    }

    /// Set the control endpoint from separate host and port strings
    pub fn host_port(mut self, host: &str, port: &str) -> Self {
        self.config.addr = format!("{}:{}", host, port);
        self
    }

    /// Set the hardware variant
    pub fn model(mut self, model: Model) -> Self {
        self.config.model = model;
        self
    }

    /// Set the dial timeout (in milliseconds)
    pub fn dial_timeout_ms(mut self, ms: u64) -> Self {
        self.config.dial_timeout_ms = ms;
        self
    }

    /// Set the read deadline (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the response timeout (in milliseconds)
    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.config.response_timeout_ms = ms;
        self
    }

    /// Set the reconnect backoff bounds (in milliseconds)
    pub fn reconnect_backoff_ms(mut self, initial: u64, max: u64) -> Self {
        self.config.reconnect_initial_backoff_ms = initial;
        self.config.reconnect_max_backoff_ms = max;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
