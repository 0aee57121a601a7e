//! Configuration for scull
//!
//! Centralized configuration with sensible defaults.

use crate::device::Geometry;
use crate::error::{Result, ScullError};

/// Default size of one quantum buffer (bytes)
pub const DEFAULT_QUANTUM: usize = 4000;

/// Default number of quantum slots per qset node
pub const DEFAULT_QSET: usize = 1000;

/// Default number of devices in the registry (scull0 .. scull3)
pub const DEFAULT_NR_DEVS: u32 = 4;

/// Main configuration for a scull registry and its server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Bytes per quantum buffer
    pub quantum: usize,

    /// Quantum slots per qset node
    pub qset: usize,

    /// Number of devices created by the registry
    pub nr_devs: u32,

    /// Minor number of the first device; device `i` answers to `minor_base + i`
    pub minor_base: u32,

    /// What happens to a device's geometry when it is trimmed
    pub trim_policy: TrimPolicy,

    /// How often a blocked lock waiter re-checks its interrupt token (milliseconds)
    pub lock_poll_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max connections queued or in service at once
    pub max_connections: usize,

    /// Number of worker threads serving connections
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// Trim behaviour with respect to device geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimPolicy {
    /// Adopt the registry's current default geometry on every trim
    ReloadDefaults,

    /// Keep the geometry the device was created with
    KeepGeometry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quantum: DEFAULT_QUANTUM,
            qset: DEFAULT_QSET,
            nr_devs: DEFAULT_NR_DEVS,
            minor_base: 0,
            trim_policy: TrimPolicy::ReloadDefaults,
            lock_poll_interval_ms: 5,
            listen_addr: "127.0.0.1:7070".to_string(),
            max_connections: 64,
            worker_threads: 8,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// The default device geometry described by this config
    pub fn geometry(&self) -> Result<Geometry> {
        Geometry::try_new(self.quantum, self.qset)
    }

    /// Check that the config describes a usable registry
    pub fn validate(&self) -> Result<()> {
        self.geometry()?;

        if self.nr_devs == 0 {
            return Err(ScullError::Config("nr_devs must be at least 1".to_string()));
        }
        if self.minor_base.checked_add(self.nr_devs - 1).is_none() {
            return Err(ScullError::Config(format!(
                "minor range {}+{} overflows u32",
                self.minor_base, self.nr_devs
            )));
        }
        if self.worker_threads == 0 {
            return Err(ScullError::Config("worker_threads must be at least 1".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ScullError::Config("max_connections must be at least 1".to_string()));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the quantum size (bytes per buffer)
    pub fn quantum(mut self, bytes: usize) -> Self {
        self.config.quantum = bytes;
        self
    }

    /// Set the qset size (buffers per node)
    pub fn qset(mut self, slots: usize) -> Self {
        self.config.qset = slots;
        self
    }

    /// Set the number of devices
    pub fn nr_devs(mut self, count: u32) -> Self {
        self.config.nr_devs = count;
        self
    }

    /// Set the first minor number
    pub fn minor_base(mut self, minor: u32) -> Self {
        self.config.minor_base = minor;
        self
    }

    /// Set the trim policy
    pub fn trim_policy(mut self, policy: TrimPolicy) -> Self {
        self.config.trim_policy = policy;
        self
    }

    /// Set the lock wait poll interval (in milliseconds)
    pub fn lock_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.lock_poll_interval_ms = ms;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the number of worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
