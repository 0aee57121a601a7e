//! Device Registry
//!
//! A fixed set of devices created together from one [`Config`], addressed
//! by minor number. Devices share the default geometry but nothing else:
//! each owns its data and its lock, so different devices never contend.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::device::{
    DeviceStats, Geometry, Interrupt, OpenMode, ScullDevice, SharedGeometry,
};
use crate::error::{Result, ScullError};
use crate::handle::Handle;

/// The set of devices
#[derive(Debug)]
pub struct Registry {
    devices: Vec<Arc<ScullDevice>>,
    minor_base: u32,
    defaults: SharedGeometry,
}

impl Registry {
    /// Create `config.nr_devs` empty devices
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let defaults = SharedGeometry::new(config.geometry()?);
        let poll_interval = Duration::from_millis(config.lock_poll_interval_ms);

        let devices = (0..config.nr_devs)
            .map(|i| {
                Arc::new(ScullDevice::new(
                    config.minor_base + i,
                    defaults.clone(),
                    config.trim_policy,
                    poll_interval,
                ))
            })
            .collect();

        tracing::debug!(
            nr_devs = config.nr_devs,
            minor_base = config.minor_base,
            quantum = config.quantum,
            qset = config.qset,
            "registry created"
        );

        Ok(Self {
            devices,
            minor_base: config.minor_base,
            defaults,
        })
    }

    /// Look up a device by minor number
    pub fn get(&self, minor: u32) -> Result<Arc<ScullDevice>> {
        minor
            .checked_sub(self.minor_base)
            .and_then(|index| self.devices.get(index as usize))
            .cloned()
            .ok_or(ScullError::NoSuchDevice(minor))
    }

    /// Open a device by minor number
    pub fn open(&self, minor: u32, mode: OpenMode, interrupt: Interrupt) -> Result<Handle> {
        Handle::open(self.get(minor)?, mode, interrupt)
    }

    /// Number of devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Minor numbers served by this registry
    pub fn minors(&self) -> impl Iterator<Item = u32> + '_ {
        self.devices.iter().map(|device| device.minor())
    }

    /// Current default geometry
    pub fn defaults(&self) -> Geometry {
        self.defaults.get()
    }

    /// Change the default geometry
    ///
    /// Devices keep their current layout until their next trim, and only
    /// adopt it under [`TrimPolicy::ReloadDefaults`]. Remote clients reach
    /// this through the `SetDefaults` command.
    ///
    /// [`TrimPolicy::ReloadDefaults`]: crate::config::TrimPolicy::ReloadDefaults
    pub fn set_defaults(&self, geometry: Geometry) {
        tracing::debug!(
            quantum = geometry.quantum(),
            qset = geometry.qset(),
            "registry defaults changed"
        );
        self.defaults.set(geometry);
    }

    /// Stats for every device, in minor order
    pub fn stats(&self, interrupt: &Interrupt) -> Result<Vec<DeviceStats>> {
        self.devices
            .iter()
            .map(|device| device.stats(interrupt))
            .collect()
    }

    /// Text listing of every device
    pub fn listing(&self, interrupt: &Interrupt) -> Result<String> {
        let mut out = String::new();
        for stats in self.stats(interrupt)? {
            let _ = writeln!(out, "{}", stats);
        }
        Ok(out)
    }

    /// Tear down: trim every device
    pub fn close(self) {
        for device in &self.devices {
            device.trim_uninterruptible();
        }
        tracing::debug!(nr_devs = self.devices.len(), "registry closed");
    }
}
