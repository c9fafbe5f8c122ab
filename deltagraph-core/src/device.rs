use crate::error::GraphError;
use log::{debug, warn};
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};

/// A compute slot that a batch partition runs on.
///
/// The engine itself only computes on the CPU; a `Device` is an opaque token
/// so that callers with a finite number of execution resources can bound how
/// many partitions run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    pub id: usize,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device:{}", self.id)
    }
}

/// A fixed pool of devices handed out under mutual exclusion.
///
/// [`DevicePool::acquire`] blocks until a device is free. The returned
/// [`DeviceLease`] gives the device back when dropped, so a partition that
/// fails still releases its slot.
#[derive(Debug)]
pub struct DevicePool {
    free: Mutex<Vec<Device>>,
    available: Condvar,
    size: usize,
}

impl DevicePool {
    /// Creates a pool of `size` devices with ids `0..size`.
    ///
    /// # Errors
    /// Returns `GraphError::InternalError` if `size` is zero.
    pub fn new(size: usize) -> Result<Self, GraphError> {
        if size == 0 {
            return Err(GraphError::InternalError(
                "a device pool needs at least one device".to_string(),
            ));
        }
        debug!("Creating device pool with {} device(s)", size);
        Ok(DevicePool {
            free: Mutex::new((0..size).rev().map(|id| Device { id }).collect()),
            available: Condvar::new(),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of devices not currently leased.
    pub fn idle(&self) -> usize {
        self.lock_free().len()
    }

    fn lock_free(&self) -> MutexGuard<'_, Vec<Device>> {
        match self.free.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("DevicePool mutex poisoned. Recovering ...");
                poisoned.into_inner()
            }
        }
    }

    /// Blocks until a device is free and leases it.
    pub fn acquire(&self) -> DeviceLease<'_> {
        let mut free = self.lock_free();
        loop {
            if let Some(device) = free.pop() {
                debug!("Leased {}", device);
                return DeviceLease { pool: self, device };
            }
            free = match self.available.wait(free) {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("DevicePool mutex poisoned while waiting. Recovering ...");
                    poisoned.into_inner()
                }
            };
        }
    }

    /// Leases a device if one is free, without blocking.
    pub fn try_acquire(&self) -> Option<DeviceLease<'_>> {
        self.lock_free()
            .pop()
            .map(|device| DeviceLease { pool: self, device })
    }

    fn release(&self, device: Device) {
        self.lock_free().push(device);
        debug!("Released {}", device);
        self.available.notify_one();
    }
}

/// Exclusive use of one pool device. Returned to the pool on drop.
#[derive(Debug)]
pub struct DeviceLease<'a> {
    pool: &'a DevicePool,
    device: Device,
}

impl DeviceLease<'_> {
    pub fn device(&self) -> Device {
        self.device
    }
}

impl Drop for DeviceLease<'_> {
    fn drop(&mut self) {
        self.pool.release(self.device);
    }
}
