use std::fmt;

/// Represents the physical location where tensor data is stored.
///
/// The set of devices is closed: every [`Function`](crate::autograd::Function)
/// must provide a forward and a backward kernel for each variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageDevice {
    /// Data is stored in main system memory (RAM).
    /// This is the default device.
    #[default]
    CPU,
    /// Data is owned by the accelerator backend and processed by its
    /// grid/block kernels. Only usable when built with the `accelerator` feature.
    Accelerator,
}

impl StorageDevice {
    /// Whether kernels for this device were compiled into the build.
    pub fn is_available(&self) -> bool {
        match self {
            StorageDevice::CPU => true,
            StorageDevice::Accelerator => cfg!(feature = "accelerator"),
        }
    }
}

impl fmt::Display for StorageDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageDevice::CPU => f.write_str("cpu"),
            StorageDevice::Accelerator => f.write_str("accelerator"),
        }
    }
}
