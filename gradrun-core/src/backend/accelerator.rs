use crate::device::StorageDevice;
use crate::error::GradrunError;
use crate::types::FloatElement;
use log::trace;

/// Threads per block used by every launch.
pub const BLOCK_SIZE: usize = 256;

/// Grid geometry of a single kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchConfig {
    pub grid: usize,
    pub block: usize,
}

impl LaunchConfig {
    /// One thread per element, rounded up to whole blocks. Always at least one block.
    pub fn for_elements(n: usize) -> Self {
        LaunchConfig {
            grid: n.div_ceil(BLOCK_SIZE).max(1),
            block: BLOCK_SIZE,
        }
    }
}

pub(crate) fn ensure_available() -> Result<(), GradrunError> {
    if StorageDevice::Accelerator.is_available() {
        Ok(())
    } else {
        Err(GradrunError::DeviceUnavailable(StorageDevice::Accelerator))
    }
}

/// Launches an elementwise kernel: `out[i] = kernel(i)` for every `i < n`.
pub(crate) fn elementwise<T, F>(name: &str, n: usize, kernel: F) -> Result<Vec<T>, GradrunError>
where
    T: Copy + Default,
    F: Fn(usize) -> T,
{
    ensure_available()?;
    let config = LaunchConfig::for_elements(n);
    trace!(
        "accelerator launch {}: n={} grid={} block={}",
        name,
        n,
        config.grid,
        config.block
    );
    let mut out = vec![T::default(); n];
    for block_idx in 0..config.grid {
        for thread_idx in 0..config.block {
            let i = block_idx * config.block + thread_idx;
            if i < n {
                out[i] = kernel(i);
            }
        }
    }
    Ok(out)
}

/// Two-stage sum: one partial per block, then a sum over the partials.
///
/// The summation order differs from the CPU path, so results may differ in
/// the last bits.
pub(crate) fn reduce_sum<T: FloatElement>(name: &str, data: &[T]) -> Result<T, GradrunError> {
    ensure_available()?;
    let config = LaunchConfig::for_elements(data.len());
    trace!(
        "accelerator reduction {}: n={} grid={}",
        name,
        data.len(),
        config.grid
    );
    let partials: Vec<T> = data
        .chunks(config.block)
        .map(|block| block.iter().fold(T::zero(), |acc, &v| acc + v))
        .collect();
    Ok(partials.into_iter().fold(T::zero(), |acc, v| acc + v))
}
