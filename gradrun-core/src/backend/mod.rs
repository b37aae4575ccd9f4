//! Device kernels.
//!
//! `cpu` holds plain host loops. `accelerator` models a grid/block launch:
//! kernels are written per element index and launched over a grid of blocks,
//! and reductions go through per-block partial results. Both are blocking
//! calls from the caller's point of view.

pub mod accelerator;
pub mod cpu;
