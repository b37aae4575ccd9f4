// src/ops/reduction/mod.rs

pub mod sum;

#[cfg(test)]
mod sum_test;

pub use sum::{sum_op, Sum};
