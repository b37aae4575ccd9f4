//! # gradrun-train
//!
//! The training loop around the gradrun autograd core: optimizers with named
//! hyperparameters, triggers, schedule extensions, the [`StandardUpdater`]
//! and the [`Trainer`].

pub mod extension;
pub mod extensions;
pub mod optimizer;
pub mod parameter;
pub mod sgd;
pub mod trainer;
pub mod trigger;
pub mod updater;

pub use extension::{Extension, ExtensionContext};
pub use extensions::{ExponentialShift, MultistepShift, ScheduleState};
pub use optimizer::{Hyperparameters, Optimizer};
pub use parameter::Parameter;
pub use sgd::{MomentumSgd, Sgd};
pub use trainer::{Trainer, TrainerState};
pub use trigger::{IntervalTrigger, ManualScheduleTrigger, Progress, Trigger, TriggerUnit};
pub use updater::{StandardUpdater, Updater, UpdaterState};
