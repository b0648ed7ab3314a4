//! Core resource manager components.
//!
//! - [`config`] - Controller and instance configuration
//! - [`controller`] - Controller registry, lifecycle and instance opening
//! - [`instance`] - Instances and the resource allocator
//! - [`channel`] - Logical channel composition and direct channel mapping
//! - [`param`] - PaRAM set contents and access
//! - [`callback`] - Completion and error callbacks
//! - [`interrupt`] - Completion, CC error and TC error handlers
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```ignore
//! use edma3_rm::driver::{ControllerRegistry, InstanceConfig, OpenParams, Resource};
//!
//! let controller = registry.create(0, config, regs, false)?;
//! let inst = controller.open(OpenParams::new(0, owned).with_master(true))?;
//! let any = Resource::ANY;
//! let lch = inst.alloc_logical_channel(Resource::Dma(any), any, any)?;
//! ```

// Submodules
pub mod callback;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod instance;
pub mod interrupt;
pub mod param;
pub mod resource;

// Re-exports for convenience
pub use callback::{GlobalError, GlobalErrorCallback, TccCallback, TccStatus};
pub use config::{
    GlobalConfig, InstanceConfig, MAX_QUEUE_PRIORITY, MAX_QUEUE_WATERMARK, OpenParams,
};
pub use controller::{Controller, ControllerRegistry, ControllerState};
pub use error::{
    Error, RequestError, RequestResult, ResourceError, ResourceResult, Result, StateError,
    StateResult,
};
pub use instance::{Instance, InstanceHandle};
pub use param::ParamSet;
pub use resource::{Ioctl, LogicalChannel, RegisterBlock, Resource, ResourceKind, TriggerWord};
