//! Core building blocks shared by every shelf crate: the [`Module`] contract,
//! the [`ModuleRegistry`] that drives module lifecycles, and layered
//! [`settings::Settings`].

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Migration, Module};
pub use registry::ModuleRegistry;
