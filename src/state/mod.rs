//! Shared state of the generation pipeline.

pub mod binding_registry;
pub mod generation_task;

pub use binding_registry::BindingRegistry;
pub use generation_task::GenerationTask;
