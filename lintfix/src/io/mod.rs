//! Side-effecting boundaries: processes, documents, model, presentation.

pub mod analysis;
pub mod config;
pub mod document;
pub mod model;
pub mod process;
pub mod publish;
pub mod ui;
