//! Deterministic, pure logic shared by the lint and repair flows.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! text and return deterministic outputs suitable for tests.

pub mod diagnostics;
pub mod extract;
pub mod stages;
pub mod template;
