//! Lint-driven Python repair.
//!
//! Two flows share this crate. A diagnostic refresh pipes a document through
//! an external analysis tool and turns its free-form output into positioned
//! findings. A repair run feeds the document through a fixed sequence of
//! prompt-templated model calls, each stage rewriting the output of the last.
//!
//! - **[`core`]**: Pure, deterministic logic (output parsing, templates,
//!   answer extraction, stage catalogue). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (processes, files, HTTP, terminal).
//!   Exposed through traits so tests can substitute scripted fakes.
//!
//! Orchestration modules ([`lint`], [`repair`], [`watch`]) coordinate core
//! logic with I/O to implement CLI commands.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod lint;
pub mod logging;
pub mod repair;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod watch;
