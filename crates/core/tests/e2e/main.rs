//! End-to-end tests for the suite lifecycle.
//!
//! Phase commands are real `sh -c` snippets chosen per suite and phase, so
//! process groups, timeouts and interrupts are exercised for real while no
//! container tooling is needed.
//!
//! # Test Structure
//!
//! - `helpers/` -- recording phase commands and a temp-dir test bed
//! - `scenarios/` -- policy rules, timeouts and interrupts
//!
//! # Running
//!
//! ```bash
//! cargo test -p suitectl-core --test e2e
//! ```

mod helpers;
mod scenarios;
