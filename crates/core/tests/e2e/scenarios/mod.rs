//! E2E scenarios.

mod interrupt;
mod policy;
