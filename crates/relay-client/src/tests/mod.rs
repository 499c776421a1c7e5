//! Test suites for the relay client runtime.

pub(crate) mod support;
