//! Test suites for the container controller and its bootstrap.

pub(crate) mod support;
