//! Crate-level tests that exercise the modules together, starting from JSON
//! documents shaped like real API responses.
