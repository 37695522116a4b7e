//! Internal test suites that cut across modules.
//!
//! Unit tests live next to the code they exercise; this tree holds the
//! property-based and end-to-end suites that need crate-private access.

mod integration;
mod property;
