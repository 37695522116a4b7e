//! Integration tests exercising the full preview flow.
//!
//! Unit tests cover each module in isolation; these suites wire the real
//! catalog, engine, cache, and refresher together the way the web layer
//! would and assert on observable end-to-end behavior.

mod preview_flow;
