//! Property-based tests for the theme preview engine
//!
//! Property tests verify invariants that should hold for all inputs, rather
//! than testing specific cases.
//!
//! ## Running Property Tests
//!
//! Run all property tests:
//! ```sh
//! cargo test property --release
//! ```
//!
//! ## Test Modules
//!
//! - `sampler_props`: Tests for deterministic sampling and scoring
//!   - Same query yields the same payload, in the same order
//!   - Payload length equals the clamped limit exactly
//!   - Seeds depend only on theme and commander
//!   - Rarity bonuses are monotonic in rarity and diminish with repeats
//!   - Overlap bonuses are monotonic with diminishing returns
//!
//! ## Configuration
//!
//! By default, proptest runs 256 cases per property. This can be configured
//! via the `PROPTEST_CASES` environment variable:
//!
//! ```sh
//! PROPTEST_CASES=1000 cargo test property --release
//! ```

mod sampler_props;
