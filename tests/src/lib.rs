//! # RIL Broker Test Suite
//!
//! Unified test crate for cross-subsystem flows:
//!
//! ```text
//! tests/src/
//! ├── support.rs        # Shared fixtures and recording port mocks
//! └── integration/      # Cross-subsystem flows
//!     ├── reassembly.rs     # Dedup and reassembly properties
//!     ├── delivery_flow.rs  # State machine + pipeline end to end
//!     └── transactions.rs   # Dispatcher + wiring fallback flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rb-tests
//!
//! # By category
//! cargo test -p rb-tests integration::reassembly
//! cargo test -p rb-tests integration::delivery_flow
//! cargo test -p rb-tests integration::transactions
//! ```

#![allow(dead_code)]

pub mod support;
