//! # CHARIOT Metadata Test Suite
//!
//! Unified test crate for cross-carrier behavior: everything that spans
//! more than one module of `chariot-envelope` lives here; single-module
//! behavior is tested beside the code it exercises.
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── binary_carrier.rs   # Reference bytes, trailer invariants
//!     ├── hex_carrier.rs      # Locator matrix, corruption rejection
//!     ├── elf_carrier.rs      # Service flow over fake object tooling
//!     └── fixtures.rs         # Shared field sets and fake ports
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p chariot-tests
//! cargo test -p chariot-tests integration::hex_carrier::
//! ```

#[cfg(test)]
mod integration;
