//! # Ports Layer
//!
//! Port traits of the envelope service.
//!
//! ## Hexagonal Architecture
//!
//! - `inbound.rs` - Driving port (the metadata API the CLI calls)
//! - `outbound.rs` - Driven ports (hashing, version lookup, object tooling)

pub mod inbound;
pub mod outbound;
