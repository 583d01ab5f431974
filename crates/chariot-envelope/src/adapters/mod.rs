//! # Adapters Layer
//!
//! Carrier adapters (file handling per carrier kind) and production
//! implementations of the outbound ports.
//!
//! - `binary` - Raw binary images, trailer-anchored envelope
//! - `hex` - Line-oriented hex images, locator-anchored envelope
//! - `elf` - ELF images, envelope installed as a section via the ports
//! - `external` - sha2 hashing, git version lookup, binutils tooling

pub mod binary;
pub mod elf;
pub mod external;
pub mod hex;
