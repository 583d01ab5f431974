//! # Domain Layer
//!
//! Pure envelope logic: the field registry, both codecs and the trailer
//! locator. No file paths, no subprocesses; those live in the adapters.
//!
//! ## Modules
//!
//! - `fields` - The ordered field registry both codecs walk
//! - `envelope` - Field set / decoded field models
//! - `binary` - Canonical binary envelope codec (trailer included)
//! - `hexline` - Checksummed hex record codec
//! - `hexenvelope` - Envelope over hex record groups
//! - `locator` - Tail-window trailer locator for hex carriers
//! - `value_objects` - Digests, version ids, offsets, configuration
//! - `errors` - Domain error types

pub mod binary;
pub mod envelope;
pub mod errors;
pub mod fields;
pub mod hexenvelope;
pub mod hexline;
pub mod locator;
pub mod value_objects;
