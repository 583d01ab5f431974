//! Cross-carrier integration tests.

mod binary_carrier;
mod elf_carrier;
mod fixtures;
mod hex_carrier;
