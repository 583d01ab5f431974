//! Streaming sha-256 file hashing.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::domain::errors::MetaResult;
use crate::domain::value_objects::Sha256Digest;
use crate::ports::outbound::FileHasher;

/// In-process hasher; the whole file is streamed, never held in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha2FileHasher;

impl FileHasher for Sha2FileHasher {
    fn sha256_of_file(&self, path: &Path) -> MetaResult<Sha256Digest> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let read = file.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(Sha256Digest(hasher.finalize().into()))
    }
}
