use std::path::Path;

use anyhow::anyhow;
use hex::FromHex;
use sha1::{Digest, Sha1};
use tokio::io::AsyncReadExt;
use tracing::trace;

const CHUNK_SIZE: usize = 4096;

/// Accumulates a file's data piece by piece and checks it against an expected hash once all data
///  was seen.
pub trait ChecksumValidator: Send {
    fn add_data(&mut self, data: &[u8]);
    fn do_validate(&self) -> bool;
}

pub struct NopChecksumValidator {}

impl ChecksumValidator for NopChecksumValidator {
    fn add_data(&mut self, _data: &[u8]) {
    }

    fn do_validate(&self) -> bool {
        true
    }
}

pub struct Sha1ChecksumValidator {
    hasher: Sha1,
    expected_hash: [u8; 20],
}

impl Sha1ChecksumValidator {
    pub fn new(expected_hash: [u8; 20]) -> Sha1ChecksumValidator {
        Sha1ChecksumValidator {
            hasher: Sha1::default(),
            expected_hash,
        }
    }
}

impl ChecksumValidator for Sha1ChecksumValidator {
    fn add_data(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    fn do_validate(&self) -> bool {
        let hash = self.hasher.clone().finalize();
        trace!("validating SHA1 hash");
        hash.as_slice() == self.expected_hash.as_slice()
    }
}

pub struct Md5ChecksumValidator {
    context: md5::Context,
    expected_hash: [u8; 16],
}

impl Md5ChecksumValidator {
    pub fn new(expected_hash: [u8; 16]) -> Md5ChecksumValidator {
        Md5ChecksumValidator {
            context: md5::Context::new(),
            expected_hash,
        }
    }
}

impl ChecksumValidator for Md5ChecksumValidator {
    fn add_data(&mut self, data: &[u8]) {
        self.context.consume(data);
    }

    fn do_validate(&self) -> bool {
        let hash = self.context.clone().compute();
        trace!("validating MD5 hash");
        hash.0 == self.expected_hash
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Sha1,
    Md5,
}

impl ChecksumAlgorithm {
    pub fn extension(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::Sha1 => "sha1",
            ChecksumAlgorithm::Md5 => "md5",
        }
    }

    /// Creates a validator from the content of a checksum file. Such files contain the hex hash,
    ///  optionally followed by the file name.
    pub fn validator(&self, checksum_file: &str) -> anyhow::Result<Box<dyn ChecksumValidator>> {
        let hash = checksum_file.split_whitespace()
            .next()
            .ok_or_else(|| anyhow!("empty {} checksum file", self.extension()))?
            .to_ascii_lowercase();

        Ok(match self {
            ChecksumAlgorithm::Sha1 => Box::new(Sha1ChecksumValidator::new(<[u8; 20]>::from_hex(&hash)?)),
            ChecksumAlgorithm::Md5 => Box::new(Md5ChecksumValidator::new(<[u8; 16]>::from_hex(&hash)?)),
        })
    }
}

/// Reads a file completely in fixed-size chunks, feeding each chunk to the validator. This also
///  serves as a check that a freshly stored file is readable at all.
pub async fn verify_file(path: &Path, validator: &mut dyn ChecksumValidator) -> std::io::Result<bool> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        validator.add_data(&buf[..n]);
    }
    Ok(validator.do_validate())
}
