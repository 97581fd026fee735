use std::fmt::{Display, Formatter};
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{FusionClientError, Result};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A digest algorithm usable in the `Digest` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// The algorithm name as it appears in the `Digest` header.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Length in bytes of a raw digest.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Whether `checksum` is the base64 of a single digest of this algorithm, as opposed to a
    /// composite value such as `<b64>-<parts>`.
    pub fn is_plain_checksum(&self, checksum: &str) -> bool {
        BASE64.decode(checksum).is_ok_and(|raw| raw.len() == self.output_len())
    }

    fn hasher(&self) -> Hasher {
        match self {
            DigestAlgorithm::Sha256 => Hasher::Sha256(Sha256::new()),
            DigestAlgorithm::Sha384 => Hasher::Sha384(Sha384::new()),
            DigestAlgorithm::Sha512 => Hasher::Sha512(Sha512::new()),
        }
    }
}

impl Display for DigestAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = FusionClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "SHA-256" | "SHA256" => Ok(DigestAlgorithm::Sha256),
            "SHA-384" | "SHA384" => Ok(DigestAlgorithm::Sha384),
            "SHA-512" | "SHA512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(FusionClientError::ConfigurationError(format!("unsupported digest algorithm {s:?}"))),
        }
    }
}

enum Hasher {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha384(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha384(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// A payload together with its digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestDescriptor {
    pub content: Bytes,
    /// Base64 of `raw_checksum`.
    pub checksum: String,
    pub raw_checksum: Vec<u8>,
    pub size: u64,
}

/// Incremental digest computation, for payloads that are never held in memory as a whole.
pub struct DigestWriter {
    algorithm: DigestAlgorithm,
    hasher: Hasher,
    size: u64,
}

impl DigestWriter {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            hasher: algorithm.hasher(),
            size: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.size += data.len() as u64;
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns the base64 and the raw digest.
    pub fn finish(self) -> (String, Vec<u8>) {
        let raw = self.hasher.finalize();
        (BASE64.encode(&raw), raw)
    }
}

/// Computes digests of parts and payloads with one configured algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestProducer {
    algorithm: DigestAlgorithm,
}

impl DigestProducer {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn execute(&self, content: Bytes) -> DigestDescriptor {
        let mut writer = DigestWriter::new(self.algorithm);
        writer.update(&content);
        let (checksum, raw_checksum) = writer.finish();
        DigestDescriptor {
            size: content.len() as u64,
            content,
            checksum,
            raw_checksum,
        }
    }

    /// Reads `reader` to the end, returning the content and its digest.
    pub async fn execute_stream<R: AsyncRead + Unpin>(&self, mut reader: R) -> std::io::Result<DigestDescriptor> {
        let mut writer = DigestWriter::new(self.algorithm);
        let mut content = Vec::new();
        let mut buffer = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            writer.update(&buffer[..n]);
            content.extend_from_slice(&buffer[..n]);
        }
        let size = writer.size();
        let (checksum, raw_checksum) = writer.finish();
        Ok(DigestDescriptor {
            content: content.into(),
            checksum,
            raw_checksum,
            size,
        })
    }

    /// The `Digest` header value for a base64 checksum, `<ALGORITHM>=<checksum>`.
    pub fn header_value(&self, checksum: &str) -> String {
        format!("{}={checksum}", self.algorithm.name())
    }

    pub fn writer(&self) -> DigestWriter {
        DigestWriter::new(self.algorithm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_checksum_detection() {
        let sha256 = DigestAlgorithm::Sha256;
        assert!(sha256.is_plain_checksum("ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="));
        assert!(!sha256.is_plain_checksum("ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=-3"));
        assert!(!sha256.is_plain_checksum("YWJj"));
        assert!(!DigestAlgorithm::Sha512.is_plain_checksum("ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="));
    }

    #[test]
    fn test_known_digests() {
        let producer = DigestProducer::default();
        let descriptor = producer.execute(Bytes::from_static(b"abc"));
        assert_eq!(descriptor.checksum, "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");
        assert_eq!(descriptor.size, 3);
        assert_eq!(descriptor.raw_checksum.len(), 32);
        assert_eq!(producer.header_value(&descriptor.checksum), "SHA-256=ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");

        let empty = producer.execute(Bytes::new());
        assert_eq!(empty.checksum, "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
        assert_eq!(empty.size, 0);

        assert_eq!(DigestProducer::new(DigestAlgorithm::Sha384).execute(Bytes::new()).raw_checksum.len(), 48);
        assert_eq!(DigestProducer::new(DigestAlgorithm::Sha512).execute(Bytes::new()).raw_checksum.len(), 64);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("sha-256".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!("SHA384".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha384);
        assert_eq!(" Sha_512 ".parse::<DigestAlgorithm>().unwrap(), DigestAlgorithm::Sha512);
        assert!(matches!("MD5".parse::<DigestAlgorithm>(), Err(FusionClientError::ConfigurationError(_))));
        assert_eq!(DigestAlgorithm::Sha512.to_string(), "SHA-512");
    }

    #[tokio::test]
    async fn test_stream_matches_in_memory() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let producer = DigestProducer::new(DigestAlgorithm::Sha512);

        let streamed = producer.execute_stream(std::io::Cursor::new(data.clone())).await.unwrap();
        let direct = producer.execute(Bytes::from(data));
        assert_eq!(streamed, direct);
    }

    #[test]
    fn test_incremental_writer() {
        let producer = DigestProducer::default();
        let mut writer = producer.writer();
        writer.update(b"a");
        writer.update(b"bc");
        assert_eq!(writer.size(), 3);
        assert_eq!(writer.finish().0, producer.execute(Bytes::from_static(b"abc")).checksum);
    }
}
