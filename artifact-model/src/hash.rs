use std::fmt;
use std::str;

#[rustfmt::skip]
use ct_codecs::{
    Error as CodecError,

    Hex,

    Encoder,
    Decoder
};

/// A SHA-256 digest, displayed and parsed as lowercase hex — the form used
/// throughout the manifest (`sha256sum`-style lines) and the JSON
/// `checksum` fields.
#[derive(PartialEq, Eq, Clone, Hash)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    pub fn from_bytes(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_hex(hash_hex: &str) -> Result<Self, CodecError> {
        let mut digest = [0u8; 32];
        Hex::decode(&mut digest, hash_hex, None)?;
        Ok(Self(digest))
    }

    pub fn to_hex(&self) -> String {
        // 32 raw bytes always encode to 64 lowercase hex characters.
        Hex::encode_to_string(self.0).expect("sha256 digest encodes to hex")
    }
}

impl fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sha256Digest").field(&self.to_hex()).finish()
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl str::FromStr for Sha256Digest {
    type Err = CodecError;

    fn from_str(hash_hex: &str) -> Result<Self, Self::Err> {
        Self::from_hex(hash_hex)
    }
}
