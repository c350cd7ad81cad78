use serde::{Deserialize, Serialize};

/// The `version` entry: the very first thing written into, and read from,
/// an artifact. Serialized as canonical JSON with a single trailing
/// newline — see [`Info::to_json_bytes`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub format: String,
    pub version: u32,
}

impl Info {
    pub const FORMAT: &'static str = "mender";

    pub fn new(version: u32) -> Self {
        Self { format: Self::FORMAT.to_string(), version }
    }

    /// Canonical serialization: sorted keys, exactly one trailing newline.
    /// `serde_json` already emits `format` before `version` because that is
    /// field declaration order and `Info` has no `HashMap` fields, so a
    /// plain `to_vec` is already in the only key order these two fields can
    /// take.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
