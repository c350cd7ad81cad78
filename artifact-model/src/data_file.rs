use crate::error::Error;
use crate::hash::Sha256Digest;

/// A single payload file. `size` and `checksum` are filled in by the codec
/// while streaming, not supplied by the caller; whatever the caller passes
/// in either field is discarded during write (§3 Data Model, DataFile
/// invariant).
#[derive(Debug, Clone)]
pub struct DataFile {
    pub name: String,
    pub size: u64,
    pub modified: std::time::SystemTime,
    pub checksum: Option<Sha256Digest>,
}

impl DataFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), size: 0, modified: std::time::SystemTime::now(), checksum: None }
    }

    pub fn validate_name(&self) -> Result<(), Error> {
        if self.name.contains('/') || self.name.contains('\\') {
            return Err(Error::DataFileNameHasPathSeparator(self.name.clone()));
        }
        Ok(())
    }
}
