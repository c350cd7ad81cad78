use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One entry of `HeaderInfo.updates`: just the update's type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateType {
    #[serde(rename = "type")]
    pub type_name: String,
}

/// `artifact_provides` as carried in a v3 `header-info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactProvides {
    pub artifact_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_group: Option<String>,
}

/// `artifact_depends` as carried in a v3 `header-info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDepends {
    pub compatible_devices: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub artifact_name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub artifact_group: Vec<String>,
}

/// The `header-info` entry inside `header.tar<suffix>`.
///
/// `compatible_devices` and `artifact_provides`/`artifact_depends` only
/// apply to version 3; version 2 serializes just `updates`,
/// `compatible_devices`, and `artifact_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub updates: Vec<UpdateType>,
    pub compatible_devices: Vec<String>,
    pub artifact_name: String,
    pub artifact_provides: Option<ArtifactProvides>,
    pub artifact_depends: Option<ArtifactDepends>,
}

impl HeaderInfo {
    pub fn validate(&self) -> Result<(), Error> {
        if self.compatible_devices.is_empty() {
            return Err(Error::EmptyCompatibleDevices);
        }
        if self.artifact_name.is_empty() {
            return Err(Error::EmptyArtifactName);
        }
        if self.artifact_name.chars().any(char::is_whitespace) {
            return Err(Error::ArtifactNameHasWhitespace(self.artifact_name.clone()));
        }
        Ok(())
    }

    pub fn to_json_bytes(&self, version: u32) -> Result<Vec<u8>, Error> {
        let mut bytes = match version {
            2 => serde_json::to_vec(&HeaderInfoV2 {
                updates: self.updates.clone(),
                compatible_devices: self.compatible_devices.clone(),
                artifact_name: self.artifact_name.clone(),
            })?,
            _ => serde_json::to_vec(&HeaderInfoV3 {
                updates: self.updates.clone(),
                artifact_provides: self.artifact_provides.clone().unwrap_or_default(),
                artifact_depends: self.artifact_depends.clone().unwrap_or_default(),
            })?,
        };
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// Parses `header-info` back out, dispatching on the artifact version
    /// the same way [`Self::to_json_bytes`] does on write.
    pub fn from_json_bytes(bytes: &[u8], version: u32) -> Result<Self, Error> {
        if version == 2 {
            let parsed: HeaderInfoV2 = serde_json::from_slice(bytes)?;
            Ok(HeaderInfo {
                updates: parsed.updates,
                compatible_devices: parsed.compatible_devices,
                artifact_name: parsed.artifact_name,
                artifact_provides: None,
                artifact_depends: None,
            })
        } else {
            let parsed: HeaderInfoV3 = serde_json::from_slice(bytes)?;
            Ok(HeaderInfo {
                updates: parsed.updates,
                compatible_devices: parsed.artifact_depends.compatible_devices.clone(),
                artifact_name: parsed.artifact_provides.artifact_name.clone(),
                artifact_provides: Some(parsed.artifact_provides),
                artifact_depends: Some(parsed.artifact_depends),
            })
        }
    }
}

#[derive(Serialize, Deserialize)]
struct HeaderInfoV2 {
    updates: Vec<UpdateType>,
    compatible_devices: Vec<String>,
    artifact_name: String,
}

#[derive(Serialize, Deserialize)]
struct HeaderInfoV3 {
    updates: Vec<UpdateType>,
    artifact_provides: ArtifactProvides,
    artifact_depends: ArtifactDepends,
}

/// Parsed form of an augmented `header-info`: v3 only, and restricted to
/// `artifact_depends` per §4.3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AugmentHeaderInfo {
    pub artifact_depends: ArtifactDepends,
}

impl AugmentHeaderInfo {
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
