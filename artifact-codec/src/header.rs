use std::io::{Read, Write};

use artifact_model::{HeaderInfo, Sha256Digest, TypeInfo};

use crate::checksum::ChecksumWriter;
use crate::compressor::Compressor;
use crate::error::Error;
use crate::tar_io;

/// Everything the header assembler needs for one update's `headers/NNNN/`
/// subtree.
pub struct UpdateHeaderEntry<'a> {
    pub type_info: &'a TypeInfo,
    /// `{}` is written when the caller has no meta-data.
    pub meta_data: &'a serde_json::Value,
}

/// Assembles `header-info`, sorted `scripts/*`, then `headers/NNNN/{type-info,meta-data}`
/// for each update, compressing and hashing as it writes (§4.3). `out` is
/// the temp-file sink; the returned digest is of the *compressed* bytes,
/// ready to record as `header.tar<suffix>` in the manifest.
pub fn assemble<W: Write>(
    out: W,
    compressor: Compressor,
    header_info: &HeaderInfo,
    version: u32,
    scripts: &[(String, Vec<u8>)],
    updates: &[UpdateHeaderEntry<'_>],
) -> Result<(W, Sha256Digest), Error> {
    let checksum_writer = ChecksumWriter::new(out);
    let compressed_writer = compressor.writer(checksum_writer);
    let mut builder = tar::Builder::new(compressed_writer);

    let header_info_bytes = header_info.to_json_bytes(version)?;
    tar_io::append_stream(&mut builder, "header-info", &header_info_bytes)?;

    let mut sorted_scripts: Vec<&(String, Vec<u8>)> = scripts.iter().collect();
    sorted_scripts.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, contents) in sorted_scripts {
        artifact_model::scripts::validate_name(name).map_err(Error::InvalidScriptName)?;
        tar_io::append_stream(&mut builder, &format!("scripts/{name}"), contents)?;
    }

    for (idx, update) in updates.iter().enumerate() {
        let prefix = format!("headers/{idx:04}");
        let type_info_bytes = update.type_info.to_json_bytes().map_err(artifact_model::Error::SerializeJson)?;
        tar_io::append_stream(&mut builder, &format!("{prefix}/type-info"), &type_info_bytes)?;

        let meta_data_bytes = serde_json::to_vec(update.meta_data).map_err(artifact_model::Error::SerializeJson)?;
        tar_io::append_stream(&mut builder, &format!("{prefix}/meta-data"), &meta_data_bytes)?;
    }

    let compressed_writer = builder.into_inner().map_err(Error::TarBuild)?;
    let checksum_writer = compressed_writer.finish()?;
    checksum_writer.finalize().map_err(Error::Io)
}

/// One parsed update subtree: `type-info` plus optional `meta-data`.
pub struct ParsedUpdateHeader {
    pub type_info: TypeInfo,
    pub meta_data: serde_json::Value,
}

/// Result of parsing a `header.tar<suffix>` (or `header-augment.tar<suffix>`).
pub struct ParsedHeader {
    pub header_info_bytes: Vec<u8>,
    pub scripts: Vec<(String, Vec<u8>)>,
    pub updates: Vec<ParsedUpdateHeader>,
}

/// Parses an already-decompressed inner TAR stream into its structural
/// pieces. The caller is responsible for the checksum tee and
/// decompression around `reader` (§4.6 header phase).
pub fn parse<R: Read>(reader: R) -> Result<ParsedHeader, Error> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = archive.entries().map_err(Error::TarParse)?;

    let mut header_info_bytes = None;
    let mut scripts = Vec::new();
    let mut updates: Vec<ParsedUpdateHeader> = Vec::new();

    while let Some(mut entry) = tar_io::next_entry(&mut entries)? {
        let path = entry.path().map_err(Error::TarParse)?.to_string_lossy().into_owned();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents).map_err(Error::TarParse)?;

        if path == "header-info" {
            header_info_bytes = Some(contents);
        } else if let Some(script_name) = path.strip_prefix("scripts/") {
            artifact_model::scripts::validate_name(script_name).map_err(Error::InvalidScriptName)?;
            scripts.push((script_name.to_string(), contents));
        } else if let Some(rest) = path.strip_prefix("headers/") {
            let mut parts = rest.splitn(2, '/');
            let idx: usize = parts.next().and_then(|s| s.parse().ok()).ok_or_else(|| Error::ManifestEntryMissing(path.clone()))?;
            let leaf = parts.next().ok_or_else(|| Error::ManifestEntryMissing(path.clone()))?;

            while updates.len() <= idx {
                updates.push(ParsedUpdateHeader { type_info: TypeInfo::default(), meta_data: serde_json::Value::Object(Default::default()) });
            }

            match leaf {
                "type-info" => updates[idx].type_info = TypeInfo::from_json_bytes(&contents).map_err(Error::ParseHeader)?,
                "meta-data" => updates[idx].meta_data = serde_json::from_slice(&contents).map_err(Error::ParseHeader)?,
                _ => return Err(Error::ManifestEntryMissing(path)),
            }
        } else {
            return Err(Error::ManifestEntryMissing(path));
        }
    }

    Ok(ParsedHeader {
        header_info_bytes: header_info_bytes.ok_or_else(|| Error::ManifestEntryMissing("header-info".to_string()))?,
        scripts,
        updates,
    })
}
