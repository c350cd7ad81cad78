use std::io::Read;

use artifact_codec::compressor::Compressor;
use artifact_codec::manifest::ChecksumStore;
use artifact_codec::sign::Verifier;
use artifact_codec::{checksum, header, payload, tar_io};
use artifact_model::{ArtifactDepends, HeaderInfo, Info, TypeInfo, UpdateHandler};
use log::{debug, warn};

use crate::error::Error;
use crate::storer::UpdateStorer;

/// Whether a signature was present and, if so, whether it was checked
/// (§4.6 failure semantics). The reader never treats "present but
/// unverified" as fatal — that policy call belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStatus {
    SignedAndVerified,
    SignedUnverified,
    Unsigned,
    NoSignature,
}

/// One parsed update's structural metadata, base plus optional augment
/// overlay.
#[derive(Debug, Clone)]
pub struct ParsedUpdate {
    pub type_name: String,
    pub type_info: TypeInfo,
    pub meta_data: serde_json::Value,
    pub augment_type_info: Option<TypeInfo>,
    pub augment_meta_data: Option<serde_json::Value>,
}

/// Everything the reader recovered from a well-formed artifact.
#[derive(Debug, Clone)]
pub struct ArtifactSummary {
    pub info: Info,
    pub header_info: HeaderInfo,
    pub updates: Vec<ParsedUpdate>,
    pub scripts: Vec<(String, Vec<u8>)>,
    pub augment_artifact_depends: Option<ArtifactDepends>,
    pub signature_status: SignatureStatus,
}

/// Parses and validates an artifact from `source` in a single sequential
/// pass (§4.6). `verifier`, if given, checks `manifest.sig` when present;
/// `storer` receives every data file's bytes as they stream past.
pub fn read_artifact<R: Read>(source: R, verifier: Option<&dyn Verifier>, storer: &mut dyn UpdateStorer) -> Result<ArtifactSummary, Error> {
    let mut archive = tar::Archive::new(source);
    let mut entries = archive.entries().map_err(artifact_codec::Error::TarParse)?;

    let (name, bytes) = read_next_entry(&mut entries, "the artifact is empty")?;
    expect_name(&name, "version")?;
    let info = Info::from_json_bytes(&bytes).map_err(|err| Error::MalformedArtifact(format!("invalid 'version' entry: {err}")))?;
    let version_digest = checksum::hash_to_end(bytes.as_slice())?;
    debug!("parsed version entry: format={} version={}", info.format, info.version);

    let (name, bytes) = read_next_entry(&mut entries, "artifact ends after 'version'")?;
    expect_name(&name, "manifest")?;
    let manifest = ChecksumStore::parse(&bytes).map_err(Error::from)?;
    let manifest_raw = bytes;
    verify_digest(&manifest, "version", version_digest)?;

    let (mut name, mut bytes) = read_next_entry(&mut entries, "artifact ends after 'manifest'")?;

    // §2/§4.6 AfterManifest: the signature, if any, is checked as soon as
    // it is read — not deferred until the data phase has already streamed
    // every payload to the storer.
    let mut signature_status = SignatureStatus::NoSignature;
    if name == "manifest.sig" {
        signature_status = match verifier {
            Some(verifier) => {
                verifier.verify(&manifest_raw, &bytes).map_err(|_| Error::InvalidSignature)?;
                SignatureStatus::SignedAndVerified
            }
            None => {
                warn!("artifact is signed but no verifier was supplied");
                SignatureStatus::SignedUnverified
            }
        };
        let next = read_next_entry(&mut entries, "artifact ends after 'manifest.sig'")?;
        name = next.0;
        bytes = next.1;
    } else if verifier.is_some() {
        signature_status = SignatureStatus::Unsigned;
    }

    let mut augment_manifest = None;
    if name == "manifest-augment" {
        if info.version != 3 {
            return Err(Error::AugmentWithoutV3);
        }
        augment_manifest = Some(ChecksumStore::parse(&bytes).map_err(Error::from)?);
        let next = read_next_entry(&mut entries, "artifact ends after 'manifest-augment'")?;
        name = next.0;
        bytes = next.1;
    }

    if !name.starts_with("header.tar") {
        return Err(Error::MalformedArtifact(format!("expected 'header.tar<suffix>', found {name:?}")));
    }
    let compressor = Compressor::from_entry_name(&name).map_err(Error::from)?;
    let header_digest = checksum::hash_to_end(bytes.as_slice())?;
    verify_digest(&manifest, &name, header_digest)?;
    let parsed_header = header::parse(compressor.reader(bytes.as_slice())).map_err(Error::from)?;
    let header_info = HeaderInfo::from_json_bytes(&parsed_header.header_info_bytes, info.version).map_err(|err| Error::MalformedArtifact(err.to_string()))?;

    if header_info.updates.len() != parsed_header.updates.len() {
        return Err(Error::MalformedArtifact("header-info.updates length does not match headers/NNNN subtree count".to_string()));
    }

    let scripts = parsed_header.scripts;
    let mut updates: Vec<ParsedUpdate> = header_info
        .updates
        .iter()
        .zip(parsed_header.updates.into_iter())
        .map(|(update_type, parsed)| ParsedUpdate {
            type_name: update_type.type_name.clone(),
            type_info: parsed.type_info,
            meta_data: parsed.meta_data,
            augment_type_info: None,
            augment_meta_data: None,
        })
        .collect();

    let mut augment_artifact_depends = None;

    let pending = tar_io::next_entry(&mut entries).map_err(Error::from)?.ok_or_else(|| Error::MalformedArtifact("artifact ends after header".to_string()))?;
    let pending_name = entry_name(&pending)?;
    let mut next_slot = Some((pending, pending_name));

    let starts_with_header_augment = next_slot.as_ref().is_some_and(|(_, name)| name.starts_with("header-augment.tar"));
    if starts_with_header_augment {
        let (entry, name) = next_slot.take().unwrap();
        let augment_manifest_ref = augment_manifest.as_ref().ok_or_else(|| Error::MalformedArtifact("'header-augment.tar<suffix>' present without 'manifest-augment'".to_string()))?;
        let augment_compressor = Compressor::from_entry_name(&name).map_err(Error::from)?;
        let (_, bytes) = read_entry(entry)?;
        let augment_header_digest = checksum::hash_to_end(bytes.as_slice())?;
        verify_digest(augment_manifest_ref, &name, augment_header_digest)?;
        let parsed_augment_header = header::parse(augment_compressor.reader(bytes.as_slice())).map_err(Error::from)?;

        let augment_header_info: artifact_model::AugmentHeaderInfo =
            serde_json::from_slice(&parsed_augment_header.header_info_bytes).map_err(|err| Error::MalformedArtifact(err.to_string()))?;
        augment_artifact_depends = Some(augment_header_info.artifact_depends);

        for (idx, parsed_update) in parsed_augment_header.updates.into_iter().enumerate() {
            let update = updates.get_mut(idx).ok_or_else(|| Error::MalformedArtifact(format!("augment header references unknown update {idx:04}")))?;
            crate::augment::check_type_info_conflict(update_handler_for(&update.type_name).as_ref(), &update.type_info, &parsed_update.type_info, &[])?;
            update.augment_type_info = Some(parsed_update.type_info);
            update.augment_meta_data = Some(parsed_update.meta_data);
        }

        next_slot = match tar_io::next_entry(&mut entries).map_err(Error::from)? {
            Some(entry) => {
                let name = entry_name(&entry)?;
                Some((entry, name))
            }
            None => None,
        };
    }

    storer.initialize(&header_info)?;

    // Payload entries stream straight from the tar entry through the
    // decompressor into the storer (§5) — only the small header entries
    // above are ever materialized in full.
    for idx in 0..updates.len() {
        let (mut entry, current_name) = next_slot.take().ok_or_else(|| Error::MalformedArtifact(format!("expected payload entry for update {idx:04}, found end of archive")))?;
        let expected_prefix = format!("{idx:04}.tar");
        if !current_name.starts_with(&expected_prefix) {
            return Err(Error::MalformedArtifact(format!("expected payload entry with prefix {expected_prefix:?}, found {current_name:?}")));
        }
        let payload_compressor = Compressor::from_entry_name(&current_name).map_err(Error::from)?;
        storer.prepare_store_update()?;
        payload::read(payload_compressor.reader(&mut entry), idx, &manifest, |entry_name, size, reader| {
            storer.store_update(reader, entry_name, size).map_err(|err| artifact_codec::Error::Callback(Box::new(err)))
        })
        .map_err(Error::from)?;
        storer.finish_store_update()?;
        drop(entry);

        let has_augment_payload = updates[idx].augment_type_info.is_some() || updates[idx].augment_meta_data.is_some();

        next_slot = match tar_io::next_entry(&mut entries).map_err(Error::from)? {
            Some(candidate) => {
                let candidate_name = entry_name(&candidate)?;
                if has_augment_payload && candidate_name == current_name {
                    let augment_manifest_ref = augment_manifest.as_ref().ok_or_else(|| Error::MalformedArtifact("augmented payload present without 'manifest-augment'".to_string()))?;
                    let augment_payload_compressor = Compressor::from_entry_name(&candidate_name).map_err(Error::from)?;
                    let mut augment_entry = candidate;
                    storer.prepare_store_update()?;
                    payload::read(augment_payload_compressor.reader(&mut augment_entry), idx, augment_manifest_ref, |entry_name, size, reader| {
                        storer.store_update(reader, entry_name, size).map_err(|err| artifact_codec::Error::Callback(Box::new(err)))
                    })
                    .map_err(Error::from)?;
                    storer.finish_store_update()?;
                    drop(augment_entry);

                    match tar_io::next_entry(&mut entries).map_err(Error::from)? {
                        Some(entry) => {
                            let name = entry_name(&entry)?;
                            Some((entry, name))
                        }
                        None => None,
                    }
                } else {
                    Some((candidate, candidate_name))
                }
            }
            None => None,
        };
    }

    if let Some((_, trailing_name)) = next_slot {
        return Err(Error::MalformedArtifact(format!("unexpected trailing entry {trailing_name:?}")));
    }

    Ok(ArtifactSummary { info, header_info, updates, scripts, augment_artifact_depends, signature_status })
}

fn read_next_entry<R: Read>(entries: &mut tar::Entries<'_, R>, context: &str) -> Result<(String, Vec<u8>), Error> {
    let entry = tar_io::next_entry(entries).map_err(Error::from)?.ok_or_else(|| Error::MalformedArtifact(context.to_string()))?;
    read_entry(entry)
}

fn entry_name<R: Read>(entry: &tar::Entry<'_, R>) -> Result<String, Error> {
    Ok(entry.path().map_err(artifact_codec::Error::TarParse)?.to_string_lossy().into_owned())
}

fn read_entry<R: Read>(mut entry: tar::Entry<'_, R>) -> Result<(String, Vec<u8>), Error> {
    let name = entry.path().map_err(artifact_codec::Error::TarParse)?.to_string_lossy().into_owned();
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents).map_err(artifact_codec::Error::TarParse)?;
    Ok((name, contents))
}

fn expect_name(actual: &str, expected: &str) -> Result<(), Error> {
    if actual != expected {
        return Err(Error::MalformedArtifact(format!("expected {expected:?}, found {actual:?}")));
    }
    Ok(())
}

fn verify_digest(manifest: &ChecksumStore, path: &str, actual: artifact_model::Sha256Digest) -> Result<(), Error> {
    let expected = manifest.get(path).ok_or_else(|| Error::ManifestEntryMissing(path.to_string()))?;
    if *expected != actual {
        return Err(Error::ChecksumMismatch { path: path.to_string(), expected: expected.clone(), actual });
    }
    Ok(())
}

fn update_handler_for(type_name: &str) -> Box<dyn artifact_model::UpdateHandler> {
    if type_name == artifact_model::RootfsImage.type_name() {
        Box::new(artifact_model::RootfsImage)
    } else {
        Box::new(artifact_model::ModuleImage { module_name: type_name.to_string() })
    }
}
