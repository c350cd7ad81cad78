use std::time::SystemTime;

use artifact_codec::compressor::Compressor;
use artifact_codec::manifest::ChecksumStore;
use artifact_codec::sign::Signer;
use artifact_codec::{checksum, header, payload, tar_io};
use artifact_model::{ArtifactDepends, ArtifactProvides, DataFile, HeaderInfo, Sha256Digest, TypeInfo, UpdateKind, UpdateType};
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::augment;
use crate::error::Error;
use crate::source::PayloadInput;

/// Knobs that describe *how* the writer runs rather than *what* it
/// produces.
pub struct WriterConfig {
    /// Directory `tempfile` creates spool files in. `None` uses the system
    /// temp area.
    pub temp_dir: Option<std::path::PathBuf>,
    pub compressor: Compressor,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { temp_dir: None, compressor: Compressor::Gzip }
    }
}

/// One update's inputs to the writer: its kind, type-info, meta-data,
/// scripts, data files, and an optional augment overlay.
pub struct UpdateInput {
    pub kind: UpdateKind,
    pub type_info: TypeInfo,
    pub meta_data: serde_json::Value,
    /// `(filename, contents)` pairs; validated and sorted by the header
    /// assembler.
    pub scripts: Vec<(String, Vec<u8>)>,
    pub data_files: Vec<PayloadInput>,
    pub augment: Option<AugmentUpdateInput>,
}

/// The augment overlay for one update (§4.7).
pub struct AugmentUpdateInput {
    pub type_info: TypeInfo,
    pub meta_data: serde_json::Value,
    pub data_files: Vec<PayloadInput>,
    /// Type-info keys the caller has declared safe to differ between base
    /// and augment (e.g. `rootfs-image.checksum`).
    pub overlay_allowed_keys: Vec<String>,
}

/// The artifact-level augment overlay: just the restricted `header-info`
/// (v3, `artifact_depends` only per §4.3).
pub struct AugmentInput {
    pub artifact_depends: ArtifactDepends,
}

pub struct WriteArtifactArgs {
    pub version: u32,
    pub compatible_devices: Vec<String>,
    pub artifact_name: String,
    pub artifact_provides: Option<ArtifactProvides>,
    pub artifact_depends: Option<ArtifactDepends>,
    pub updates: Vec<UpdateInput>,
    pub signer: Option<Box<dyn Signer>>,
    pub augment: Option<AugmentInput>,
}

/// A data file that has already been spooled to a temp file and hashed.
struct HashedPayload {
    temp: NamedTempFile,
    data_file: DataFile,
}

struct HashedUpdate {
    kind: UpdateKind,
    type_info: TypeInfo,
    meta_data: serde_json::Value,
    scripts: Vec<(String, Vec<u8>)>,
    payloads: Vec<HashedPayload>,
    augment: Option<HashedAugment>,
}

struct HashedAugment {
    type_info: TypeInfo,
    meta_data: serde_json::Value,
    payloads: Vec<HashedPayload>,
}

/// Writes a well-formed artifact to `out` following the twelve-step
/// sequence in §4.5. On any failure, every temp file acquired so far is
/// dropped (and therefore removed, via `tempfile`'s own unlink-on-drop)
/// before the error propagates.
pub fn write_artifact<W: std::io::Write>(out: W, args: WriteArtifactArgs, config: &WriterConfig) -> Result<(), Error> {
    validate_args(&args)?;

    let mut main_manifest = ChecksumStore::new();
    let mut augment_manifest = ChecksumStore::new();

    info!("hashing {} update(s) into temp files", args.updates.len());
    let mut hashed_updates = Vec::with_capacity(args.updates.len());
    for (idx, update) in args.updates.into_iter().enumerate() {
        let base_payloads = spool_and_hash(update.data_files, config)?;
        for payload in &base_payloads {
            let digest = payload.data_file.checksum.clone().expect("spool_and_hash always sets checksum");
            main_manifest.add(format!("data/{idx:04}/{}", payload.data_file.name), digest)?;
        }

        let augment = match update.augment {
            Some(augment_input) => {
                augment::check_type_info_conflict(update.kind.handler(), &update.type_info, &augment_input.type_info, &augment_input.overlay_allowed_keys)?;

                let payloads = spool_and_hash(augment_input.data_files, config)?;
                for payload in &payloads {
                    let digest = payload.data_file.checksum.clone().expect("spool_and_hash always sets checksum");
                    augment_manifest.add(format!("data/{idx:04}/{}", payload.data_file.name), digest)?;
                }
                Some(HashedAugment { type_info: augment_input.type_info, meta_data: augment_input.meta_data, payloads })
            }
            None => None,
        };

        hashed_updates.push(HashedUpdate { kind: update.kind, type_info: update.type_info, meta_data: update.meta_data, scripts: update.scripts, payloads: base_payloads, augment });
    }

    let header_info = build_header_info(&args.compatible_devices, &args.artifact_name, args.artifact_provides, args.artifact_depends, &hashed_updates);
    let suffix = config.compressor.suffix();

    debug!("assembling header.tar{suffix}");
    let header_temp = new_temp(config)?;
    let header_entries: Vec<header::UpdateHeaderEntry<'_>> = hashed_updates.iter().map(|u| header::UpdateHeaderEntry { type_info: &u.type_info, meta_data: &u.meta_data }).collect();
    let all_scripts: Vec<(String, Vec<u8>)> = hashed_updates.iter().flat_map(|u| u.scripts.iter().cloned()).collect();
    let header_writer = header_temp.reopen().map_err(artifact_codec::Error::CreateTempFile)?;
    let (_, header_digest) = header::assemble(header_writer, config.compressor, &header_info, args.version, &all_scripts, &header_entries)?;
    main_manifest.add(format!("header.tar{suffix}"), header_digest)?;

    let has_augmented_updates = hashed_updates.iter().any(|u| u.augment.is_some());
    let augment_header_temp = match &args.augment {
        Some(augment_input) => {
            debug!("assembling header-augment.tar{suffix}");
            let augment_header_info = artifact_model::AugmentHeaderInfo { artifact_depends: augment_input.artifact_depends.clone() };
            let augment_header_info_bytes = augment_header_info.to_json_bytes()?;
            let temp = new_temp(config)?;
            let writer = temp.reopen().map_err(artifact_codec::Error::CreateTempFile)?;
            let digest = assemble_augment_header(writer, config.compressor, &augment_header_info_bytes, &hashed_updates)?;
            augment_manifest.add(format!("header-augment.tar{suffix}"), digest)?;
            Some(temp)
        }
        None if has_augmented_updates => return Err(Error::InvalidParameters("augment data files supplied without an artifact-level augment overlay".to_string())),
        None => None,
    };

    let mut builder = tar::Builder::new(out);

    let info_bytes = artifact_model::Info::new(args.version).to_json_bytes().map_err(artifact_model::Error::SerializeJson)?;
    tar_io::append_stream(&mut builder, "version", &info_bytes)?;
    let version_digest = checksum::hash_to_end(info_bytes.as_slice())?;
    main_manifest.add("version", version_digest)?;

    let manifest_bytes = main_manifest.raw();
    tar_io::append_stream(&mut builder, "manifest", &manifest_bytes)?;

    if let Some(signer) = &args.signer {
        debug!("signing manifest");
        let signature = signer.sign(&manifest_bytes).map_err(Error::SignFailed)?;
        tar_io::append_stream(&mut builder, "manifest.sig", &signature)?;
    }

    if !augment_manifest.is_empty() {
        let augment_manifest_bytes = augment_manifest.raw();
        tar_io::append_stream(&mut builder, "manifest-augment", &augment_manifest_bytes)?;
    }

    stream_temp(&mut builder, &format!("header.tar{suffix}"), &header_temp)?;
    if let Some(augment_temp) = &augment_header_temp {
        stream_temp(&mut builder, &format!("header-augment.tar{suffix}"), augment_temp)?;
    }

    for (idx, update) in hashed_updates.into_iter().enumerate() {
        let payload_name = format!("{idx:04}.tar{suffix}");
        debug!("streaming payload {payload_name}");
        assemble_and_stream_payload(&mut builder, config, &payload_name, update.payloads)?;

        if let Some(augment) = update.augment {
            assemble_and_stream_payload(&mut builder, config, &payload_name, augment.payloads)?;
        }
    }

    builder.into_inner().map_err(Error::Io)?;
    info!("artifact written successfully");
    Ok(())
}

fn validate_args(args: &WriteArtifactArgs) -> Result<(), Error> {
    if args.version == 1 {
        return Err(if args.signer.is_some() { Error::SignatureRequiredVersion(1) } else { Error::InvalidVersion(1) });
    }
    if args.version != 2 && args.version != 3 {
        return Err(Error::InvalidVersion(args.version));
    }
    if args.updates.is_empty() {
        return Err(Error::InvalidParameters("updates list must not be empty".to_string()));
    }
    let name_check = HeaderInfo { updates: Vec::new(), compatible_devices: args.compatible_devices.clone(), artifact_name: args.artifact_name.clone(), artifact_provides: None, artifact_depends: None };
    name_check.validate().map_err(|err| Error::InvalidParameters(err.to_string()))?;
    let has_augment = args.augment.is_some() || args.updates.iter().any(|u| u.augment.is_some());
    if has_augment && args.version != 3 {
        return Err(Error::AugmentWithoutV3);
    }
    for update in &args.updates {
        for input in update.data_files.iter().chain(update.augment.iter().flat_map(|a| a.data_files.iter())) {
            artifact_model::DataFile::new(input.name.clone()).validate_name().map_err(|err| Error::InvalidParameters(err.to_string()))?;
        }
        for (script_name, _) in &update.scripts {
            artifact_model::scripts::validate_name(script_name).map_err(|err| Error::InvalidParameters(err.to_string()))?;
        }
    }
    Ok(())
}

fn new_temp(config: &WriterConfig) -> Result<NamedTempFile, Error> {
    let temp = match &config.temp_dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    };
    temp.map_err(|err| Error::from(artifact_codec::Error::CreateTempFile(err)))
}

fn spool_and_hash(inputs: Vec<PayloadInput>, config: &WriterConfig) -> Result<Vec<HashedPayload>, Error> {
    let mut out = Vec::with_capacity(inputs.len());
    for mut input in inputs {
        let temp = new_temp(config)?;
        let writer = temp.reopen().map_err(artifact_codec::Error::CreateTempFile)?;
        let mut hashing_writer = checksum::ChecksumWriter::new(writer);
        std::io::copy(&mut input.reader, &mut hashing_writer)?;
        let (_, digest) = hashing_writer.finalize()?;
        let size = temp.as_file().metadata()?.len();
        out.push(HashedPayload { temp, data_file: DataFile { name: input.name, size, modified: SystemTime::now(), checksum: Some(digest) } });
    }
    Ok(out)
}

/// Mirrors [`header::assemble`] but restricted to per-update augment
/// entries, since augment `header-info` omits everything but
/// `artifact_depends` and non-augmented updates contribute nothing here
/// (§4.3).
fn assemble_augment_header(out: std::fs::File, compressor: Compressor, header_info_bytes: &[u8], hashed_updates: &[HashedUpdate]) -> Result<Sha256Digest, Error> {
    let checksum_writer = checksum::ChecksumWriter::new(out);
    let compressed_writer = compressor.writer(checksum_writer);
    let mut builder = tar::Builder::new(compressed_writer);

    tar_io::append_stream(&mut builder, "header-info", header_info_bytes)?;

    for (idx, update) in hashed_updates.iter().enumerate() {
        if let Some(augment) = &update.augment {
            let prefix = format!("headers/{idx:04}");
            let type_info_bytes = augment.type_info.to_json_bytes().map_err(artifact_model::Error::SerializeJson)?;
            tar_io::append_stream(&mut builder, &format!("{prefix}/type-info"), &type_info_bytes)?;
            let meta_data_bytes = serde_json::to_vec(&augment.meta_data).map_err(artifact_model::Error::SerializeJson)?;
            tar_io::append_stream(&mut builder, &format!("{prefix}/meta-data"), &meta_data_bytes)?;
        }
    }

    let compressed_writer = builder.into_inner().map_err(artifact_codec::Error::TarBuild)?;
    let checksum_writer = compressed_writer.finish().map_err(artifact_codec::Error::Io)?;
    let (_, digest) = checksum_writer.finalize().map_err(artifact_codec::Error::Io)?;
    Ok(digest)
}

/// `HeaderInfo::to_json_bytes` takes `artifact_name`/`compatible_devices`
/// for v2 straight from the flat fields, but for v3 takes them from
/// `artifact_provides.artifact_name`/`artifact_depends.compatible_devices`
/// instead (mirroring `HeaderInfo::from_json_bytes`'s v3 read path) — so
/// the nested structures are always derived from the flat ones here,
/// extended with whatever extra fields (`artifact_group`, depends'
/// `artifact_name`/`artifact_group`) the caller supplied.
fn build_header_info(compatible_devices: &[String], artifact_name: &str, artifact_provides: Option<ArtifactProvides>, artifact_depends: Option<ArtifactDepends>, updates: &[HashedUpdate]) -> HeaderInfo {
    let provides = ArtifactProvides { artifact_name: artifact_name.to_string(), artifact_group: artifact_provides.and_then(|p| p.artifact_group) };
    let depends = ArtifactDepends {
        compatible_devices: compatible_devices.to_vec(),
        artifact_name: artifact_depends.as_ref().map(|d| d.artifact_name.clone()).unwrap_or_default(),
        artifact_group: artifact_depends.map(|d| d.artifact_group).unwrap_or_default(),
    };
    HeaderInfo {
        updates: updates.iter().map(|u| UpdateType { type_name: u.kind.type_name().to_string() }).collect(),
        compatible_devices: compatible_devices.to_vec(),
        artifact_name: artifact_name.to_string(),
        artifact_provides: Some(provides),
        artifact_depends: Some(depends),
    }
}

fn stream_temp<W: std::io::Write>(builder: &mut tar::Builder<W>, name: &str, temp: &NamedTempFile) -> Result<(), Error> {
    let mut file = temp.reopen().map_err(artifact_codec::Error::CreateTempFile)?;
    tar_io::append_file(builder, name, &mut file)?;
    Ok(())
}

fn assemble_and_stream_payload<W: std::io::Write>(builder: &mut tar::Builder<W>, config: &WriterConfig, name: &str, payloads: Vec<HashedPayload>) -> Result<(), Error> {
    let payload_temp = new_temp(config)?;
    let writer = payload_temp.reopen().map_err(artifact_codec::Error::CreateTempFile)?;

    let mut open_files: Vec<(String, std::fs::File)> = Vec::with_capacity(payloads.len());
    for payload in &payloads {
        let file = payload.temp.reopen().map_err(artifact_codec::Error::CreateTempFile)?;
        open_files.push((payload.data_file.name.clone(), file));
    }
    let mut entries: Vec<payload::PayloadEntry<'_>> = open_files.iter_mut().map(|(name, file)| payload::PayloadEntry { name: name.as_str(), file }).collect();
    payload::assemble(writer, config.compressor, &mut entries)?;
    drop(entries);
    drop(open_files);

    stream_temp(builder, name, &payload_temp)
}
