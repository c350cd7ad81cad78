use std::fs::File;
use std::io::{Read, Write};

use artifact_model::Sha256Digest;

use crate::checksum::ChecksumReader;
use crate::compressor::Compressor;
use crate::error::Error;
use crate::manifest::ChecksumStore;
use crate::tar_io;

/// One data file ready to be streamed into a payload TAR: an open,
/// rewound file handle plus the basename to record it under. The writer
/// orchestrator already hashed this file's bytes while spooling it to
/// this temp file (§9 Design Notes, tee-into-temp); the composer here just
/// streams it back out.
pub struct PayloadEntry<'a> {
    pub name: &'a str,
    pub file: &'a mut File,
}

/// Emits `NNNN.tar<suffix>` containing one stream per data file, in
/// declared order (§4.4). Unlike `header.tar<suffix>`, the payload
/// archive's own bytes are never recorded in the manifest — only the
/// individual data files are, already covered by entries added during the
/// writer's pre-pass.
pub fn assemble<W: Write>(out: W, compressor: Compressor, data_files: &mut [PayloadEntry<'_>]) -> Result<W, Error> {
    let compressed_writer = compressor.writer(out);
    let mut builder = tar::Builder::new(compressed_writer);

    for entry in data_files.iter_mut() {
        tar_io::append_file(&mut builder, entry.name, entry.file)?;
    }

    let compressed_writer = builder.into_inner().map_err(Error::TarBuild)?;
    compressed_writer.finish().map_err(Error::Io)
}

/// Parses `NNNN.tar<suffix>` sequentially, verifying each entry's digest
/// against `manifest["data/NNNN/<basename>"]` while streaming the entry's
/// bytes to `on_entry` (§4.6 data phase). The reader never buffers a full
/// entry: `on_entry` receives a tee'd reader that finalizes its own hash
/// only once fully drained, so the caller must read it to completion.
pub fn read<R: Read>(reader: R, update_index: usize, manifest: &ChecksumStore, mut on_entry: impl FnMut(&str, u64, &mut dyn Read) -> Result<(), Error>) -> Result<(), Error> {
    let mut archive = tar::Archive::new(reader);
    let mut entries = archive.entries().map_err(Error::TarParse)?;

    while let Some(entry) = tar_io::next_entry(&mut entries)? {
        let mut entry = entry;
        let name = entry.path().map_err(Error::TarParse)?.to_string_lossy().into_owned();
        let size = entry.header().size().map_err(Error::TarParse)?;
        let manifest_path = format!("data/{update_index:04}/{name}");
        let expected: Sha256Digest = manifest.get(&manifest_path).cloned().ok_or_else(|| Error::ManifestEntryMissing(manifest_path.clone()))?;

        let mut hashed = ChecksumReader::new(&mut entry);
        on_entry(&name, size, &mut hashed)?;
        let actual = hashed.finalize();

        if actual != expected {
            return Err(Error::ChecksumMismatch { path: manifest_path, expected, actual });
        }
    }

    Ok(())
}
