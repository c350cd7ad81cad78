use std::fs::File;
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// *Stream write*: caller supplies a buffer; the USTAR header is written
/// with `size = buf.len()`, then the buffer verbatim, then NUL padding to
/// the next 512-byte boundary — all handled by `tar::Builder` (§4.1).
pub fn append_stream<W: Write>(builder: &mut tar::Builder<W>, name: &str, data: &[u8]) -> Result<(), Error> {
    let mut header = tar::Header::new_ustar();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(unix_now());
    header.set_cksum();
    builder.append_data(&mut header, name, data).map_err(Error::TarBuild)
}

/// *File write*: caller supplies an open file handle; the header takes the
/// file's real size and mtime, and contents are streamed rather than
/// buffered.
pub fn append_file<W: Write>(builder: &mut tar::Builder<W>, name: &str, file: &mut File) -> Result<(), Error> {
    builder.append_file(name, file).map_err(Error::TarBuild)
}

/// Streams an arbitrary reader of known length into one TAR entry without
/// buffering it all in memory, for payload data files (§4.4).
pub fn append_reader<W: Write, R: Read>(builder: &mut tar::Builder<W>, name: &str, reader: R, size: u64, mtime: SystemTime) -> Result<(), Error> {
    let mut header = tar::Header::new_ustar();
    header.set_size(size);
    header.set_mode(0o644);
    header.set_mtime(mtime.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0));
    header.set_cksum();
    builder.append_data(&mut header, name, reader).map_err(Error::TarBuild)
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Pulls the next entry out of a sequential TAR reader, surfacing I/O
/// failures (including a truncated archive) as [`Error::TarParse`].
pub fn next_entry<'a, R: Read>(entries: &mut tar::Entries<'a, R>) -> Result<Option<tar::Entry<'a, R>>, Error> {
    match entries.next() {
        Some(Ok(entry)) => Ok(Some(entry)),
        Some(Err(err)) => Err(Error::TarParse(err)),
        None => Ok(None),
    }
}
