use std::io::{Cursor, Read};

use log::info;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::EtlError;

/// Pull the instrument XML out of a downloaded FIRDS archive.  Entries are
/// scanned in listing order and the first file ending in `.xml` wins; FULINS
/// weeklies sometimes carry several parts and the parts are published as
/// separate archives, so one matching entry is the normal case.
pub fn extract_xml_entry(blob: &[u8]) -> Result<Vec<u8>, EtlError> {
    let mut zip = ZipArchive::new(Cursor::new(blob))?;
    let n = zip.len();
    for i in 0..n {
        let mut entry = zip.by_index(i)?;
        if !entry.is_file() || !entry.name().ends_with(".xml") {
            continue;
        }
        info!(
            "extracting {} from the archive ({} of {} entries)",
            entry.name(),
            i + 1,
            n
        );
        // the size declared in the entry header is untrusted, let the
        // buffer grow as the entry decompresses
        let mut payload = Vec::new();
        entry
            .read_to_end(&mut payload)
            .map_err(|e| EtlError::Extract(ZipError::Io(e)))?;
        return Ok(payload);
    }
    Err(EtlError::NoXmlEntry)
}
