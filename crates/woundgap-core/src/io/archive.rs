use std::io::{Cursor, Read};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{AnalysisError, Result};

use super::format::is_image_name;

/// One analyzable member of an archive: its path inside the archive and its
/// bytes, or the error that prevented reading them.
pub type ArchiveMember = (String, Result<Vec<u8>>);

/// Read the image members of a ZIP archive, in central-directory order.
///
/// Directories and members whose extension is not an image format are
/// skipped. Nested archives are skipped as well.
pub fn members(name: &str, bytes: &[u8]) -> Result<Vec<ArchiveMember>> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| AnalysisError::decode(name, e))?;

    let mut out = Vec::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                out.push((
                    format!("#{}", index + 1),
                    Err(AnalysisError::decode(name, format!("member {}: {e}", index + 1))),
                ));
                continue;
            }
        };
        let member = entry.name().to_string();
        if entry.is_dir() || !is_image_name(&member) {
            debug!(archive = name, member = %member, "skipping archive member");
            continue;
        }

        // the declared size is untrusted, so no preallocation
        let mut data = Vec::new();
        let read = entry
            .read_to_end(&mut data)
            .map(|_| data)
            .map_err(|e| AnalysisError::decode(name, format!("{member}: {e}")));
        out.push((member, read));
    }

    debug!(archive = name, members = out.len(), "archive expanded");
    Ok(out)
}
