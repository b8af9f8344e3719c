use crate::error::{CoreError, CoreResult};
use crate::result::ValidationResult;
use std::collections::HashSet;
use std::io::{Cursor, Read};
use zip::ZipArchive;

pub const MANIFEST_ENTRY: &str = "manifest.json";
pub const PASS_ENTRY: &str = "pass.json";
pub const SIGNATURE_ENTRY: &str = "signature";
pub const ICON_1X_ENTRY: &str = "icon.png";
pub const ICON_2X_ENTRY: &str = "icon@2x.png";
pub const ICON_3X_ENTRY: &str = "icon@3x.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recognized {
    Manifest,
    Pass,
    Signature,
    Icon1x,
    Icon2x,
    Icon3x,
}

impl Recognized {
    fn from_entry_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            MANIFEST_ENTRY => Some(Self::Manifest),
            PASS_ENTRY => Some(Self::Pass),
            SIGNATURE_ENTRY => Some(Self::Signature),
            ICON_1X_ENTRY => Some(Self::Icon1x),
            ICON_2X_ENTRY => Some(Self::Icon2x),
            ICON_3X_ENTRY => Some(Self::Icon3x),
            _ => None,
        }
    }
}

/// Raw bytes of the entries the validator inspects.
#[derive(Debug, Default)]
pub struct PassEntries {
    pub manifest: Option<Vec<u8>>,
    pub pass: Option<Vec<u8>>,
    pub signature: Option<Vec<u8>>,
}

/// Opens `bytes` as a zip and pulls out the recognized entries.
///
/// Names are compared case-insensitively against the full entry path. The
/// first entry in central-directory order wins for each name; later
/// duplicates are skipped and listed in `duplicate_entries`.
///
/// Two recognized entries with byte-identical names are rejected outright:
/// the zip reader keeps only one of them, so first-wins cannot be honored.
pub fn extract_entries(bytes: &[u8], result: &mut ValidationResult) -> CoreResult<PassEntries> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| CoreError::ArchiveMalformed(e.to_string()))?;
    reject_identical_names(bytes, zip.central_directory_start(), zip.len())?;

    let mut entries = PassEntries::default();
    for i in 0..zip.len() {
        let mut f = zip
            .by_index(i)
            .map_err(|e| CoreError::ArchiveMalformed(e.to_string()))?;
        let name = f.name().to_string();
        let kind = match Recognized::from_entry_name(&name) {
            Some(k) => k,
            None => continue,
        };

        let seen = match kind {
            Recognized::Manifest => result.has_manifest,
            Recognized::Pass => result.has_pass,
            Recognized::Signature => result.has_signature,
            Recognized::Icon1x => result.has_icon1x,
            Recognized::Icon2x => result.has_icon2x,
            Recognized::Icon3x => result.has_icon3x,
        };
        if seen {
            tracing::warn!(entry = %name, "ignoring duplicate archive entry");
            result.duplicate_entries.push(name);
            continue;
        }
        tracing::debug!(entry = %name, "found archive entry");

        let slot = match kind {
            Recognized::Manifest => {
                result.has_manifest = true;
                &mut entries.manifest
            }
            Recognized::Pass => {
                result.has_pass = true;
                &mut entries.pass
            }
            Recognized::Signature => {
                result.has_signature = true;
                &mut entries.signature
            }
            Recognized::Icon1x => {
                result.has_icon1x = true;
                continue;
            }
            Recognized::Icon2x => {
                result.has_icon2x = true;
                continue;
            }
            Recognized::Icon3x => {
                result.has_icon3x = true;
                continue;
            }
        };

        let mut out = Vec::new();
        f.read_to_end(&mut out)
            .map_err(|e| CoreError::ArchiveMalformed(format!("failed to read {}: {}", name, e)))?;
        *slot = Some(out);
    }

    Ok(entries)
}

const CENTRAL_HEADER_SIGNATURE: [u8; 4] = [0x50, 0x4b, 0x01, 0x02];
const CENTRAL_HEADER_LEN: usize = 46;

/// Walks the raw central directory and fails if a recognized name occurs
/// more than once. Skipped when the reader saw as many names as records.
fn reject_identical_names(bytes: &[u8], dir_start: u64, distinct: usize) -> CoreResult<()> {
    let names = central_directory_names(bytes, dir_start)?;
    if names.len() <= distinct {
        return Ok(());
    }

    let mut seen = HashSet::new();
    for name in names {
        if Recognized::from_entry_name(&name).is_some() && !seen.insert(name.clone()) {
            tracing::warn!(entry = %name, "archive repeats an entry name");
            return Err(CoreError::ArchiveMalformed(format!(
                "more than one entry named {}",
                name
            )));
        }
    }
    Ok(())
}

fn central_directory_names(bytes: &[u8], dir_start: u64) -> CoreResult<Vec<String>> {
    let malformed = || CoreError::ArchiveMalformed("truncated central directory".to_string());
    let read_u16 = |at: usize| -> CoreResult<usize> {
        bytes
            .get(at..at + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]) as usize)
            .ok_or_else(malformed)
    };

    let mut pos = usize::try_from(dir_start).map_err(|_| malformed())?;
    let mut names = Vec::new();
    while bytes.get(pos..pos + 4) == Some(&CENTRAL_HEADER_SIGNATURE[..]) {
        let name_len = read_u16(pos + 28)?;
        let extra_len = read_u16(pos + 30)?;
        let comment_len = read_u16(pos + 32)?;
        let name_start = pos + CENTRAL_HEADER_LEN;
        let name = bytes
            .get(name_start..name_start + name_len)
            .ok_or_else(malformed)?;
        names.push(String::from_utf8_lossy(name).into_owned());
        pos = name_start + name_len + extra_len + comment_len;
    }
    Ok(names)
}
