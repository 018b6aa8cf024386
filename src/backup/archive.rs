//! `.tar.gz` archives and their `.sha256` checksum files

use super::manifest::{sha256_file, Manifest};
use crate::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const DATA_DIR: &str = "data";

/// Pack the contents of `work_dir` into `archive`
pub fn create_tar_gz(work_dir: &Path, archive: &Path) -> Result<()> {
    let file = File::create(archive)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", work_dir)?;
    let mut writer = builder.into_inner()?.finish()?;
    writer.flush()?;
    Ok(())
}

pub fn extract(archive: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(target)?;
    let decoder = GzDecoder::new(BufReader::new(File::open(archive)?));
    tar::Archive::new(decoder).unpack(target)?;
    Ok(())
}

/// Read `manifest.json` out of an archive without unpacking the data
pub fn read_manifest(archive: &Path) -> Result<Manifest> {
    let decoder = GzDecoder::new(BufReader::new(File::open(archive)?));
    let mut tar = tar::Archive::new(decoder);
    for entry in tar.entries()? {
        let mut entry = entry?;
        let is_manifest = entry
            .path()?
            .components()
            .filter(|c| !matches!(c, std::path::Component::CurDir))
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            == [MANIFEST_FILE];
        if is_manifest {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            return Ok(serde_json::from_str(&text)?);
        }
    }
    Err(Error::Backup(format!("{} has no {}", archive.display(), MANIFEST_FILE)))
}

pub fn checksum_path(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Write `<archive>.sha256` and return the digest
pub fn write_checksum(archive: &Path) -> Result<String> {
    let digest = sha256_file(archive)?;
    std::fs::write(checksum_path(archive), &digest)?;
    Ok(digest)
}

pub fn verify_checksum(archive: &Path) -> Result<()> {
    let expected = std::fs::read_to_string(checksum_path(archive)).map_err(|e| {
        Error::Backup(format!("missing checksum for {}: {}", archive.display(), e))
    })?;
    let expected = expected.split_whitespace().next().unwrap_or_default();
    let actual = sha256_file(archive)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(Error::Backup(format!(
            "checksum mismatch for {}",
            archive.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_archive_roundtrip_and_checksum() {
        let dir = TempDir::new().unwrap();
        let work = dir.path().join("work");
        std::fs::create_dir_all(work.join(DATA_DIR).join("docs")).unwrap();
        std::fs::write(work.join(DATA_DIR).join("docs/a.txt"), "alpha").unwrap();
        std::fs::write(work.join(MANIFEST_FILE), r#"{"docs/a.txt": {"deleted": true}}"#).unwrap();

        let archive = dir.path().join("full_1.tar.gz");
        create_tar_gz(&work, &archive).unwrap();
        write_checksum(&archive).unwrap();
        assert!(dir.path().join("full_1.tar.gz.sha256").exists());
        verify_checksum(&archive).unwrap();

        let manifest = read_manifest(&archive).unwrap();
        assert!(manifest["docs/a.txt"].is_deleted());

        let out = dir.path().join("out");
        extract(&archive, &out).unwrap();
        assert_eq!(std::fs::read_to_string(out.join("data/docs/a.txt")).unwrap(), "alpha");

        std::fs::write(checksum_path(&archive), "deadbeef").unwrap();
        assert!(matches!(verify_checksum(&archive), Err(Error::Backup(_))));
    }
}
