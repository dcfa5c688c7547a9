//! Dataset verification, download and extraction.

use crate::{common::*, config::Split, error::IdtreesError, DatasetConfig};
use md5::{Digest, Md5};

/// The remote archive of a split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub url: &'static str,
    pub md5: &'static str,
    pub filename: &'static str,
}

impl Split {
    pub fn archive(&self) -> ArchiveInfo {
        match self {
            Self::Train => ArchiveInfo {
                url: "https://zenodo.org/record/3934932/files/IDTREES_competition_train_v2.zip?download=1",
                md5: "5ddfa76240b4bb6b4a7861d1d31c299c",
                filename: "IDTREES_competition_train_v2.zip",
            },
            Self::Test => ArchiveInfo {
                url: "https://zenodo.org/record/3934932/files/IDTREES_competition_test_v2.zip?download=1",
                md5: "b108931c84a70f2a38a8234290131c9b",
                filename: "IDTREES_competition_test_v2.zip",
            },
        }
    }
}

/// Make sure the configured split is present under the root directory.
///
/// An archive already sitting in the root is extracted in place. Otherwise
/// the archive is downloaded if the configuration allows it.
pub fn verify(config: &DatasetConfig) -> Result<()> {
    let DatasetConfig {
        ref root,
        split,
        download,
        checksum,
        ..
    } = *config;
    let archive = split.archive();

    let exists = split
        .directories()
        .iter()
        .all(|dir| root.join(dir).is_dir());
    if exists {
        return Ok(());
    }

    let archive_path = root.join(archive.filename);
    if archive_path.is_file() {
        info!("extracting '{}'", archive_path.display());
        extract_archive(&archive_path, root)?;
        return Ok(());
    }

    if !download {
        return Err(IdtreesError::DatasetNotFound {
            root: root.clone(),
            split,
        }
        .into());
    }

    fs::create_dir_all(root)
        .with_context(|| format!("failed to create directory '{}'", root.display()))?;
    download_url(archive.url, &archive_path)?;

    if checksum {
        check_archive(&archive_path, archive.md5)?;
    }

    info!("extracting '{}'", archive_path.display());
    extract_archive(&archive_path, root)?;

    Ok(())
}

/// Compare the MD5 sum of a downloaded archive with the published one.
pub fn check_archive(path: &Path, md5: &str) -> Result<()> {
    let actual = md5_file(path)?;
    if actual != md5 {
        return Err(IdtreesError::ChecksumMismatch {
            path: path.to_owned(),
            expect: md5.to_string(),
            actual,
        }
        .into());
    }
    Ok(())
}

/// Fetch the content at `url` into the file `path`.
pub fn download_url(url: &str, path: &Path) -> Result<()> {
    info!("downloading '{}' to '{}'", url, path.display());

    let mut response = reqwest::blocking::get(url)
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("failed to download '{}'", url))?;
    let mut writer = BufWriter::new(
        File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?,
    );
    let size = response.copy_to(&mut writer)?;
    writer.flush()?;

    info!("downloaded {} bytes", size);
    Ok(())
}

/// Extract a zip archive into the destination directory.
pub fn extract_archive(path: &Path, dest: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("'{}' is not a zip archive", path.display()))?;
    archive
        .extract(dest)
        .with_context(|| format!("failed to extract '{}'", path.display()))?;
    Ok(())
}

/// Compute the hex-encoded MD5 sum of a file.
pub fn md5_file(path: &Path) -> Result<String> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?,
    );
    let mut hasher = Md5::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}
