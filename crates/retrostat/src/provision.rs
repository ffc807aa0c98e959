// Season data provisioning: fetch the Retrosheet archive for a year and
// unpack it under the data root.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};
use zip::ZipArchive;

use crate::config::ProvisionerConfig;
use crate::error::ProvisionError;

/// Directory holding a season's unpacked files: `<root>/<season>/`.
pub fn season_dir(root: &Path, season: i32) -> PathBuf {
    root.join(season.to_string())
}

/// The play-by-play file inside a season directory: `<season>plays.csv`.
pub fn plays_csv_path(root: &Path, season: i32) -> PathBuf {
    season_dir(root, season).join(format!("{season}plays.csv"))
}

/// Makes a season's raw event files available locally.
///
/// Implementations must leave `<season>plays.csv` in `dest` on success and
/// must not leave `dest` behind on failure, since an existing season
/// directory is taken as provisioned. Calling again for a provisioned season may redo the work but must not
/// corrupt what is already there.
pub trait Provisioner {
    fn provision(&self, season: i32, dest: &Path) -> Result<(), ProvisionError>;
}

// ---------------------------------------------------------------------------
// Retrosheet HTTP + zip provisioner
// ---------------------------------------------------------------------------

/// Downloads `<season>csvs.zip` from Retrosheet and extracts it into the
/// season directory.
pub struct RetrosheetProvisioner {
    http: reqwest::blocking::Client,
    url_template: String,
}

impl RetrosheetProvisioner {
    pub fn from_config(config: &ProvisionerConfig) -> Result<Self, ProvisionError> {
        // The blocking client defaults to a 30s timeout; `None` disables it.
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(ProvisionError::Client)?;
        Ok(Self {
            http,
            url_template: config.url_template.clone(),
        })
    }

    /// Archive URL for `season`.
    pub fn url_for(&self, season: i32) -> String {
        archive_url(&self.url_template, season)
    }

    fn download(&self, url: &str, zip_path: &Path) -> Result<(), ProvisionError> {
        let http_err = |source| ProvisionError::Http {
            url: url.to_string(),
            source,
        };

        let mut response = self
            .http
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?;

        let mut file = File::create(zip_path).map_err(|e| ProvisionError::Io {
            path: zip_path.to_path_buf(),
            source: e,
        })?;
        let bytes = response.copy_to(&mut file).map_err(http_err)?;
        info!("Downloaded {} bytes to {}", bytes, zip_path.display());
        Ok(())
    }
}

impl Provisioner for RetrosheetProvisioner {
    fn provision(&self, season: i32, dest: &Path) -> Result<(), ProvisionError> {
        let url = self.url_for(season);
        info!("Downloading retrosheet data for {} from {}", season, url);

        let extracted = install_atomically(dest, |staging| {
            let zip_path = staging.join(format!("{season}csvs.zip"));
            self.download(&url, &zip_path)?;

            info!("Unzipping {}", zip_path.display());
            let extracted = extract_archive(&zip_path, staging)?;

            std::fs::remove_file(&zip_path).map_err(|e| ProvisionError::Io {
                path: zip_path.clone(),
                source: e,
            })?;
            Ok(extracted)
        })?;

        info!("Season {} ready: {} files in {}", season, extracted, dest.display());
        Ok(())
    }
}

/// Sibling of `dest` that is filled before being renamed into place:
/// `<root>/<season>.partial`.
fn staging_dir(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    dest.with_file_name(name)
}

/// Run `fill` against an empty staging directory and move the result to
/// `dest` only if it succeeds. On failure the staging directory is removed
/// and `dest` is untouched. A leftover staging directory from an interrupted
/// run is discarded first; an existing `dest` is replaced.
pub fn install_atomically<T>(
    dest: &Path,
    fill: impl FnOnce(&Path) -> Result<T, ProvisionError>,
) -> Result<T, ProvisionError> {
    let io_err = |path: &Path, source| ProvisionError::Io {
        path: path.to_path_buf(),
        source,
    };
    let staging = staging_dir(dest);

    if staging.exists() {
        std::fs::remove_dir_all(&staging).map_err(|e| io_err(&staging, e))?;
    }
    std::fs::create_dir_all(&staging).map_err(|e| io_err(&staging, e))?;

    let result = fill(&staging).and_then(|value| {
        if dest.exists() {
            std::fs::remove_dir_all(dest).map_err(|e| io_err(dest, e))?;
        }
        std::fs::rename(&staging, dest).map_err(|e| io_err(dest, e))?;
        Ok(value)
    });

    if result.is_err() {
        if let Err(e) = std::fs::remove_dir_all(&staging) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove {}: {}", staging.display(), e);
            }
        }
    }
    result
}

/// Substitute every `{year}` in `template`.
pub fn archive_url(template: &str, season: i32) -> String {
    template.replace("{year}", &season.to_string())
}

/// Extract every file in the zip at `zip_path` into `dest`, overwriting
/// existing files. Entries whose paths would escape `dest` are skipped.
/// Returns the number of files written.
pub fn extract_archive(zip_path: &Path, dest: &Path) -> Result<usize, ProvisionError> {
    let io_err = |path: &Path, source| ProvisionError::Io {
        path: path.to_path_buf(),
        source,
    };
    let archive_err = |source| ProvisionError::Archive {
        path: zip_path.to_path_buf(),
        source,
    };

    let file = File::open(zip_path).map_err(|e| io_err(zip_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(archive_err)?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(archive_err)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("skipping archive entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| io_err(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| io_err(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| io_err(&out_path, e))?;
        written += 1;
    }

    Ok(written)
}
