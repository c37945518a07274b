use crate::domain::location::RepoLocation;
use crate::domain::model::TreeFile;
use crate::domain::ports::{ReadTreeResponse, UrlReader};
use crate::utils::error::{PluginError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use zip::ZipArchive;

/// Reads repository trees by downloading `<repo>/archive/<ref>.zip`.
pub struct ArchiveUrlReader {
    client: Client,
    working_dir: PathBuf,
}

impl ArchiveUrlReader {
    pub fn new(working_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            working_dir: working_dir.into(),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("📡 Downloading {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PluginError::Upstream {
                status: status.as_u16(),
                message: format!("could not read {}", url),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl UrlReader for ArchiveUrlReader {
    async fn read(&self, url: &str) -> Result<Vec<u8>> {
        self.download(url).await
    }

    async fn read_tree(&self, url: &str) -> Result<Box<dyn ReadTreeResponse>> {
        let location = RepoLocation::parse(url)?;
        let archive_url = location.archive_url();

        let data = self.download(&archive_url).await.map_err(|e| {
            PluginError::TreeMaterialization {
                message: format!("{}: {}", archive_url, e),
            }
        })?;
        tracing::info!(
            "📦 Downloaded {} ({} bytes) for {}/{}",
            archive_url,
            data.len(),
            location.owner,
            location.repo
        );

        Ok(Box::new(ZipTreeResponse::new(data, self.working_dir.clone())))
    }
}

/// A repository tree backed by an in-memory zip archive.
pub struct ZipTreeResponse {
    data: Arc<Vec<u8>>,
    working_dir: PathBuf,
}

impl ZipTreeResponse {
    pub fn new(data: Vec<u8>, working_dir: PathBuf) -> Self {
        Self {
            data: Arc::new(data),
            working_dir,
        }
    }
}

#[async_trait]
impl ReadTreeResponse for ZipTreeResponse {
    fn files(&self) -> Result<Vec<TreeFile>> {
        let mut archive = ZipArchive::new(Cursor::new(self.data.as_slice()))?;
        let entries = archive_entries(&mut archive)?;
        let root = common_root(&entries);

        let mut files = Vec::new();
        for (index, name) in entries {
            let Some(relative) = strip_root(&name, root.as_deref()) else {
                continue;
            };
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut content)?;
            files.push(TreeFile {
                path: relative.to_string_lossy().replace('\\', "/"),
                content,
            });
        }
        Ok(files)
    }

    async fn archive(&self) -> Result<Vec<u8>> {
        Ok(self.data.as_ref().clone())
    }

    async fn dir(&self) -> Result<PathBuf> {
        let data = Arc::clone(&self.data);
        let working_dir = self.working_dir.clone();

        tokio::task::spawn_blocking(move || extract(&data, &working_dir))
            .await
            .map_err(|e| PluginError::TreeMaterialization {
                message: format!("extraction task failed: {}", e),
            })?
    }
}

/// Indices and safe paths of all entries; entries escaping the target are dropped.
fn archive_entries<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
) -> Result<Vec<(usize, PathBuf)>> {
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        match entry.enclosed_name() {
            Some(name) => entries.push((index, name)),
            None => tracing::warn!("Skipping unsafe archive entry {}", entry.name()),
        }
    }
    Ok(entries)
}

/// The single top-level directory wrapping every entry (`repo-ref/` in hosted archives).
fn common_root(entries: &[(usize, PathBuf)]) -> Option<PathBuf> {
    let mut root: Option<&std::ffi::OsStr> = None;
    let mut nested = false;

    for (_, name) in entries {
        let mut components = name.components();
        let first = match components.next() {
            Some(Component::Normal(first)) => first,
            _ => return None,
        };
        match root {
            None => root = Some(first),
            Some(existing) if existing == first => {}
            Some(_) => return None,
        }
        if components.next().is_some() {
            nested = true;
        }
    }

    if nested {
        root.map(PathBuf::from)
    } else {
        None
    }
}

fn strip_root<'a>(name: &'a Path, root: Option<&Path>) -> Option<&'a Path> {
    let relative = match root {
        Some(root) => name.strip_prefix(root).ok()?,
        None => name,
    };
    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

fn extract(data: &[u8], working_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(working_dir)?;
    let target = tempfile::Builder::new()
        .prefix("techdocs-")
        .tempdir_in(working_dir)?
        .keep();

    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let entries = archive_entries(&mut archive)?;
    let root = common_root(&entries);

    let mut written = 0usize;
    for (index, name) in entries {
        let Some(relative) = strip_root(&name, root.as_deref()) else {
            continue;
        };
        let destination = target.join(relative);
        let mut entry = archive.by_index(index)?;

        if entry.is_dir() {
            std::fs::create_dir_all(&destination)?;
            continue;
        }
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(&destination)?;
        std::io::copy(&mut entry, &mut file)?;
        written += 1;
    }

    tracing::debug!("Extracted {} files into {}", written, target.display());
    Ok(target)
}
