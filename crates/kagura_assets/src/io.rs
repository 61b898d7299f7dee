use std::path::{Path, PathBuf};
use std::sync::Arc;

use kagura_core::AssetError;

const READ_CHUNK: usize = 64 * 1024;

/// Progress callback: `(loaded_bytes, total_bytes)`.
pub type ProgressFn<'a> = &'a (dyn Fn(u64, Option<u64>) + Send + Sync);

/// Asynchronous byte source for rig and motion documents.
pub trait AssetReader: Send + Sync {
    /// Reads `uri` relative to the reader's root, reporting progress as bytes arrive.
    fn read_bytes(
        &self,
        uri: &str,
        progress: ProgressFn<'_>,
    ) -> impl std::future::Future<Output = Result<Vec<u8>, AssetError>> + Send;
}

/// Local file reader
pub struct FileAssetReader {
    root_path: PathBuf,
}

impl FileAssetReader {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root_path: root.as_ref().to_path_buf(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }
}

impl AssetReader for FileAssetReader {
    async fn read_bytes(&self, uri: &str, progress: ProgressFn<'_>) -> Result<Vec<u8>, AssetError> {
        use tokio::io::AsyncReadExt;

        let path = self.root_path.join(uri);
        let mut file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let total = file.metadata().await.ok().map(|m| m.len());
        let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            let read = file.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..read]);
            progress(data.len() as u64, total);
        }

        if data.is_empty() {
            progress(0, total);
        }
        Ok(data)
    }
}

/// HTTP reader
#[cfg(feature = "http")]
pub struct HttpAssetReader {
    root_url: url::Url,
}

#[cfg(feature = "http")]
impl HttpAssetReader {
    /// `url_str` may point at a document; its directory becomes the root.
    pub fn new(url_str: &str) -> Result<Self, AssetError> {
        let url = url::Url::parse(url_str)?;
        let root_url = if url.path().ends_with('/') {
            url
        } else {
            let mut u = url.clone();
            if let Ok(mut segments) = u.path_segments_mut() {
                segments.pop();
                segments.push("");
            }
            u
        };
        Ok(Self { root_url })
    }

    #[inline]
    #[must_use]
    pub fn root_url(&self) -> &url::Url {
        &self.root_url
    }
}

#[cfg(feature = "http")]
impl AssetReader for HttpAssetReader {
    async fn read_bytes(&self, uri: &str, progress: ProgressFn<'_>) -> Result<Vec<u8>, AssetError> {
        let url = self.root_url.join(uri)?;
        let response = ehttp::fetch_async(ehttp::Request::get(url.as_str()))
            .await
            .map_err(AssetError::Http)?;

        if !response.ok {
            if response.status == 404 {
                return Err(AssetError::NotFound(url.to_string()));
            }
            return Err(AssetError::HttpStatus {
                status: response.status,
            });
        }

        let len = response.bytes.len() as u64;
        progress(len, Some(len));
        Ok(response.bytes)
    }
}

/// Reader selected from a source string.
#[derive(Clone)]
pub enum AssetReaderVariant {
    File(Arc<FileAssetReader>),
    #[cfg(feature = "http")]
    Http(Arc<HttpAssetReader>),
}

fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

impl AssetReaderVariant {
    /// Picks a reader rooted at the directory containing `source`.
    pub fn from_source(source: &str) -> Result<Self, AssetError> {
        if is_url(source) {
            #[cfg(feature = "http")]
            {
                Ok(Self::Http(Arc::new(HttpAssetReader::new(source)?)))
            }
            #[cfg(not(feature = "http"))]
            {
                Err(AssetError::Http(format!(
                    "cannot fetch '{source}': the `http` feature is disabled"
                )))
            }
        } else {
            let root = Path::new(source).parent().unwrap_or(Path::new("."));
            Ok(Self::File(Arc::new(FileAssetReader::new(root))))
        }
    }

    pub async fn read_bytes(&self, uri: &str, progress: ProgressFn<'_>) -> Result<Vec<u8>, AssetError> {
        match self {
            Self::File(r) => r.read_bytes(uri, progress).await,
            #[cfg(feature = "http")]
            Self::Http(r) => r.read_bytes(uri, progress).await,
        }
    }

    /// The last path segment of a source.
    #[must_use]
    pub fn source_filename(source: &str) -> &str {
        if is_url(source) {
            source.rsplit('/').next().unwrap_or(source)
        } else {
            Path::new(source)
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or(source)
        }
    }
}

/// Reads one complete document from a path or URL.
pub async fn read_source(source: &str, progress: ProgressFn<'_>) -> Result<Vec<u8>, AssetError> {
    let reader = AssetReaderVariant::from_source(source)?;
    reader
        .read_bytes(AssetReaderVariant::source_filename(source), progress)
        .await
}
