use std::borrow::Cow;
use std::future::Future;
use std::io;
use std::marker::PhantomData;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use rust_embed::RustEmbed;
use tracing::info;

pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = io::Result<Option<Bytes>>> + Send + 'a>>;

/// Byte store keyed by URL path (leading `/`).
///
/// `Ok(None)` means not found; `Err` is reserved for store failures.
pub trait ContentProvider: Send + Sync + 'static {
    /// Short label for logs.
    fn kind(&self) -> &'static str;

    fn load<'a>(&'a self, path: &'a str) -> LoadFuture<'a>;
}

/// Files under a root directory.
pub struct FsProvider {
    root: PathBuf,
}

impl FsProvider {
    /// An empty root means the current directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root.to_path_buf()
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL path onto the root, refusing `..` and absolute components.
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }
}

impl ContentProvider for FsProvider {
    fn kind(&self) -> &'static str {
        "filesystem"
    }

    fn load<'a>(&'a self, path: &'a str) -> LoadFuture<'a> {
        Box::pin(async move {
            let Some(file) = self.resolve(path) else {
                return Ok(None);
            };
            match tokio::fs::metadata(&file).await {
                Ok(meta) if meta.is_file() => {}
                Ok(_) => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e),
            }
            tokio::fs::read(&file).await.map(|data| Some(Bytes::from(data)))
        })
    }
}

/// The frontend build compiled into the binary.
#[derive(RustEmbed)]
#[folder = "../frontend/dist/"]
pub struct FrontendAssets;

/// Assets embedded with `rust-embed`.
pub struct EmbeddedProvider<E: RustEmbed = FrontendAssets> {
    _assets: PhantomData<fn() -> E>,
}

impl<E: RustEmbed> EmbeddedProvider<E> {
    pub fn new() -> Self {
        Self {
            _assets: PhantomData,
        }
    }
}

impl<E: RustEmbed> Default for EmbeddedProvider<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RustEmbed + 'static> ContentProvider for EmbeddedProvider<E> {
    fn kind(&self) -> &'static str {
        "embedded"
    }

    fn load<'a>(&'a self, path: &'a str) -> LoadFuture<'a> {
        let key = path.trim_start_matches('/');
        let data = E::get(key).map(|file| match file.data {
            Cow::Borrowed(bytes) => Bytes::from_static(bytes),
            Cow::Owned(bytes) => Bytes::from(bytes),
        });
        Box::pin(async move { Ok(data) })
    }
}

/// Filesystem when a local path is configured or debug is on, embedded
/// assets otherwise.
pub fn select_provider(local_path: &str, debug: bool) -> Arc<dyn ContentProvider> {
    if !local_path.is_empty() || debug {
        info!(path = %local_path, "Serving static files from local path");
        Arc::new(FsProvider::new(local_path))
    } else {
        info!("Serving static files from embedded resources");
        Arc::new(EmbeddedProvider::<FrontendAssets>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_under_root() {
        let p = FsProvider::new("/srv/www");
        assert_eq!(
            p.resolve("/static/js/app.js.gz"),
            Some(PathBuf::from("/srv/www/static/js/app.js.gz"))
        );
    }

    #[test]
    fn resolve_rejects_parent_dir() {
        let p = FsProvider::new("/srv/www");
        assert!(p.resolve("/static/../../etc/passwd.gz").is_none());
    }

    #[test]
    fn empty_root_is_current_dir() {
        assert_eq!(FsProvider::new("").root(), Path::new("."));
    }

    #[test]
    fn selection() {
        assert_eq!(select_provider("", false).kind(), "embedded");
        assert_eq!(select_provider("", true).kind(), "filesystem");
        assert_eq!(select_provider("frontend/dist", false).kind(), "filesystem");
    }

    #[tokio::test]
    async fn embedded_index_present() {
        let provider = EmbeddedProvider::<FrontendAssets>::new();
        let data = provider.load("/index.html.gz").await.unwrap().unwrap();
        // gzip magic
        assert_eq!(&data[..2], &[0x1f, 0x8b]);
        assert!(provider.load("/missing.gz").await.unwrap().is_none());
    }
}
