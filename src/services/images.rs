//! Downloads product images from a source into blob storage.

use std::time::Duration;

use url::Url;

use crate::domain::slug::slugify;
use crate::domain::types::{ExternalId, ProductId, SourceSlug, StoredPath, TypeConstraintError};
use crate::services::errors::ImageError;
use crate::services::fetcher::{HttpClient, HttpRequest};
use crate::services::storage::BlobStorage;

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];
const DEFAULT_EXTENSION: &str = "jpg";

/// Resolves a raw image location delivered by a source into an absolute URL.
///
/// Absolute URLs are kept, protocol-relative ones get `https:`, and relative
/// paths are joined to `base_url` with exactly one `/` between the two.
pub fn resolve_image_url(raw: &str, base_url: Option<&str>) -> Result<String, ImageError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ImageError::InvalidUrl(raw.to_string()));
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Ok(format!("https://{rest}"));
    }
    if let Ok(url) = Url::parse(raw) {
        return match url.scheme() {
            "http" | "https" => Ok(url.to_string()),
            _ => Err(ImageError::InvalidUrl(raw.to_string())),
        };
    }

    let base = base_url
        .map(|b| b.trim().trim_end_matches('/'))
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ImageError::MissingBaseUrl(raw.to_string()))?;
    let resolved = format!("{base}/{}", raw.trim_start_matches('/'));
    Url::parse(&resolved)
        .map(|url| url.to_string())
        .map_err(|_| ImageError::InvalidUrl(resolved))
}

/// Picks the file extension of a downloaded image: the URL's own extension
/// when it is a known image type, else one derived from the content type.
pub fn image_extension(url: &str, content_type: Option<&str>) -> &'static str {
    let from_path = Url::parse(url).ok().and_then(|url| {
        let last = url.path_segments()?.next_back()?.to_ascii_lowercase();
        let (_, ext) = last.rsplit_once('.')?;
        ALLOWED_EXTENSIONS.iter().find(|allowed| **allowed == ext).copied()
    });
    if let Some(ext) = from_path {
        return ext;
    }

    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some("image/jpeg" | "image/jpg" | "image/pjpeg") => "jpg",
        Some("image/png") => "png",
        Some("image/webp") => "webp",
        Some("image/gif") => "gif",
        _ => DEFAULT_EXTENSION,
    }
}

/// Relative storage directory holding the images of one product.
pub fn product_image_dir(source: &SourceSlug, product_id: ProductId) -> String {
    format!("products/{source}/{product_id}")
}

/// Fresh staging directory for the images of one source record.
///
/// Images are downloaded here before the product row exists, so no database
/// lock is held while the network is in use. Every call yields a new
/// directory, so concurrent runs importing the same record never share one.
pub fn staging_dir(source: &SourceSlug, source_id: &ExternalId) -> String {
    let key = Some(slugify(source_id.as_str()))
        .filter(|key| !key.is_empty())
        .unwrap_or_else(|| "record".to_string());
    format!("staging/{source}/{key}-{}", uuid::Uuid::new_v4().simple())
}

/// Final location of a staged image once its product is known. The file name
/// is kept.
pub fn product_image_path(
    source: &SourceSlug,
    product_id: ProductId,
    staged: &StoredPath,
) -> Result<StoredPath, TypeConstraintError> {
    let file_name = staged
        .as_str()
        .rsplit_once('/')
        .map_or(staged.as_str(), |(_, name)| name);
    StoredPath::new(format!(
        "{}/{file_name}",
        product_image_dir(source, product_id)
    ))
}

/// Fetches images and stores them under a given storage directory.
pub struct ImageAcquirer<'a, C: HttpClient, S: BlobStorage> {
    client: &'a C,
    storage: &'a S,
    timeout: Duration,
}

impl<'a, C: HttpClient, S: BlobStorage> ImageAcquirer<'a, C, S> {
    pub fn new(client: &'a C, storage: &'a S, timeout: Duration) -> Self {
        Self {
            client,
            storage,
            timeout,
        }
    }

    pub fn storage(&self) -> &S {
        self.storage
    }

    /// Downloads one image into `dir` and returns its stored path.
    ///
    /// Every failure is logged and yields `None`, so one broken image never
    /// fails the product it belongs to.
    pub fn acquire(&self, raw: &str, base_url: Option<&str>, dir: &str) -> Option<StoredPath> {
        match self.try_acquire(raw, base_url, dir) {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Failed to acquire image {raw} into {dir}: {e}");
                None
            }
        }
    }

    fn try_acquire(
        &self,
        raw: &str,
        base_url: Option<&str>,
        dir: &str,
    ) -> Result<StoredPath, ImageError> {
        let url = resolve_image_url(raw, base_url)?;
        let request = HttpRequest {
            url: &url,
            headers: Vec::new(),
            timeout: self.timeout,
        };
        let response = self.client.get(&request)?.error_for_status(&url)?;
        let extension = image_extension(&url, response.header("content-type"));

        let path = format!("{dir}/{}.{extension}", uuid::Uuid::new_v4());
        self.storage.write(&path, &response.body)?;
        StoredPath::new(path.as_str()).map_err(|_| ImageError::InvalidUrl(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::StubHttpClient;
    use crate::services::storage::FsStorage;

    #[test]
    fn resolves_absolute_and_relative_urls() {
        let base = Some("https://cdn.acme.test/");
        assert_eq!(
            resolve_image_url("http://other.test/a.png", base).unwrap(),
            "http://other.test/a.png"
        );
        assert_eq!(
            resolve_image_url("/img/a.png", base).unwrap(),
            "https://cdn.acme.test/img/a.png"
        );
        assert_eq!(
            resolve_image_url("img/a.png", Some("https://cdn.acme.test/media")).unwrap(),
            "https://cdn.acme.test/media/img/a.png"
        );
        assert_eq!(
            resolve_image_url("//cdn.acme.test/a.png", None).unwrap(),
            "https://cdn.acme.test/a.png"
        );
    }

    #[test]
    fn relative_path_without_base_fails() {
        assert!(matches!(
            resolve_image_url("/img/a.png", None),
            Err(ImageError::MissingBaseUrl(_))
        ));
        assert!(matches!(
            resolve_image_url("img/a.png", Some("  ")),
            Err(ImageError::MissingBaseUrl(_))
        ));
    }

    #[test]
    fn extension_prefers_whitelisted_url_extension() {
        assert_eq!(image_extension("https://x.test/a.PNG", Some("image/jpeg")), "png");
        assert_eq!(image_extension("https://x.test/a.webp?w=10", None), "webp");
        assert_eq!(image_extension("https://x.test/a.php", Some("image/gif")), "gif");
        assert_eq!(
            image_extension("https://x.test/render", Some("image/png; charset=binary")),
            "png"
        );
        assert_eq!(image_extension("https://x.test/render", Some("text/html")), "jpg");
        assert_eq!(image_extension("https://x.test/render", None), "jpg");
    }

    #[test]
    fn stores_image_under_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let client = StubHttpClient::default();
        client.bytes("https://cdn.acme.test/a", "image/png", b"png-bytes");
        let acquirer = ImageAcquirer::new(&client, &storage, Duration::from_secs(30));

        let path = acquirer
            .acquire("/a", Some("https://cdn.acme.test"), "staging/acme/a-1")
            .unwrap();
        assert!(path.as_str().starts_with("staging/acme/a-1/"));
        assert!(path.as_str().ends_with(".png"));
        assert_eq!(storage.read(path.as_str()).unwrap(), b"png-bytes");
    }

    #[test]
    fn failures_yield_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FsStorage::new(dir.path());
        let client = StubHttpClient::default();
        client
            .timeout("https://cdn.acme.test/slow.jpg")
            .status("https://cdn.acme.test/gone.jpg", 404);
        let acquirer = ImageAcquirer::new(&client, &storage, Duration::from_secs(30));
        let dir = "staging/acme/a-1";

        assert!(acquirer
            .acquire("slow.jpg", Some("https://cdn.acme.test"), dir)
            .is_none());
        assert!(acquirer
            .acquire("gone.jpg", Some("https://cdn.acme.test"), dir)
            .is_none());
        assert!(acquirer.acquire("rel.jpg", None, dir).is_none());
        assert!(!storage.root().join(dir).exists());
    }

    #[test]
    fn staging_directories_are_fresh_per_call() {
        let source = SourceSlug::new("acme").unwrap();
        let id = ExternalId::new("SKU 42/b").unwrap();

        let first = staging_dir(&source, &id);
        let second = staging_dir(&source, &id);
        assert!(first.starts_with("staging/acme/sku-42-b-"));
        assert_ne!(first, second);

        let odd = staging_dir(&source, &ExternalId::new("///").unwrap());
        assert!(odd.starts_with("staging/acme/record-"));
    }

    #[test]
    fn staged_image_moves_into_product_directory() {
        let source = SourceSlug::new("acme").unwrap();
        let staged = StoredPath::new("staging/acme/77-abc/f00.png").unwrap();

        let target = product_image_path(&source, ProductId::new(7).unwrap(), &staged).unwrap();
        assert_eq!(target.as_str(), "products/acme/7/f00.png");
    }
}
