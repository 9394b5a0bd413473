//! URL authorization with fallback to the original URL.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::Result;
use crate::source::{RasterHandle, RasterSource};

/// Turns an asset URL into an access-authorized URL.
#[async_trait]
pub trait UrlSigner: Send + Sync {
    async fn sign(&self, url: &str) -> Result<String>;
}

/// Signer that leaves URLs untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSigner;

#[async_trait]
impl UrlSigner for NoopSigner {
    async fn sign(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }
}

/// A [`RasterSource`] that signs URLs before opening them.
///
/// A signing failure, or a failure to open the signed URL, is not fatal:
/// the original URL is opened instead.
pub struct SignedSource<S, G> {
    inner: S,
    signer: G,
}

impl<S, G> SignedSource<S, G>
where
    S: RasterSource,
    G: UrlSigner,
{
    pub fn new(inner: S, signer: G) -> Self {
        Self { inner, signer }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S, G> RasterSource for SignedSource<S, G>
where
    S: RasterSource,
    G: UrlSigner,
{
    async fn open(&self, url: &str) -> Result<Box<dyn RasterHandle>> {
        let signed = match self.signer.sign(url).await {
            Ok(signed) => signed,
            Err(e) => {
                warn!(url = %url, error = %e, "URL signing failed, using original URL");
                return self.inner.open(url).await;
            }
        };

        if signed == url {
            return self.inner.open(url).await;
        }

        match self.inner.open(&signed).await {
            Ok(handle) => {
                debug!(url = %url, "Opened signed URL");
                Ok(handle)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Signed URL failed to open, retrying original URL");
                self.inner.open(url).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RasterError;
    use crate::source::{MemoryRaster, MemoryRasterSource};
    use crate::types::{GeoTransform, SampleBuffer};
    use projection::GeoKeys;

    struct FailingSigner;

    #[async_trait]
    impl UrlSigner for FailingSigner {
        async fn sign(&self, _url: &str) -> Result<String> {
            Err(RasterError::StorageError("token service unavailable".into()))
        }
    }

    struct SuffixSigner;

    #[async_trait]
    impl UrlSigner for SuffixSigner {
        async fn sign(&self, url: &str) -> Result<String> {
            Ok(format!("{}?sig=abc", url))
        }
    }

    fn source() -> MemoryRasterSource {
        let raster = MemoryRaster::new(
            2,
            2,
            GeoTransform::new(0.0, 2.0, 1.0, -1.0),
            GeoKeys::geographic_wgs84(),
            vec![SampleBuffer::U8(vec![1, 2, 3, 4])],
        )
        .unwrap();
        MemoryRasterSource::new().with_raster("mem://item/red.tif", raster)
    }

    #[tokio::test]
    async fn test_signing_failure_falls_back_to_original() {
        let signed = SignedSource::new(source(), FailingSigner);
        let handle = signed.open("mem://item/red.tif").await.unwrap();
        assert_eq!(handle.metadata().width, 2);
    }

    #[tokio::test]
    async fn test_unopenable_signed_url_falls_back() {
        // The signed URL is unknown to the memory source
        let signed = SignedSource::new(source(), SuffixSigner);
        let mut handle = signed.open("mem://item/red.tif").await.unwrap();
        handle.close();
        assert_eq!(signed.inner().opened_total(), 1);
        assert_eq!(signed.inner().open_handles(), 0);
    }
}
