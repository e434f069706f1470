use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;

use crate::foundation::error::{FetchError, ReportError, ReportResult};

/// Resolves an image reference to its raw bytes.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches `http(s)://` URLs over the network, decodes `data:` URIs inline and reads anything
/// else from the local filesystem.
#[derive(Clone, Debug)]
pub struct HttpImageSource {
    client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(timeout: Duration) -> ReportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReportError::generation(format!("build http client: {e}")))?;
        Ok(Self { client })
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    #[tracing::instrument(level = "debug", skip(self, url), fields(url = %short_ref(url)))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("data:") {
            return decode_data_uri(url);
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.fetch_remote(url).await;
        }
        tokio::fs::read(url).await.map_err(|source| FetchError::Io {
            path: url.to_string(),
            source,
        })
    }
}

/// Decode a `data:[<mediatype>][;base64],<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, FetchError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| FetchError::DataUri("missing 'data:' prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| FetchError::DataUri("missing ',' separator".to_string()))?;

    if header.ends_with(";base64") {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        return base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| FetchError::DataUri(e.to_string()));
    }
    percent_decode(payload)
}

fn percent_decode(s: &str) -> Result<Vec<u8>, FetchError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| FetchError::DataUri(format!("bad escape at byte {i}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Reference suitable for logs; `data:` URIs are cut down to their header.
pub(crate) fn short_ref(url: &str) -> &str {
    if url.starts_with("data:") {
        return url.split_once(',').map_or(url, |(head, _)| head);
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_data_uri_decodes() {
        let bytes = decode_data_uri("data:image/png;base64,AAEC/w==").unwrap();
        assert_eq!(bytes, [0u8, 1, 2, 255]);
    }

    #[test]
    fn plain_data_uri_is_percent_decoded() {
        let bytes = decode_data_uri("data:text/plain,a%20b").unwrap();
        assert_eq!(bytes, b"a b");
        assert!(decode_data_uri("data:text/plain,%zz").is_err());
    }

    #[test]
    fn malformed_data_uri_is_rejected() {
        assert!(decode_data_uri("data:image/png;base64").is_err());
        assert!(decode_data_uri("data:image/png;base64,***").is_err());
        assert!(decode_data_uri("image/png;base64,AAAA").is_err());
    }

    #[test]
    fn short_ref_hides_payload() {
        assert_eq!(short_ref("data:image/png;base64,AAAA"), "data:image/png;base64");
        assert_eq!(short_ref("https://a.test/x.png"), "https://a.test/x.png");
    }

    #[tokio::test]
    async fn local_paths_are_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.bin");
        std::fs::write(&path, [7u8, 8, 9]).unwrap();

        let source = HttpImageSource::new(Duration::from_secs(1)).unwrap();
        let path_str = path.to_str().unwrap();
        assert_eq!(source.fetch(path_str).await.unwrap(), [7u8, 8, 9]);

        let missing = dir.path().join("missing.bin");
        let err = source.fetch(missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }
}
