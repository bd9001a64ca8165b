//! Conditional fetch of the upstream playlist page.
//!
//! The last origin ETag is sent as `If-None-Match`. On `304 Not Modified` the
//! previously parsed document is served from the cache; if that document has
//! already been evicted, the page is fetched once more without validation.

use crate::{
    cache::{CacheStore, CacheValue, DOCUMENT_KEY, ETAG_KEY},
    config::CacheTtls,
    document::Document,
    error::{PlaylistError, Result},
    metrics,
};
use encoding_rs::{Encoding, UTF_8};
use reqwest::{Client, Response, StatusCode, header};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// First attempt plus one forced unconditional refetch.
const MAX_ATTEMPTS: u32 = 2;

/// Result of a successful origin fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Origin sent a new body; it was parsed and cached.
    Downloaded(Arc<Document>),
    /// Origin reported no change; this is the cached document.
    Unchanged(Arc<Document>),
}

impl FetchOutcome {
    pub fn document(&self) -> &Arc<Document> {
        match self {
            FetchOutcome::Downloaded(doc) | FetchOutcome::Unchanged(doc) => doc,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, FetchOutcome::Unchanged(_))
    }
}

/// Fetches and parses the origin page, keeping ETag and document in the cache.
#[derive(Clone, Debug)]
pub struct OriginFetcher {
    client: Client,
    store: CacheStore,
    ttls: CacheTtls,
}

impl OriginFetcher {
    pub fn new(client: Client, store: CacheStore, ttls: CacheTtls) -> Self {
        Self {
            client,
            store,
            ttls,
        }
    }

    /// Fetch `url`, revalidating against the cached ETag when
    /// `use_validation` is set.
    ///
    /// # Errors
    /// - [`PlaylistError::OriginFetch`] on transport failure (not retried)
    /// - [`PlaylistError::OriginStatus`] for anything but 2xx/304
    /// - [`PlaylistError::Decode`] / [`PlaylistError::Parse`] for bad bodies
    /// - [`PlaylistError::CacheInconsistent`] if the forced refetch is
    ///   answered with 304 as well
    pub async fn fetch_document(&self, url: &str, use_validation: bool) -> Result<FetchOutcome> {
        let mut validate = use_validation;

        for attempt in 1..=MAX_ATTEMPTS {
            let mut request = self.client.get(url);
            if validate && let Some(etag) = self.store.etag() {
                debug!("Revalidating {} with ETag {}", url, etag);
                request = request.header(header::IF_NONE_MATCH, etag);
            }

            let response = request.send().await.map_err(|e| {
                warn!("Origin fetch failed for {}: {}", url, e);
                metrics::record_origin_error();
                e
            })?;

            let status = response.status();
            info!(
                "Got status {} from origin {} (attempt {}/{})",
                status, url, attempt, MAX_ATTEMPTS
            );

            if status == StatusCode::NOT_MODIFIED {
                if let Some(doc) = self.store.document() {
                    metrics::record_origin_fetch("unchanged");
                    return Ok(FetchOutcome::Unchanged(doc));
                }
                warn!(
                    "Origin reported no change but the document cache is empty, refetching {} unconditionally",
                    url
                );
                metrics::record_origin_fetch("refetch");
                validate = false;
                continue;
            }

            if !status.is_success() {
                metrics::record_origin_error();
                return Err(PlaylistError::OriginStatus(status));
            }

            let doc = self.store_response(response).await?;
            metrics::record_origin_fetch("downloaded");
            return Ok(FetchOutcome::Downloaded(doc));
        }

        Err(PlaylistError::CacheInconsistent)
    }

    /// Decode and parse a 2xx response, then cache its ETag and document.
    async fn store_response(&self, response: Response) -> Result<Arc<Document>> {
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        let text = decode_body(&bytes, content_type.as_deref())?;
        let doc = Arc::new(Document::parse(&text)?);

        if let Some(etag) = etag.filter(|tag| !tag.is_empty()) {
            self.store.set(ETAG_KEY, CacheValue::ETag(etag), self.ttls.etag);
        }
        self.store.set(
            DOCUMENT_KEY,
            CacheValue::Document(doc.clone()),
            self.ttls.document,
        );

        info!("Cached origin document ({} bytes)", bytes.len());
        Ok(doc)
    }
}

/// Extract the `charset` parameter from a `Content-Type` value.
fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

/// Decode a response body using its declared charset (UTF-8 if none).
///
/// A byte order mark overrides the declared charset. Unknown labels and
/// malformed byte sequences are errors, never silently replaced.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Result<String> {
    let declared = match content_type.and_then(charset_from_content_type) {
        Some(label) => Encoding::for_label(label.as_bytes())
            .ok_or_else(|| PlaylistError::Decode(format!("unknown charset '{}'", label)))?,
        None => UTF_8,
    };

    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => (declared, bytes),
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            PlaylistError::Decode(format!("malformed {} byte sequence", encoding.name()))
        })
}
