use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::{Body, Client, Method, Request, Response, StatusCode, Uri};
use hyper::client::HttpConnector;
use hyper::header::{LAST_MODIFIED, USER_AGENT};
use hyper_tls::HttpsConnector;
use tracing::trace;

use crate::error::TransportError;
use crate::maven::repository::ArtifactRepository;
use crate::maven::transport::{Resource, Transport};

// Maven Central rejects requests without a user agent
const USER_AGENT_VALUE: &str = concat!("arti-model/", env!("CARGO_PKG_VERSION"));

/// Fetches and puts files over HTTP(S).
///
/// The client caches connections internally, so keeping an instance alive across requests has
///  performance benefits.
pub struct HttpTransport {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl Default for HttpTransport {
    fn default() -> Self {
        HttpTransport::new()
    }
}

impl HttpTransport {
    pub fn new() -> HttpTransport {
        HttpTransport {
            client: Client::builder()
                .build::<_, Body>(HttpsConnector::new()),
        }
    }

    fn uri(repository: &ArtifactRepository, path: &str) -> Result<Uri, TransportError> {
        let url = format!("{}/{}", repository.url.trim_end_matches('/'), path.trim_start_matches('/'));
        Uri::try_from(url.clone())
            .map_err(|e| TransportError::TransferFailed { path: url, message: e.to_string() })
    }

    async fn send(&self, method: Method, uri: Uri, body: Body) -> Result<Response<Body>, TransportError> {
        let failed = |message: String| TransportError::TransferFailed { path: uri.to_string(), message };

        let request = Request::builder()
            .method(method)
            .uri(uri.clone())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .body(body)
            .map_err(|e| failed(e.to_string()))?;

        trace!("sending {:?}", request);

        let response = self.client.request(request).await
            .map_err(|e| failed(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Err(TransportError::NotFound(uri.to_string())),
            s if s.is_success() => Ok(response),
            s => Err(failed(format!("HTTP status {}", s))),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, repository: &ArtifactRepository, path: &str) -> Result<Resource, TransportError> {
        let uri = HttpTransport::uri(repository, path)?;
        let response = self.send(Method::GET, uri.clone(), Body::empty()).await?;

        let last_modified = response.headers().get(LAST_MODIFIED)
            .and_then(|h| h.to_str().ok())
            .and_then(parse_http_date);

        let data = hyper::body::to_bytes(response.into_body()).await
            .map_err(|e| TransportError::TransferFailed { path: uri.to_string(), message: e.to_string() })?;

        Ok(Resource { data, last_modified })
    }

    async fn put(&self, data: Bytes, repository: &ArtifactRepository, path: &str) -> Result<(), TransportError> {
        let uri = HttpTransport::uri(repository, path)?;
        self.send(Method::PUT, uri, Body::from(data)).await?;
        Ok(())
    }
}

/// `Last-Modified` values are RFC 1123 dates, which RFC 2822 parsing accepts
fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

#[cfg(test)]
mod test {
    use rstest::*;
    use super::*;

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Wed, 21 Oct 2015 07:28:00 GMT").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2015-10-21T07:28:00+00:00");
        assert!(parse_http_date("yesterday").is_none());
    }

    #[rstest]
    #[case("https://repo.example.org/maven2", "org/x/maven-metadata.xml")]
    #[case("https://repo.example.org/maven2/", "/org/x/maven-metadata.xml")]
    fn test_uri(#[case] url: &str, #[case] path: &str) {
        let repository = ArtifactRepository::new("r", url);
        assert_eq!(HttpTransport::uri(&repository, path).unwrap().to_string(), "https://repo.example.org/maven2/org/x/maven-metadata.xml");
    }
}
