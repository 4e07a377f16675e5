//! Retrieval of remote documents.
//!
//! All network access goes through the [`Fetch`] trait so the caches can be
//! exercised without a network. [`HttpFetcher`] is the production
//! implementation: a blocking `reqwest` client that negotiates for an RDF
//! syntax the graph readers understand.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::debug;

use crate::error::{ResolveError, Result};
use crate::graph::Syntax;

/// Content negotiation preference, most wanted first.
pub const RDF_ACCEPT: &str =
    "text/turtle, application/trig;q=0.95, application/rdf+xml;q=0.9, */*;q=0.1";

/// A fetched document and what the server said it is.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Location after redirects.
    pub url: String,
    pub body: String,
    pub syntax: Option<Syntax>,
}

impl FetchedDocument {
    /// The syntax announced by the server, else the one the body looks like.
    pub fn syntax(&self) -> Syntax {
        self.syntax.unwrap_or_else(|| Syntax::guess(&self.body))
    }
}

pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<FetchedDocument>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| ResolveError::Http {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(HttpFetcher { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedDocument> {
        let http_error = |err: reqwest::Error| ResolveError::Http {
            url: url.to_string(),
            message: err.to_string(),
        };

        debug!("Fetching <{}>", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, RDF_ACCEPT)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(http_error)?;

        let final_url = response.url().to_string();
        let syntax = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(Syntax::from_media_type)
            .or_else(|| Syntax::from_path(std::path::Path::new(response.url().path())));
        let body = response.text().map_err(http_error)?;

        debug!("Fetched <{}> ({} bytes, {:?})", final_url, body.len(), syntax);
        Ok(FetchedDocument {
            url: final_url,
            body,
            syntax,
        })
    }
}
