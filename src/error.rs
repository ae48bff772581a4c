use thiserror::Error;

/// A page or spreadsheet could not be downloaded.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Fetched content did not have the shape the extractor expects.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("{url}: no `{selector}` container found")]
    MissingContainer { url: String, selector: &'static str },

    #[error("{url} does not belong to any configured question site")]
    UnknownSite { url: String },

    #[error("spreadsheet {url} could not be read: {reason}")]
    Spreadsheet { url: String, reason: String },

    #[error("sitemap could not be parsed: {0}")]
    Sitemap(#[from] quick_xml::Error),

    #[error("invalid url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// An external enrichment service call failed.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} answered with HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("{service} returned an unexpected body: {reason}")]
    Malformed { service: &'static str, reason: String },

    #[error("translator returned {got} results for {sent} inputs")]
    Misaligned { sent: usize, got: usize },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("json encoding for {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("no current evaluation date found on {url}")]
    EmptyExamDate { url: String },
}
