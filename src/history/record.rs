//! Retrieved browsing-history records and source-domain extraction

use serde::{Deserialize, Serialize};
use url::Url;

/// Sentinel title for records indexed without one
pub const NO_TITLE: &str = "No Title";

/// Sentinel source for records indexed without a URL
pub const NO_SOURCE: &str = "No Source";

/// Sentinel date for records indexed without a visit date
pub const NO_DATE: &str = "No date available";

/// One retrieved unit of browsing content.
///
/// Produced by the ingestion pipeline, immutable once retrieved. Missing
/// metadata is normalized to the sentinel values at the store boundary so
/// downstream formatting never deals with options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Page text chunk
    pub content: String,
    /// Page title
    pub title: String,
    /// Source URL
    pub source: String,
    /// Visit date, ISO-8601 or the sentinel
    pub date: String,
}

impl HistoryRecord {
    /// Create a record with sentinel metadata
    pub fn new(content: impl Into<String>) -> Self {
        HistoryRecord {
            content: content.into(),
            title: NO_TITLE.to_string(),
            source: NO_SOURCE.to_string(),
            date: NO_DATE.to_string(),
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the source URL
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the visit date
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    /// Extract the source domain for this record
    pub fn domain(&self) -> Domain {
        Domain::parse(&self.source)
    }
}

/// Source domain of a record, derived from its URL.
///
/// The two cases keep well-formed URLs distinguishable from malformed ones:
/// `Host` carries a parsed URL host, `Raw` falls back to the source string
/// as given.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Host component of a successfully parsed URL
    Host(String),
    /// The raw source string, used when URL parsing fails
    Raw(String),
}

impl Domain {
    /// Parse a source string into its domain
    pub fn parse(source: &str) -> Domain {
        match Url::parse(source).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(host) => Domain::Host(host),
            None => Domain::Raw(source.to_string()),
        }
    }

    /// The domain as rendered in context blocks and citations
    pub fn as_str(&self) -> &str {
        match self {
            Domain::Host(host) => host,
            Domain::Raw(raw) => raw,
        }
    }

    /// Whether this domain came from a parsed URL host
    pub fn is_host(&self) -> bool {
        matches!(self, Domain::Host(_))
    }

    /// Whether this domain is the missing-source sentinel
    pub fn is_missing(&self) -> bool {
        self.as_str() == NO_SOURCE
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
