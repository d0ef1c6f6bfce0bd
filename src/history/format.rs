//! Context formatting for retrieved history records
//!
//! Dates are placed before content in each block so the model can reason
//! temporally over the retrieved documents. Formatting is deterministic:
//! the same record list always yields byte-identical output.

use std::collections::BTreeSet;

use super::record::{HistoryRecord, NO_SOURCE};

/// A formatted retrieval result: the context block handed to the model and
/// the distinct source domains it draws from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedContext {
    /// Labeled per-record blocks, relevance order preserved
    pub context: String,
    /// Distinct domains, missing-source sentinel excluded
    pub domains: BTreeSet<String>,
}

/// Format records into a context block plus the set of source domains.
///
/// Blocks are 1-indexed and keep the input (relevance) order. An empty
/// input produces a "no documents" context and an empty domain set; the
/// tool layer turns that into its own user-facing message.
pub fn format_records(records: &[HistoryRecord]) -> FormattedContext {
    if records.is_empty() {
        return FormattedContext {
            context: "No documents retrieved.".to_string(),
            domains: BTreeSet::new(),
        };
    }

    let mut domains = BTreeSet::new();
    let mut blocks = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let domain = record.domain();
        if !domain.is_missing() {
            domains.insert(domain.as_str().to_string());
        }

        blocks.push(format!(
            "DOCUMENT {} (DATE: {})\nTITLE: {}\nSOURCE DOMAIN: {}\nCONTENT: {}",
            i + 1,
            record.date,
            record.title,
            domain,
            record.content,
        ));
    }

    let domain_list = domains.iter().cloned().collect::<Vec<_>>().join(", ");
    let context = format!(
        "RETRIEVED DOCUMENTS (sorted by relevance):\n{}\n\nDOMAINS FOUND: {}",
        blocks.join("\n\n---\n\n"),
        domain_list,
    );

    FormattedContext { context, domains }
}

/// A single source citation for the links tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCitation {
    /// Page title
    pub title: String,
    /// Visit date
    pub date: String,
    /// Full source URL
    pub url: String,
    /// Source domain
    pub domain: String,
}

impl LinkCitation {
    /// Render as a citation line
    pub fn render(&self) -> String {
        format!("• {} ({}): {} [{}]", self.title, self.date, self.url, self.domain)
    }
}

/// Deduplicate records by domain, keeping the first (highest-relevance)
/// occurrence of each. Records carrying the missing-source sentinel are
/// skipped entirely.
pub fn dedupe_links(records: &[HistoryRecord]) -> Vec<LinkCitation> {
    let mut seen = BTreeSet::new();
    let mut citations = Vec::new();

    for record in records {
        if record.source == NO_SOURCE {
            continue;
        }
        let domain = record.domain();
        if seen.insert(domain.as_str().to_string()) {
            citations.push(LinkCitation {
                title: record.title.clone(),
                date: record.date.clone(),
                url: record.source.clone(),
                domain: domain.as_str().to_string(),
            });
        }
    }

    citations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<HistoryRecord> {
        vec![
            HistoryRecord::new("Niacinamide serum comparison")
                .with_title("Serum")
                .with_source("https://a.com/p")
                .with_date("2024-05-15"),
            HistoryRecord::new("Air purifier filter replacement guide")
                .with_title("Filter")
                .with_source("https://b.com/p")
                .with_date("2024-11-20"),
        ]
    }

    #[test]
    fn test_format_preserves_order_and_dates() {
        let formatted = format_records(&sample_records());

        let serum = formatted.context.find("TITLE: Serum").unwrap();
        let filter = formatted.context.find("TITLE: Filter").unwrap();
        assert!(serum < filter);

        assert!(formatted.context.contains("DOCUMENT 1 (DATE: 2024-05-15)"));
        assert!(formatted.context.contains("DOCUMENT 2 (DATE: 2024-11-20)"));

        let expected: BTreeSet<String> =
            ["a.com".to_string(), "b.com".to_string()].into_iter().collect();
        assert_eq!(formatted.domains, expected);
    }

    #[test]
    fn test_date_appears_before_content() {
        let formatted = format_records(&sample_records());
        let date = formatted.context.find("DATE: 2024-05-15").unwrap();
        let content = formatted.context.find("CONTENT: Niacinamide").unwrap();
        assert!(date < content);
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let records = sample_records();
        let first = format_records(&records);
        let second = format_records(&records);
        assert_eq!(first.context, second.context);
        assert_eq!(first.domains, second.domains);
    }

    #[test]
    fn test_empty_input() {
        let formatted = format_records(&[]);
        assert_eq!(formatted.context, "No documents retrieved.");
        assert!(formatted.domains.is_empty());
    }

    #[test]
    fn test_missing_source_excluded_from_domains() {
        let records = vec![
            HistoryRecord::new("orphan chunk"),
            HistoryRecord::new("page").with_source("https://a.com/p"),
        ];
        let formatted = format_records(&records);
        assert_eq!(formatted.domains.len(), 1);
        assert!(formatted.domains.contains("a.com"));
    }

    #[test]
    fn test_malformed_url_uses_raw_fallback_as_domain() {
        let records = vec![HistoryRecord::new("page").with_source("bookmarks-bar")];
        let formatted = format_records(&records);
        assert!(formatted.domains.contains("bookmarks-bar"));
        assert!(formatted.context.contains("SOURCE DOMAIN: bookmarks-bar"));
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence_per_domain() {
        let records = vec![
            HistoryRecord::new("first")
                .with_title("First Hit")
                .with_source("https://x.com/1")
                .with_date("2024-01-01"),
            HistoryRecord::new("second")
                .with_title("Second Hit")
                .with_source("https://x.com/2")
                .with_date("2024-02-02"),
            HistoryRecord::new("other")
                .with_title("Other")
                .with_source("https://y.com/1")
                .with_date("2024-03-03"),
        ];

        let citations = dedupe_links(&records);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].title, "First Hit");
        assert_eq!(citations[0].domain, "x.com");
        assert_eq!(citations[1].domain, "y.com");
    }

    #[test]
    fn test_dedupe_skips_missing_sources() {
        let records = vec![HistoryRecord::new("orphan"), HistoryRecord::new("orphan 2")];
        assert!(dedupe_links(&records).is_empty());
    }

    #[test]
    fn test_citation_render() {
        let citation = LinkCitation {
            title: "Serum".into(),
            date: "2024-05-15".into(),
            url: "https://a.com/p".into(),
            domain: "a.com".into(),
        };
        assert_eq!(citation.render(), "• Serum (2024-05-15): https://a.com/p [a.com]");
    }
}
