use std::sync::LazyLock;

use anyhow::{Context, Result};
use quick_xml::events::Event;
use regex::Regex;
use tracing::info;

use crate::error::ExtractionError;
use crate::fetch::Fetch;

/// Question pages live under `/fragen`, optionally below a state segment.
static QUESTION_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:/[a-z0-9-]+)*/fragen(?:/[a-z0-9-]+)*/?$").unwrap());

/// Path segment of the practice test, which reuses the question markup.
const PRACTICE_TEST_SEGMENT: &str = "probetest";

/// Nested sitemap indexes are followed at most this deep.
const MAX_DEPTH: usize = 2;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Sitemap {
    /// `<url><loc>` entries.
    pub pages: Vec<String>,
    /// `<sitemap><loc>` entries of a sitemap index.
    pub nested: Vec<String>,
}

/// Fetch `<site>/sitemap.xml` and return the question page URLs in order.
pub async fn fetch_question_urls<F: Fetch>(fetcher: &F, site_base: &str) -> Result<Vec<String>> {
    let root = format!("{}/sitemap.xml", site_base);
    let mut pending = vec![(root, 0usize)];
    let mut all_urls = Vec::new();

    while let Some((url, depth)) = pending.pop() {
        info!("Fetching sitemap: {}", url);
        let xml = fetcher
            .text(&url)
            .await
            .with_context(|| format!("Failed to fetch sitemap {}", url))?;
        let sitemap = parse_sitemap(&xml)?;
        all_urls.extend(sitemap.pages);
        if depth < MAX_DEPTH {
            // Reversed so the stack yields children in document order.
            pending.extend(sitemap.nested.into_iter().rev().map(|u| (u, depth + 1)));
        }
    }
    info!("Total URLs in sitemap: {}", all_urls.len());

    let filtered: Vec<String> = all_urls
        .into_iter()
        .filter(|url| is_question_page(url, site_base))
        .collect();

    info!("Question pages after filtering: {}", filtered.len());
    Ok(filtered)
}

pub fn is_question_page(url: &str, site_base: &str) -> bool {
    let Some(path) = url.strip_prefix(site_base) else {
        return false;
    };
    let path = path.split(['?', '#']).next().unwrap_or("");
    QUESTION_PATH.is_match(path) && !path.split('/').any(|seg| seg == PRACTICE_TEST_SEGMENT)
}

/// Parse a urlset or sitemapindex document.
pub fn parse_sitemap(xml: &str) -> Result<Sitemap, ExtractionError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut sitemap = Sitemap::default();
    let mut in_url = false;
    let mut in_sitemap = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"url" => in_url = true,
                b"sitemap" => in_sitemap = true,
                b"loc" if in_url || in_sitemap => in_loc = true,
                _ => {}
            },
            Event::Text(e) if in_loc => {
                let loc = e.unescape()?.trim().to_string();
                if in_url {
                    sitemap.pages.push(loc);
                } else {
                    sitemap.nested.push(loc);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                b"sitemap" => in_sitemap = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sitemap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SITE: &str = "https://leben.example";

    #[test]
    fn urlset_fixture() {
        let xml = std::fs::read_to_string("tests/fixtures/sitemap.xml").unwrap();
        let sitemap = parse_sitemap(&xml).unwrap();
        assert_eq!(sitemap.pages.len(), 7);
        assert!(sitemap.nested.is_empty());

        let questions: Vec<_> = sitemap
            .pages
            .iter()
            .filter(|u| is_question_page(u, SITE))
            .map(String::as_str)
            .collect();
        assert_eq!(
            questions,
            vec![
                "https://leben.example/fragen",
                "https://leben.example/fragen/seite-2",
                "https://leben.example/bundeslaender/bayern/fragen",
            ]
        );
    }

    #[test]
    fn sitemap_index() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>https://leben.example/page-sitemap.xml</loc></sitemap>
  <sitemap><loc>https://leben.example/post-sitemap.xml</loc></sitemap>
</sitemapindex>"#;
        let sitemap = parse_sitemap(xml).unwrap();
        assert!(sitemap.pages.is_empty());
        assert_eq!(
            sitemap.nested,
            vec!["https://leben.example/page-sitemap.xml", "https://leben.example/post-sitemap.xml"]
        );
    }

    #[test]
    fn practice_test_and_foreign_hosts_are_excluded() {
        assert!(!is_question_page("https://leben.example/fragen/probetest", SITE));
        assert!(!is_question_page("https://other.example/fragen", SITE));
        assert!(!is_question_page("https://leben.example/impressum", SITE));
        assert!(is_question_page("https://leben.example/fragen/?seite=3", SITE));
    }

    #[test]
    fn broken_xml_is_an_error() {
        assert!(parse_sitemap("<urlset><url><loc>x</url></urlset>").is_err());
    }
}
