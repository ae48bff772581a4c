pub mod evaluation;
pub mod facility;
pub mod format_a;
pub mod format_b;
pub mod image;

use std::collections::HashSet;

use scraper::{ElementRef, Selector};

use crate::config::Settings;
use crate::error::ExtractionError;
use crate::model::{Choice, Question};

/// Markup generation of a question site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    /// Questions numbered by position, correct answer flagged by a marker element.
    A,
    /// Question numbers embedded in element ids, correct answer flagged by a class.
    B,
}

impl PageFormat {
    /// The format follows from which configured site the URL belongs to.
    /// When one site lives below the other, the deeper base wins.
    pub fn detect(url: &str, settings: &Settings) -> Result<PageFormat, ExtractionError> {
        let parsed = url::Url::parse(url).map_err(|source| ExtractionError::Url {
            url: url.to_string(),
            source,
        })?;

        let mut sites: Vec<(PageFormat, &str)> = [
            (PageFormat::A, settings.base_url.as_deref()),
            (PageFormat::B, settings.sitemap_base_url.as_deref()),
        ]
        .into_iter()
        .filter_map(|(format, base)| Some((format, base?)))
        .collect();
        sites.sort_by_key(|(_, base)| std::cmp::Reverse(base.len()));

        sites
            .into_iter()
            .find(|(_, base)| is_under(&parsed, base))
            .map(|(format, _)| format)
            .ok_or_else(|| ExtractionError::UnknownSite { url: url.to_string() })
    }
}

/// Same origin as `base`, and a path equal to or below the base path.
fn is_under(url: &url::Url, base: &str) -> bool {
    let Ok(base) = url::Url::parse(base) else {
        return false;
    };
    if url.origin() != base.origin() {
        return false;
    }
    let prefix = base.path().trim_end_matches('/');
    match url.path().strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Running question number. Passed into each extraction call and handed
/// back advanced, so callers decide where numbering restarts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionCounter(u32);

impl QuestionCounter {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Advance and return the new number (numbering starts at 1).
    fn bump(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Where a page came from.
#[derive(Debug, Clone, Copy)]
pub struct PageSource<'a> {
    pub url: &'a str,
    /// Site root used to absolutize root-relative image paths.
    pub site_base: &'a str,
    /// State code of a state catalogue page, when the caller knows it.
    pub state: Option<&'a str>,
}

/// Extract all questions of one page in document order.
pub fn extract_questions(
    format: PageFormat,
    html: &str,
    source: PageSource<'_>,
    counter: QuestionCounter,
) -> Result<(Vec<Question>, QuestionCounter), ExtractionError> {
    match format {
        PageFormat::A => format_a::extract(html, source, counter),
        PageFormat::B => format_b::extract(html, source, counter),
    }
}

/// One `<li>` of a question after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChoiceItem {
    pub text: String,
    pub is_correct: bool,
}

/// Store classified list items into the question's slots. Items past the
/// fourth have no slot and are dropped.
pub(crate) fn assign_choices(question: &mut Question, items: Vec<ChoiceItem>) {
    for (index, item) in items.into_iter().enumerate() {
        match Choice::from_index(index) {
            Some(choice) => {
                if item.is_correct {
                    question.solution = Some(choice);
                }
                question.choices.set(choice, item.text);
            }
            None => {
                tracing::debug!(
                    "Question {}: dropping extra choice {} ({:?})",
                    question.num,
                    index + 1,
                    item.text
                );
            }
        }
    }
}

/// Upper bound of list items looked at per question.
pub(crate) const MAX_CHOICE_ITEMS: usize = 5;

pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of `el` with every subtree matching `excluded` left out.
pub(crate) fn text_without(el: ElementRef<'_>, excluded: &Selector) -> String {
    let skip: HashSet<_> = el
        .select(excluded)
        .flat_map(|m| m.descendants().map(|n| n.id()))
        .collect();

    el.descendants()
        .filter(|n| !skip.contains(&n.id()))
        .filter_map(|n| n.value().as_text().map(|t| String::from(&**t)))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Resolve a link found on `page_url`. Root-relative paths are prefixed with
/// `site_base`; other relative forms are joined onto the page URL.
pub(crate) fn resolve_href(
    site_base: &str,
    page_url: &str,
    href: &str,
) -> Result<String, ExtractionError> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }
    if href.starts_with('/') && !href.starts_with("//") {
        return Ok(format!("{}{}", site_base.trim_end_matches('/'), href));
    }
    let base = url::Url::parse(page_url).map_err(|source| ExtractionError::Url {
        url: page_url.to_string(),
        source,
    })?;
    base.join(href)
        .map(String::from)
        .map_err(|source| ExtractionError::Url {
            url: href.to_string(),
            source,
        })
}
