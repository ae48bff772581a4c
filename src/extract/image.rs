use scraper::{ElementRef, Selector};

use super::{resolve_href, PageSource};
use crate::error::ExtractionError;

/// First usable image source inside `scope`, trying `candidates` in order.
///
/// Candidates usually point at an `img` inside a known container class; a
/// lazily loaded image carries its path in `data-src` instead of `src`.
pub fn find_src(scope: ElementRef<'_>, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|sel| {
        let el = scope.select(sel).next()?;
        let attrs = el.value();
        attrs
            .attr("src")
            .or_else(|| attrs.attr("data-src"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Absolute image URL for a question block, or `None` when it has no image.
pub fn image_url(
    scope: ElementRef<'_>,
    candidates: &[Selector],
    source: PageSource<'_>,
) -> Result<Option<String>, ExtractionError> {
    find_src(scope, candidates)
        .map(|src| resolve_href(source.site_base, source.url, &src))
        .transpose()
}
