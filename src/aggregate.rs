use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::extract::{self, facility, format_a, format_b, PageFormat, PageSource, QuestionCounter};
use crate::fetch::Fetch;
use crate::model::{Facility, Question, StateFacilities};
use crate::sitemap;

const FACILITY_PAGE_PATH: &str = "/SharedDocs/Anlagen/DE/Integration/Einbuergerung";

/// Fetch one question page and extract it with the format of its site.
async fn extract_page<F: Fetch>(
    fetcher: &F,
    settings: &Settings,
    url: &str,
    site_base: &str,
    state: Option<&str>,
    counter: QuestionCounter,
) -> Result<(Vec<Question>, QuestionCounter)> {
    let format = PageFormat::detect(url, settings)?;
    let html = fetcher.text(url).await?;
    let source = PageSource {
        url,
        site_base,
        state,
    };
    let extracted = extract::extract_questions(format, &html, source, counter)?;
    Ok(extracted)
}

/// Whole corpus from every configured question site, in site order.
pub async fn collect_questions<F: Fetch>(fetcher: &F, settings: &Settings) -> Result<Vec<Question>> {
    if settings.base_url.is_none() && settings.sitemap_base_url.is_none() {
        anyhow::bail!("Neither BASE_URL nor SITEMAP_BASE_URL is configured");
    }

    let mut questions = Vec::new();
    if let Some(base) = &settings.base_url {
        questions.extend(collect_paginated(fetcher, settings, base).await?);
        questions.extend(collect_states(fetcher, settings, base).await?);
    }
    if let Some(base) = &settings.sitemap_base_url {
        questions.extend(collect_sitemap(fetcher, settings, base).await?);
    }
    info!("Collected {} questions", questions.len());
    Ok(questions)
}

/// Federal catalogue: every page linked from the first page's navigation,
/// numbered with one counter across all pages.
pub async fn collect_paginated<F: Fetch>(
    fetcher: &F,
    settings: &Settings,
    site_base: &str,
) -> Result<Vec<Question>> {
    let first_page = format!("{}/fragen/1", site_base);
    let html = fetcher
        .text(&first_page)
        .await
        .with_context(|| format!("Failed to fetch {}", first_page))?;
    let links = format_a::page_links(&html, site_base, &first_page)?;
    info!("Found {} catalogue pages", links.len());

    let mut questions = Vec::new();
    let mut counter = QuestionCounter::new();
    for link in &links {
        let (page, next) = extract_page(fetcher, settings, link, site_base, None, counter)
            .await
            .with_context(|| format!("Failed to scrape {}", link))?;
        counter = next;
        questions.extend(page);
    }
    info!("Catalogue numbered up to {}", counter.value());
    Ok(questions)
}

/// State catalogues, numbering restarted for each state.
pub async fn collect_states<F: Fetch>(
    fetcher: &F,
    settings: &Settings,
    site_base: &str,
) -> Result<Vec<Question>> {
    let mut questions = Vec::new();
    for state in settings.states() {
        let url = format!("{}/fragen/{}", site_base, state);
        let (page, _) = extract_page(
            fetcher,
            settings,
            &url,
            site_base,
            Some(&state),
            QuestionCounter::new(),
        )
        .await
        .with_context(|| format!("Failed to scrape state {}", state))?;
        questions.extend(page);
    }
    Ok(questions)
}

/// Every question page listed in the site's sitemap. Consecutive pages of
/// the same state (or of the federal catalogue) share one counter; it
/// restarts when the state changes.
pub async fn collect_sitemap<F: Fetch>(
    fetcher: &F,
    settings: &Settings,
    site_base: &str,
) -> Result<Vec<Question>> {
    let urls = sitemap::fetch_question_urls(fetcher, site_base).await?;
    let mut questions = Vec::new();
    let mut counter = QuestionCounter::new();
    let mut current_state: Option<String> = None;
    for url in &urls {
        let state = format_b::state_from_url(url);
        if state != current_state {
            debug!("Numbering restarts at {} ({:?})", url, state);
            counter = QuestionCounter::new();
            current_state = state;
        }
        let (page, next) = extract_page(fetcher, settings, url, site_base, None, counter)
            .await
            .with_context(|| format!("Failed to scrape {}", url))?;
        counter = next;
        questions.extend(page);
    }
    Ok(questions)
}

/// Test centres of every configured state.
pub async fn collect_facilities<F: Fetch>(
    fetcher: &F,
    settings: &Settings,
) -> Result<Vec<StateFacilities>> {
    let mut all = Vec::new();
    for state in settings.states() {
        let data = collect_state_facilities(fetcher, &settings.bamf_base_url, &state).await?;
        info!("State {}: {} test centres", state, data.len());
        all.push(StateFacilities {
            state_code: state,
            data,
        });
    }
    Ok(all)
}

/// Rows of all of a state's spreadsheets, filtered once as one list.
async fn collect_state_facilities<F: Fetch>(
    fetcher: &F,
    bamf_base: &str,
    state: &str,
) -> Result<Vec<Facility>> {
    let page = format!(
        "{}{}/Pruefstellen-{}.xlsx",
        bamf_base,
        FACILITY_PAGE_PATH,
        state.to_uppercase()
    );
    let html = fetcher
        .text(&page)
        .await
        .with_context(|| format!("Failed to fetch test centre page for {}", state))?;
    let links = facility::download_links(&html, bamf_base, &page)?;

    let mut rows = Vec::new();
    for link in &links {
        let bytes = match fetcher.bytes(link).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Error fetching {}: {}", link, e);
                continue;
            }
        };
        let sheets = match facility::read_workbook(&bytes, link) {
            Ok(sheets) => sheets,
            Err(e) => {
                warn!("Skipping {}: {}", link, e);
                continue;
            }
        };
        for sheet in &sheets {
            rows.extend(facility::sheet_to_facilities(sheet));
        }
    }

    Ok(facility::filter_facilities(rows))
}
