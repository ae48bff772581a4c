use std::sync::LazyLock;

use scraper::{Html, Selector};
use tracing::info;

use super::{
    assign_choices, element_text, image, resolve_href, selector, text_without, ChoiceItem,
    PageSource, QuestionCounter, MAX_CHOICE_ITEMS,
};
use crate::error::ExtractionError;
use crate::model::Question;
use crate::states;

const QUESTION_BLOCK_CSS: &str = "div.relative > div.p-4 > div.mb-8";
const PAGINATION_CSS: &str = "div > nav:nth-of-type(2) a";

static QUESTION_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector(QUESTION_BLOCK_CSS));
static QUESTION_TEXT: LazyLock<Selector> = LazyLock::new(|| selector("strong.font-semibold"));
static CHOICE_ITEM: LazyLock<Selector> = LazyLock::new(|| selector("ul > li.mb-2"));
static CORRECT_MARKER: LazyLock<Selector> = LazyLock::new(|| selector("span.absolute.left-2"));
static PAGINATION: LazyLock<Selector> = LazyLock::new(|| selector(PAGINATION_CSS));
static IMAGE_CANDIDATES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["div.question-image img", "figure img", "img"]
        .into_iter()
        .map(selector)
        .collect()
});

pub fn extract(
    html: &str,
    source: PageSource<'_>,
    mut counter: QuestionCounter,
) -> Result<(Vec<Question>, QuestionCounter), ExtractionError> {
    let doc = Html::parse_document(html);
    let blocks: Vec<_> = doc.select(&QUESTION_BLOCK).collect();
    if blocks.is_empty() {
        return Err(ExtractionError::MissingContainer {
            url: source.url.to_string(),
            selector: QUESTION_BLOCK_CSS,
        });
    }
    info!("Scraping {} and found {} questions", source.url, blocks.len());

    let mut questions = Vec::with_capacity(blocks.len());
    for block in blocks {
        let n = counter.bump();
        let num = match source.state {
            Some(code) => states::state_label(code, n),
            None => n.to_string(),
        };

        let mut question = Question::new(num);
        question.question = block
            .select(&QUESTION_TEXT)
            .map(element_text)
            .collect::<Vec<_>>()
            .join("");
        if let Some(url) = image::image_url(block, &IMAGE_CANDIDATES, source)? {
            question.image = url;
        }

        let items = block
            .select(&CHOICE_ITEM)
            .take(MAX_CHOICE_ITEMS)
            .map(|li| {
                // The marker sits inside the correct item; its text is not part of the answer.
                let is_correct = li.select(&CORRECT_MARKER).next().is_some();
                let text = if is_correct {
                    text_without(li, &CORRECT_MARKER)
                } else {
                    element_text(li)
                };
                ChoiceItem { text, is_correct }
            })
            .collect();
        assign_choices(&mut question, items);

        questions.push(question);
    }

    Ok((questions, counter))
}

/// Links of the catalogue's page navigation, in document order.
pub fn page_links(html: &str, site_base: &str, page_url: &str) -> Result<Vec<String>, ExtractionError> {
    let doc = Html::parse_document(html);
    let links = doc
        .select(&PAGINATION)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| resolve_href(site_base, page_url, href))
        .collect::<Result<Vec<_>, _>>()?;
    if links.is_empty() {
        return Err(ExtractionError::MissingContainer {
            url: page_url.to_string(),
            selector: PAGINATION_CSS,
        });
    }
    Ok(links)
}
