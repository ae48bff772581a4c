use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::{
    assign_choices, element_text, image, selector, ChoiceItem, PageSource, QuestionCounter,
    MAX_CHOICE_ITEMS,
};
use crate::error::ExtractionError;
use crate::model::Question;
use crate::states;

const QUESTION_BLOCK_CSS: &str = "article.question";
const CORRECT_CLASS: &str = "is-correct";

static QUESTION_BLOCK: LazyLock<Selector> = LazyLock::new(|| selector(QUESTION_BLOCK_CSS));
static QUESTION_TEXT: LazyLock<Selector> = LazyLock::new(|| selector(".question__text"));
static CHOICE_ITEM: LazyLock<Selector> = LazyLock::new(|| selector(".question__answers > li"));
static IMAGE_CANDIDATES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        ".question__image img",
        "figure.wp-block-image img",
        "picture img",
        ".question__media img",
    ]
    .into_iter()
    .map(selector)
    .collect()
});
static TRAILING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)$").unwrap());

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

    let state = source
        .state
        .map(str::to_string)
        .or_else(|| state_from_url(source.url));
    info!(
        "Scraping {} ({}) and found {} questions",
        source.url,
        state.as_deref().unwrap_or("federal"),
        blocks.len()
    );

    let mut questions = Vec::with_capacity(blocks.len());
    for block in blocks {
        let position = counter.bump();
        let n = embedded_number(block).unwrap_or_else(|| {
            debug!("No embedded number on {}, using position {}", source.url, position);
            position
        });
        let num = match &state {
            Some(code) => states::state_label(code, n),
            None => n.to_string(),
        };

        let mut question = Question::new(num);
        question.question = block
            .select(&QUESTION_TEXT)
            .next()
            .map(element_text)
            .unwrap_or_default();
        if let Some(url) = image::image_url(block, &IMAGE_CANDIDATES, source)? {
            question.image = url;
        }

        let items = block
            .select(&CHOICE_ITEM)
            .take(MAX_CHOICE_ITEMS)
            .map(|li| ChoiceItem {
                is_correct: li.value().classes().any(|c| c == CORRECT_CLASS),
                text: element_text(li),
            })
            .collect();
        assign_choices(&mut question, items);

        questions.push(question);
    }

    Ok((questions, counter))
}

/// Number from an id such as `frage-142`.
fn embedded_number(block: ElementRef<'_>) -> Option<u32> {
    let id = block.value().id()?;
    TRAILING_NUMBER.captures(id)?.get(1)?.as_str().parse().ok()
}

/// State code when one of the URL's path segments names a state.
pub fn state_from_url(page_url: &str) -> Option<String> {
    let parsed = url::Url::parse(page_url).ok()?;
    let code = parsed
        .path_segments()?
        .find_map(states::code_for_slug)?;
    Some(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Choice;
    use pretty_assertions::assert_eq;

    const SITE: &str = "https://leben.example";

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/format_b_page.html").unwrap()
    }

    fn source(url: &'static str) -> PageSource<'static> {
        PageSource {
            url,
            site_base: SITE,
            state: None,
        }
    }

    #[test]
    fn embedded_numbers_are_used() {
        let (questions, counter) = extract(
            &fixture(),
            source("https://leben.example/fragen/seite-2"),
            QuestionCounter::new(),
        )
        .unwrap();
        let nums: Vec<_> = questions.iter().map(|q| q.num.as_str()).collect();
        assert_eq!(nums, vec!["41", "42", "3"]);
        assert_eq!(counter.value(), 3);
    }

    #[test]
    fn state_comes_from_url_path() {
        let (questions, _) = extract(
            &fixture(),
            source("https://leben.example/bundeslaender/nordrhein-westfalen/fragen"),
            QuestionCounter::new(),
        )
        .unwrap();
        assert_eq!(questions[0].num, "NW-41");
        assert_eq!(questions[2].num, "NW-3");
    }

    #[test]
    fn correct_class_sets_solution() {
        let (questions, _) = extract(
            &fixture(),
            source("https://leben.example/fragen/seite-2"),
            QuestionCounter::new(),
        )
        .unwrap();
        assert_eq!(questions[0].solution, Some(Choice::C));
        assert_eq!(questions[0].choices.get(Choice::C), "Versammlungsfreiheit");
        assert_eq!(questions[1].solution, Some(Choice::A));
    }

    #[test]
    fn image_from_container_class() {
        let (questions, _) = extract(
            &fixture(),
            source("https://leben.example/fragen/seite-2"),
            QuestionCounter::new(),
        )
        .unwrap();
        assert_eq!(questions[1].image, "https://leben.example/wp-content/uploads/flagge.png");
        assert_eq!(questions[0].image, "-");
        assert_eq!(questions[2].image, "https://cdn.leben.example/karte.jpg");
    }

    #[test]
    fn url_state_lookup() {
        assert_eq!(state_from_url("https://leben.example/bundeslaender/berlin/"), Some("be".into()));
        assert_eq!(state_from_url("https://leben.example/fragen/1"), None);
    }
}
