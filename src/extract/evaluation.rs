use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::{element_text, selector};
use crate::model::CurrentEvaluation;

static EXAM_DATE: LazyLock<Selector> =
    LazyLock::new(|| selector("div > div.c-service-box__container > p > strong"));

/// Exam date announced on the naturalisation page. Empty when the service
/// box is missing; the caller decides whether that is fatal.
pub fn current_evaluation(html: &str) -> CurrentEvaluation {
    let doc = Html::parse_document(html);
    let exam_date = doc
        .select(&EXAM_DATE)
        .map(element_text)
        .collect::<Vec<_>>()
        .join("")
        .trim()
        .to_string();
    CurrentEvaluation { exam_date }
}
