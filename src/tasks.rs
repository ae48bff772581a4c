use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::aggregate;
use crate::config::Settings;
use crate::enrich::completion::{Completion, HttpCompletion};
use crate::enrich::translator::{HttpTranslator, Translator};
use crate::enrich::{EnrichmentReport, Enricher};
use crate::error::EvaluationError;
use crate::extract::evaluation;
use crate::fetch::{Fetch, Fetcher};
use crate::identity::{self, DiffSummary, Snapshot};
use crate::model::{CurrentEvaluation, Question};
use crate::store::{Store, EVALUATION_FILE, FACILITIES_FILE, QUESTIONS_FILE};

const EVALUATION_PAGE_PATH: &str =
    "/DE/Themen/Integration/ZugewanderteTeilnehmende/Einbuergerung/einbuergerung-node.html";

/// Everything a run needs, built once from settings.
pub struct RunContext {
    pub settings: Settings,
    pub fetcher: Fetcher,
    pub store: Store,
}

impl RunContext {
    pub fn new(settings: Settings) -> Result<Self> {
        let fetcher = Fetcher::new()?;
        let store = Store::new(settings.data_dir.clone());
        Ok(Self {
            settings,
            fetcher,
            store,
        })
    }

    fn enricher(&self) -> Enricher<HttpCompletion, HttpTranslator> {
        let s = &self.settings;
        let client = self.fetcher.client().clone();
        Enricher::new(
            HttpCompletion::new(client.clone(), s.ai_url.clone(), s.ai_key.clone()),
            HttpTranslator::new(
                client,
                s.translator_endpoint.clone(),
                s.translator_key.clone(),
                s.translator_region.clone(),
            ),
            s.target_languages(),
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QuestionRun {
    pub total: usize,
    pub diff: DiffSummary,
    pub enrichment: EnrichmentReport,
}

/// Merge a fresh corpus with the previous one and enrich only what is new.
pub async fn reconcile_and_enrich<C: Completion, T: Translator>(
    questions: &mut [Question],
    previous: &Snapshot,
    enricher: &Enricher<C, T>,
) -> (DiffSummary, EnrichmentReport) {
    let (unseen, diff) = identity::reconcile_all(questions, previous);
    info!(
        "{} known, {} new, {} without text (previous corpus: {} entries)",
        diff.known,
        diff.new,
        diff.skipped,
        previous.len()
    );
    let report = enricher.enrich_all(questions, &unseen).await;
    (diff, report)
}

pub async fn scrape_questions(ctx: &RunContext, dry_run: bool) -> Result<QuestionRun> {
    let previous = ctx.store.load_snapshot();
    let mut questions = aggregate::collect_questions(&ctx.fetcher, &ctx.settings).await?;

    if dry_run {
        let (_, diff) = identity::reconcile_all(&mut questions, &previous);
        info!("Dry run: {} known, {} new, {} without text", diff.known, diff.new, diff.skipped);
        return Ok(QuestionRun {
            total: questions.len(),
            diff,
            ..Default::default()
        });
    }

    let enricher = ctx.enricher();
    let (diff, enrichment) = reconcile_and_enrich(&mut questions, &previous, &enricher).await;
    ctx.store.write_json(QUESTIONS_FILE, &questions)?;

    Ok(QuestionRun {
        total: questions.len(),
        diff,
        enrichment,
    })
}

pub async fn scrape_facilities(ctx: &RunContext) -> Result<usize> {
    let facilities = aggregate::collect_facilities(&ctx.fetcher, &ctx.settings).await?;
    let count = facilities.iter().map(|s| s.data.len()).sum();
    ctx.store.write_json(FACILITIES_FILE, &facilities)?;
    Ok(count)
}

#[derive(Debug, PartialEq, Eq)]
pub enum EvaluationUpdate {
    Unchanged,
    Written(PathBuf),
}

/// Persist the scraped date only when it is non-empty and differs from the
/// stored one.
pub fn apply_evaluation(
    store: &Store,
    scraped: &CurrentEvaluation,
    source_url: &str,
) -> Result<EvaluationUpdate> {
    if scraped.exam_date.is_empty() {
        return Err(EvaluationError::EmptyExamDate {
            url: source_url.to_string(),
        }
        .into());
    }
    if store.load_evaluation().as_ref() == Some(scraped) {
        info!("No new evaluation data found");
        return Ok(EvaluationUpdate::Unchanged);
    }
    let path = store.write_json(EVALUATION_FILE, scraped)?;
    Ok(EvaluationUpdate::Written(path))
}

pub async fn check_current_evaluation(ctx: &RunContext) -> Result<EvaluationUpdate> {
    let url = format!("{}{}", ctx.settings.bamf_base_url, EVALUATION_PAGE_PATH);
    let html = ctx
        .fetcher
        .text(&url)
        .await
        .context("Failed to fetch the naturalisation page")?;
    let scraped = evaluation::current_evaluation(&html);
    info!("Current evaluation data: {:?}", scraped);
    apply_evaluation(&ctx.store, &scraped, &url)
}

/// All three sources, one after another. A failing task is logged and the
/// next one still runs.
pub async fn run_all(ctx: &RunContext) {
    match scrape_questions(ctx, false).await {
        Ok(run) => info!(
            "Questions: {} total, {} enriched",
            run.total, run.enrichment.enriched
        ),
        Err(e) => error!("Error scraping questions: {:#}", e),
    }

    match scrape_facilities(ctx).await {
        Ok(count) => info!("Test centres: {} saved", count),
        Err(e) => error!("Error scraping test centres: {:#}", e),
    }

    match check_current_evaluation(ctx).await {
        Ok(EvaluationUpdate::Unchanged) => info!("Current evaluation unchanged"),
        Ok(EvaluationUpdate::Written(path)) => info!("Current evaluation saved to {}", path.display()),
        Err(e) => error!("Error scraping current evaluation: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::fakes::{FakeCompletion, FakeTranslator};
    use crate::model::{Category, Choice, QuestionTranslation, Translations};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fresh(num: &str, text: &str) -> Question {
        let mut q = Question::new(num);
        q.question = text.into();
        for (c, t) in Choice::ALL.into_iter().zip(["A", "B", "C", "D"]) {
            q.choices.set(c, t.into());
        }
        q
    }

    fn previous_with_q1() -> (Snapshot, Translations) {
        let id = identity::content_id(&fresh("12", "Q1"));
        let raw = json!([{
            "num": "12", "id": id, "question": "Q1",
            "a": "A", "b": "B", "c": "C", "d": "D",
            "solution": "a", "image": "-",
            "translation": { "en": {
                "question": "Q1 en", "a": "A en", "b": "B en", "c": "C en", "d": "D en",
                "context": "ctx en"
            }},
            "category": "Elections",
            "context": "Wahlen in Deutschland"
        }]);
        let mut translations = Translations::new();
        translations.insert(
            "en".into(),
            QuestionTranslation {
                question: "Q1 en".into(),
                a: "A en".into(),
                b: "B en".into(),
                c: "C en".into(),
                d: "D en".into(),
                context: "ctx en".into(),
            },
        );
        (Snapshot::from_value(raw), translations)
    }

    #[tokio::test]
    async fn renumbered_known_question_is_not_enriched() {
        let (previous, translations) = previous_with_q1();
        let enricher = Enricher::new(
            FakeCompletion::answering("Constitution", "neu"),
            FakeTranslator::echo(),
            vec!["en".into()],
        );
        let mut corpus = vec![fresh("DE-12", "Q1")];

        let (diff, report) = reconcile_and_enrich(&mut corpus, &previous, &enricher).await;

        assert_eq!(diff.known, 1);
        assert_eq!(report.enriched, 0);
        let q = &corpus[0];
        assert_eq!(q.num, "DE-12");
        assert_eq!(q.category, Some(Category::Elections));
        assert_eq!(q.context, "Wahlen in Deutschland");
        assert_eq!(q.translation, Some(translations));
    }

    #[tokio::test]
    async fn second_run_reproduces_enrichment_exactly() {
        let enricher = Enricher::new(
            FakeCompletion::answering("Federal System", "Länder"),
            FakeTranslator::echo(),
            vec!["en".into(), "tr".into()],
        );
        let mut first = vec![fresh("1", "Q1"), fresh("2", "Q2")];
        reconcile_and_enrich(&mut first, &Snapshot::empty(), &enricher).await;
        let persisted = serde_json::to_value(&first).unwrap();

        let silent = Enricher::new(FakeCompletion::failing(), FakeTranslator::failing(), vec![]);
        let mut second = vec![fresh("1", "Q1"), fresh("2", "Q2")];
        let (_, report) =
            reconcile_and_enrich(&mut second, &Snapshot::from_value(persisted.clone()), &silent).await;

        assert_eq!(report.enriched, 0);
        assert_eq!(silent.completion_calls(), 0);
        assert_eq!(serde_json::to_value(&second).unwrap(), persisted);
    }

    #[tokio::test]
    async fn only_unseen_questions_hit_the_services() {
        let (previous, _) = previous_with_q1();
        let enricher = Enricher::new(
            FakeCompletion::answering("Constitution", "neu"),
            FakeTranslator::echo(),
            vec!["en".into()],
        );
        let mut corpus = vec![fresh("1", "Q1"), fresh("2", "Q2"), Question::new("3")];

        let (diff, report) = reconcile_and_enrich(&mut corpus, &previous, &enricher).await;

        assert_eq!(diff, DiffSummary { known: 1, new: 1, skipped: 1 });
        assert_eq!(report.enriched, 1);
        assert_eq!(enricher.completion_calls(), 2);
        assert_eq!(corpus[1].category, Some(Category::Constitution));
        assert_eq!(corpus[2].category, None);
        assert!(corpus[2].id.is_empty());
    }

    #[test]
    fn evaluation_written_when_changed() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        let eval = CurrentEvaluation {
            exam_date: "14.11.2025".into(),
        };

        let first = apply_evaluation(&store, &eval, "https://bamf").unwrap();
        assert!(matches!(first, EvaluationUpdate::Written(_)));

        let second = apply_evaluation(&store, &eval, "https://bamf").unwrap();
        assert_eq!(second, EvaluationUpdate::Unchanged);
    }

    #[test]
    fn unchanged_evaluation_does_not_touch_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        // Same value, different formatting: a rewrite would normalize it.
        std::fs::write(store.path(EVALUATION_FILE), r#"{"examDate":"14.11.2025"}"#).unwrap();

        let eval = CurrentEvaluation {
            exam_date: "14.11.2025".into(),
        };
        assert_eq!(apply_evaluation(&store, &eval, "u").unwrap(), EvaluationUpdate::Unchanged);
        let raw = std::fs::read_to_string(store.path(EVALUATION_FILE)).unwrap();
        assert_eq!(raw, r#"{"examDate":"14.11.2025"}"#);
    }

    #[test]
    fn empty_exam_date_aborts_without_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = Store::new(tmp.path());
        store
            .write_json(EVALUATION_FILE, &CurrentEvaluation { exam_date: "01.01.2025".into() })
            .unwrap();

        let empty = CurrentEvaluation {
            exam_date: String::new(),
        };
        let err = apply_evaluation(&store, &empty, "https://bamf").unwrap_err();
        assert!(err.downcast_ref::<EvaluationError>().is_some());
        assert_eq!(store.load_evaluation().unwrap().exam_date, "01.01.2025");
    }
}
