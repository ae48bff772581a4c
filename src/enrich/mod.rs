pub mod completion;
pub mod translator;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::error::EnrichmentError;
use crate::model::{Category, Question, Translations, PROMPT_CATEGORIES};
use completion::Completion;
use translator::Translator;

/// Returned by the completion-backed steps when the service call fails.
/// Used for both category and context.
pub const FALLBACK: &str = "General";

fn question_block(question: &Question) -> String {
    let [a, b, c, d] = question.choices.texts();
    format!(
        "<Question>\nQuestion - {}\na:   {}\nb:   {}\nc:   {}\nd:   {}\n</Question>",
        question.question, a, b, c, d
    )
}

pub fn category_prompt(question: &Question) -> String {
    let labels = PROMPT_CATEGORIES
        .iter()
        .map(|l| format!("'{l}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are given a task to find category for below question. \
         Your response should be only category from below list. {labels}\n{}",
        question_block(question)
    )
}

pub fn context_prompt(question: &Question) -> String {
    format!(
        "You are given a task to find context for below question. \
         Give context so that it will help understand the question. \
         The generated text should not be more then 100 words. \
         Always generate in german language.\n{}",
        question_block(question)
    )
}

/// What happened to each field of one question.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FieldOutcome {
    pub category_fallback: bool,
    pub context_fallback: bool,
    pub translation_failed: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub enriched: usize,
    pub category_fallbacks: usize,
    pub context_fallbacks: usize,
    pub translation_failures: usize,
}

impl EnrichmentReport {
    fn record(&mut self, outcome: FieldOutcome) {
        self.enriched += 1;
        self.category_fallbacks += usize::from(outcome.category_fallback);
        self.context_fallbacks += usize::from(outcome.context_fallback);
        self.translation_failures += usize::from(outcome.translation_failed);
    }
}

/// Categorization, context generation and translation for unseen questions.
///
/// Every call is contained on its own: a failure affects only that field of
/// that question.
pub struct Enricher<C, T> {
    completion: C,
    translator: T,
    languages: Vec<String>,
}

impl<C: Completion, T: Translator> Enricher<C, T> {
    pub fn new(completion: C, translator: T, languages: Vec<String>) -> Self {
        Self {
            completion,
            translator,
            languages,
        }
    }

    /// Category label, or `General` if the service fails. Labels outside the
    /// known list are accepted as returned.
    pub async fn categorize(&self, question: &Question) -> Result<Category, EnrichmentError> {
        let raw = self.completion.complete(&category_prompt(question)).await?;
        let category = Category::from_label(&raw);
        if !category.is_recognized() {
            warn!("Question {}: unrecognized category {:?} kept as-is", question.num, raw);
        }
        info!("Found category for question {}: {}", question.num, category);
        Ok(category)
    }

    pub async fn context(&self, question: &Question) -> Result<String, EnrichmentError> {
        let context = self.completion.complete(&context_prompt(question)).await?;
        info!("Fetched context {}", question.num);
        Ok(context)
    }

    /// Translate question, choices and context into every target language.
    pub async fn translations(&self, question: &Question) -> Result<Translations, EnrichmentError> {
        info!("Translating question {}", question.num);
        let [a, b, c, d] = question.choices.texts();
        let texts = [question.question.as_str(), a, b, c, d, question.context.as_str()];
        let results = self.translator.translate(&texts, &self.languages).await?;
        translator::rebuild(&results, &self.languages)
    }

    /// Fill category, context and translation of one question, in that order
    /// so the context is translated too.
    pub async fn enrich(&self, question: &mut Question) -> FieldOutcome {
        let mut outcome = FieldOutcome::default();

        question.category = Some(match self.categorize(question).await {
            Ok(category) => category,
            Err(e) => {
                error!("Error category for question {}: {}", question.num, e);
                outcome.category_fallback = true;
                Category::General
            }
        });

        question.context = match self.context(question).await {
            Ok(context) => context,
            Err(e) => {
                error!("Error context for question {}: {}", question.num, e);
                outcome.context_fallback = true;
                FALLBACK.to_string()
            }
        };

        question.translation = match self.translations(question).await {
            Ok(translations) => Some(translations),
            Err(e) => {
                error!("Error translating question {}: {}", question.num, e);
                outcome.translation_failed = true;
                None
            }
        };

        outcome
    }

    /// Enrich the questions at `indices`, strictly one after another.
    pub async fn enrich_all(&self, questions: &mut [Question], indices: &[usize]) -> EnrichmentReport {
        let mut report = EnrichmentReport::default();
        if indices.is_empty() {
            return report;
        }

        let pb = ProgressBar::new(indices.len() as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }

        for &index in indices {
            if let Some(question) = questions.get_mut(index) {
                let outcome = self.enrich(question).await;
                report.record(outcome);
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            "Enriched {} questions ({} category fallbacks, {} context fallbacks, {} translation failures)",
            report.enriched,
            report.category_fallbacks,
            report.context_fallbacks,
            report.translation_failures
        );
        report
    }
}

#[cfg(test)]
impl<T> Enricher<fakes::FakeCompletion, T> {
    pub(crate) fn completion_calls(&self) -> usize {
        self.completion.calls.get()
    }
}


#[cfg(test)]
mod tests {
    use super::fakes::{FakeCompletion, FakeTranslator};
    use super::*;
    use crate::model::Choice;
    use pretty_assertions::assert_eq;

    fn question(num: &str) -> Question {
        let mut q = Question::new(num);
        q.question = "Wer wählt den Bundeskanzler?".into();
        for (c, t) in Choice::ALL.into_iter().zip(["Volk", "Bundestag", "Bundesrat", "Präsident"]) {
            q.choices.set(c, t.into());
        }
        q
    }

    fn langs() -> Vec<String> {
        vec!["en".into(), "tr".into()]
    }

    #[test]
    fn prompts_carry_question_and_choices() {
        let q = question("1");
        let p = category_prompt(&q);
        assert!(p.contains("Question - Wer wählt den Bundeskanzler?"));
        assert!(p.contains("d:   Präsident"));
        assert!(p.contains("'Press Freedom'"));
        assert!(!p.contains("'General'"));
        assert!(context_prompt(&q).contains("100 words"));
    }

    #[tokio::test]
    async fn successful_enrichment_fills_all_fields() {
        let enricher = Enricher::new(
            FakeCompletion::answering("Democracy & Politics", "Der Bundestag wählt."),
            FakeTranslator::echo(),
            langs(),
        );
        let mut q = question("5");
        let outcome = enricher.enrich(&mut q).await;

        assert_eq!(outcome, FieldOutcome::default());
        assert_eq!(q.category, Some(Category::DemocracyAndPolitics));
        assert_eq!(q.context, "Der Bundestag wählt.");
        let translation = q.translation.as_ref().unwrap();
        assert_eq!(translation["en"].b, "en:Bundestag");
        assert_eq!(translation["tr"].context, "tr:Der Bundestag wählt.");
    }

    #[tokio::test]
    async fn context_is_generated_before_translation() {
        let enricher = Enricher::new(
            FakeCompletion::answering("Elections", "Kontext"),
            FakeTranslator::echo(),
            langs(),
        );
        let mut q = question("5");
        enricher.enrich(&mut q).await;
        let sent = enricher.translator.last_texts.borrow().clone();
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[5], "Kontext");
    }

    #[tokio::test]
    async fn completion_failure_falls_back_to_general() {
        let enricher = Enricher::new(FakeCompletion::failing(), FakeTranslator::echo(), langs());
        let mut q = question("9");
        let outcome = enricher.enrich(&mut q).await;

        assert!(outcome.category_fallback && outcome.context_fallback);
        assert_eq!(q.category, Some(Category::General));
        assert_eq!(q.context, "General");
        assert!(q.translation.is_some());
    }

    #[tokio::test]
    async fn translation_failure_leaves_translation_unset() {
        let enricher = Enricher::new(
            FakeCompletion::answering("Elections", "Kontext"),
            FakeTranslator::failing(),
            langs(),
        );
        let mut q = question("3");
        let outcome = enricher.enrich(&mut q).await;

        assert!(outcome.translation_failed);
        assert_eq!(q.translation, None);
        assert_eq!(q.category, Some(Category::Elections));
        assert_eq!(q.context, "Kontext");
    }

    #[tokio::test]
    async fn unrecognized_category_is_kept_verbatim() {
        let enricher = Enricher::new(
            FakeCompletion::answering("Category: Elections", "x"),
            FakeTranslator::echo(),
            langs(),
        );
        let mut q = question("3");
        enricher.enrich(&mut q).await;
        assert_eq!(q.category.as_ref().map(Category::label), Some("Category: Elections"));
    }

    #[tokio::test]
    async fn failures_do_not_stop_later_questions() {
        let enricher = Enricher::new(FakeCompletion::failing(), FakeTranslator::failing(), langs());
        let mut corpus = vec![question("1"), question("2"), question("3")];
        let report = enricher.enrich_all(&mut corpus, &[0, 2]).await;

        assert_eq!(report.enriched, 2);
        assert_eq!(report.translation_failures, 2);
        assert_eq!(enricher.completion.calls.get(), 4);
        assert_eq!(enricher.translator.calls.get(), 2);
        assert_eq!(corpus[1].category, None);
        assert_eq!(corpus[2].context, "General");
    }
}
