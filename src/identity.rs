use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::model::Question;

/// Hex SHA-256 over question text followed by choices a..d.
///
/// Two questions with the same wording share an id no matter their number,
/// image or enrichment.
pub fn content_id(question: &Question) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.question.as_bytes());
    for text in question.choices.texts() {
        hasher.update(text.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Corpus persisted by the previous run, reduced to entries usable for lookup.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: Vec<Question>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from the raw JSON of a previous corpus. Anything that is not a
    /// well-formed question with an id is ignored rather than rejected.
    pub fn from_value(value: Value) -> Self {
        let Value::Array(items) = value else {
            debug!("Previous corpus is not an array, ignoring it");
            return Self::empty();
        };

        let total = items.len();
        let mut entries = Vec::with_capacity(total);
        for item in items.into_iter().filter(|item| !item.is_null()) {
            let id = item.get("id").and_then(Value::as_str).map(str::to_string);
            match serde_json::from_value::<Question>(item) {
                Ok(q) if !q.id.is_empty() => entries.push(q),
                Ok(_) => {}
                Err(e) => match id.filter(|id| !id.is_empty()) {
                    Some(id) => warn!("Previous entry {} is unreadable ({}), it will be enriched again", id, e),
                    None => debug!("Skipping previous entry without id: {}", e),
                },
            }
        }
        debug!("Previous corpus: {} usable of {} entries", entries.len(), total);
        Self { entries }
    }

    #[cfg(test)]
    pub fn from_questions(entries: Vec<Question>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Question> {
        self.entries.iter().find(|q| q.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Seen in the previous run; enrichment fields were copied over.
    Known,
    /// Not seen before; needs enrichment.
    New,
    /// Empty question text, left untouched.
    Skipped,
}

/// Assign the content id and carry over enrichment from the snapshot.
pub fn reconcile(question: &mut Question, previous: &Snapshot) -> Reconciled {
    if question.question.is_empty() {
        return Reconciled::Skipped;
    }

    question.id = content_id(question);
    match previous.find(&question.id) {
        Some(prior) => {
            question.translation = prior.translation.clone();
            question.category = prior.category.clone();
            question.context = prior.context.clone();
            Reconciled::Known
        }
        None => Reconciled::New,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub known: usize,
    pub new: usize,
    pub skipped: usize,
}

/// Reconcile a whole corpus; returns the indices that need enrichment.
pub fn reconcile_all(questions: &mut [Question], previous: &Snapshot) -> (Vec<usize>, DiffSummary) {
    let mut summary = DiffSummary::default();
    let mut unseen = Vec::new();
    for (index, question) in questions.iter_mut().enumerate() {
        match reconcile(question, previous) {
            Reconciled::Known => summary.known += 1,
            Reconciled::New => {
                summary.new += 1;
                unseen.push(index);
            }
            Reconciled::Skipped => summary.skipped += 1,
        }
    }
    (unseen, summary)
}
