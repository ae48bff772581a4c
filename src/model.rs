use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Value stored in `image` when a question has no picture.
pub const NO_IMAGE: &str = "-";

/// Answer slot of a question. Only four slots exist; list items beyond the
/// fourth have no letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    A,
    B,
    C,
    D,
}

impl Choice {
    pub const ALL: [Choice; 4] = [Choice::A, Choice::B, Choice::C, Choice::D];

    /// Map a zero-based list position to its slot.
    pub fn from_index(index: usize) -> Option<Choice> {
        Self::ALL.get(index).copied()
    }

    pub fn letter(self) -> &'static str {
        match self {
            Choice::A => "a",
            Choice::B => "b",
            Choice::C => "c",
            Choice::D => "d",
        }
    }

    pub fn from_letter(letter: &str) -> Option<Choice> {
        Self::ALL.into_iter().find(|c| c.letter() == letter)
    }
}

/// The four answer texts, serialized flat as `a`..`d`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choices {
    #[serde(default)]
    pub a: String,
    #[serde(default)]
    pub b: String,
    #[serde(default)]
    pub c: String,
    #[serde(default)]
    pub d: String,
}

impl Choices {
    pub fn get(&self, choice: Choice) -> &str {
        match choice {
            Choice::A => &self.a,
            Choice::B => &self.b,
            Choice::C => &self.c,
            Choice::D => &self.d,
        }
    }

    pub fn set(&mut self, choice: Choice, text: String) {
        let slot = match choice {
            Choice::A => &mut self.a,
            Choice::B => &mut self.b,
            Choice::C => &mut self.c,
            Choice::D => &mut self.d,
        };
        *slot = text;
    }

    /// Texts in slot order a, b, c, d.
    pub fn texts(&self) -> [&str; 4] {
        [&self.a, &self.b, &self.c, &self.d]
    }
}

/// Topic label assigned by the completion service.
///
/// Labels outside the closed list are kept verbatim in `Unrecognized` so a
/// stored corpus round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    RightsAndFreedoms,
    EducationAndReligion,
    LawAndGovernance,
    DemocracyAndPolitics,
    EconomyAndEmployment,
    HistoryAndGeography,
    Elections,
    PressFreedom,
    AssemblyAndProtests,
    FederalSystem,
    Constitution,
    General,
    Unrecognized(String),
}

/// Labels the completion service is asked to choose from. `General` is
/// not offered; it is only the failure fallback.
pub const PROMPT_CATEGORIES: &[&str] = &[
    "Rights & Freedoms",
    "Education & Religion",
    "Law & Governance",
    "Democracy & Politics",
    "Economy & Employment",
    "History & Geography",
    "Elections",
    "Press Freedom",
    "Assembly & Protests",
    "Federal System",
    "Constitution",
];

impl Category {
    pub fn from_label(raw: &str) -> Category {
        match raw.trim() {
            "Rights & Freedoms" => Category::RightsAndFreedoms,
            "Education & Religion" => Category::EducationAndReligion,
            "Law & Governance" => Category::LawAndGovernance,
            "Democracy & Politics" => Category::DemocracyAndPolitics,
            "Economy & Employment" => Category::EconomyAndEmployment,
            "History & Geography" => Category::HistoryAndGeography,
            "Elections" => Category::Elections,
            "Press Freedom" => Category::PressFreedom,
            "Assembly & Protests" => Category::AssemblyAndProtests,
            "Federal System" => Category::FederalSystem,
            "Constitution" => Category::Constitution,
            "General" => Category::General,
            _ => Category::Unrecognized(raw.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Category::RightsAndFreedoms => "Rights & Freedoms",
            Category::EducationAndReligion => "Education & Religion",
            Category::LawAndGovernance => "Law & Governance",
            Category::DemocracyAndPolitics => "Democracy & Politics",
            Category::EconomyAndEmployment => "Economy & Employment",
            Category::HistoryAndGeography => "History & Geography",
            Category::Elections => "Elections",
            Category::PressFreedom => "Press Freedom",
            Category::AssemblyAndProtests => "Assembly & Protests",
            Category::FederalSystem => "Federal System",
            Category::Constitution => "Constitution",
            Category::General => "General",
            Category::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Category::Unrecognized(_))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::from_label(&raw))
    }
}

/// One language's copy of a question. All six fields are produced together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTranslation {
    pub question: String,
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
    pub context: String,
}

/// Language code -> translated copy.
pub type Translations = BTreeMap<String, QuestionTranslation>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub num: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(flatten)]
    pub choices: Choices,
    #[serde(default, with = "solution_letter")]
    pub solution: Option<Choice>,
    #[serde(default = "no_image")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<Translations>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub context: String,
}

fn no_image() -> String {
    NO_IMAGE.to_string()
}

impl Question {
    /// Fresh record as the extractors emit it, before merge or enrichment.
    pub fn new(num: impl Into<String>) -> Self {
        Self {
            num: num.into(),
            id: String::new(),
            question: String::new(),
            choices: Choices::default(),
            solution: None,
            image: no_image(),
            translation: Some(Translations::new()),
            category: None,
            context: String::new(),
        }
    }
}

/// `solution` is stored as the slot letter, or `""` when undetermined.
mod solution_letter {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Choice;

    pub fn serialize<S: Serializer>(value: &Option<Choice>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.map(Choice::letter).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Choice>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().and_then(Choice::from_letter))
    }
}

/// One test centre row from a state's spreadsheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facility {
    #[serde(rename = "regierungsbezirk")]
    pub region: String,
    #[serde(rename = "plz")]
    pub postal_code: String,
    #[serde(rename = "ort")]
    pub city: String,
    #[serde(rename = "einrichtung")]
    pub institution: String,
    #[serde(rename = "straße")]
    pub street: String,
    #[serde(rename = "telefon")]
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFacilities {
    #[serde(rename = "stateCode")]
    pub state_code: String,
    pub data: Vec<Facility>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentEvaluation {
    #[serde(rename = "examDate")]
    pub exam_date: String,
}
