//! crates/goodhands_core/src/checklist.rs
//!
//! The closed checklist question registry: every question the caregiver app
//! can submit, the answer shape each one expects, and the deterministic rule
//! that turns an answer into a 1-5 score.
//!
//! Answers arrive as free-form JSON from the client; they are parsed into
//! `AnswerPayload` against the question's declared shape here, at the
//! boundary, and rejected if they do not match. Scoring is a pure function
//! of (question, payload): the same payload always yields the same score.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Checklist categories a question can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Health,
    Mental,
    Physical,
    Social,
    Daily,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Health => "health",
            Category::Mental => "mental",
            Category::Physical => "physical",
            Category::Social => "social",
            Category::Daily => "daily",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "health" => Some(Category::Health),
            "mental" => Some(Category::Mental),
            "physical" => Some(Category::Physical),
            "social" => Some(Category::Social),
            "daily" => Some(Category::Daily),
            _ => None,
        }
    }
}

/// Errors raised while validating or scoring a checklist answer.
#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("unknown question key: {0}")]
    UnknownQuestion(String),
    #[error("answer for {key} does not match the expected shape: {reason}")]
    ShapeMismatch { key: &'static str, reason: String },
    #[error("'{selected}' is not a valid option for {key}")]
    InvalidOption { key: &'static str, selected: String },
}

//=========================================================================================
// Question Keys
//=========================================================================================

/// Every question key the system accepts. Closed on purpose: an unknown key
/// is a validation error, not a new row shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKey {
    // Common daily-care questions, asked for every senior.
    MealIntake,
    WaterIntake,
    SleepQuality,
    MoodState,
    ActivityLevel,
    Communication,
    PainDiscomfort,
    MedicationTaken,
    BathroomNeeds,
    SocialInteraction,
    // Dementia group.
    MemoryCheck,
    FamilyRecognition,
    WanderingBehavior,
    ConfusionLevel,
    Agitation,
    // Diabetes group.
    BloodSugarCheck,
    // Hypertension group.
    BloodPressureCheck,
    SaltIntake,
    Dizziness,
    // Arthritis group.
    JointPain,
}

impl QuestionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKey::MealIntake => "meal_intake",
            QuestionKey::WaterIntake => "water_intake",
            QuestionKey::SleepQuality => "sleep_quality",
            QuestionKey::MoodState => "mood_state",
            QuestionKey::ActivityLevel => "activity_level",
            QuestionKey::Communication => "communication",
            QuestionKey::PainDiscomfort => "pain_discomfort",
            QuestionKey::MedicationTaken => "medication_taken",
            QuestionKey::BathroomNeeds => "bathroom_needs",
            QuestionKey::SocialInteraction => "social_interaction",
            QuestionKey::MemoryCheck => "memory_check",
            QuestionKey::FamilyRecognition => "family_recognition",
            QuestionKey::WanderingBehavior => "wandering_behavior",
            QuestionKey::ConfusionLevel => "confusion_level",
            QuestionKey::Agitation => "agitation",
            QuestionKey::BloodSugarCheck => "blood_sugar_check",
            QuestionKey::BloodPressureCheck => "blood_pressure_check",
            QuestionKey::SaltIntake => "salt_intake",
            QuestionKey::Dizziness => "dizziness",
            QuestionKey::JointPain => "joint_pain",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        ALL_QUESTIONS.iter().map(|q| q.key).find(|k| k.as_str() == s)
    }

    pub fn spec(&self) -> &'static QuestionSpec {
        ALL_QUESTIONS
            .iter()
            .find(|q| q.key == *self)
            .expect("every QuestionKey variant has a registry entry")
    }
}

//=========================================================================================
// Answer Shapes
//=========================================================================================

/// Yes/no polarity: whether answering "yes" is a good sign or a symptom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// yes -> 5, no -> 2 (e.g. "did they take their medication?")
    Positive,
    /// yes -> 1, no -> 5 (e.g. "did they report dizziness?")
    Negative,
}

/// The answer shape a question expects, including its scoring rule.
#[derive(Debug, Clone, Copy)]
pub enum AnswerShape {
    YesNo(Polarity),
    /// A fixed option list with a score declared next to each option.
    Choice(&'static [(&'static str, u8)]),
    /// Measured-or-not plus optional systolic/diastolic readings.
    BloodPressure,
    /// Measured-or-not plus an optional mg/dL level.
    BloodSugar,
}

/// One registry entry: key, snapshot text, category, shape.
#[derive(Debug)]
pub struct QuestionSpec {
    pub key: QuestionKey,
    pub text: &'static str,
    pub category: Category,
    pub shape: AnswerShape,
}

const SCALE_MEAL: &[(&str, u8)] = &[("full", 5), ("half", 4), ("little", 2), ("almost_none", 1)];
const SCALE_SLEEP: &[(&str, u8)] = &[
    ("well", 5),
    ("normal", 4),
    ("woke_often", 2),
    ("hard_to_sleep", 1),
];
const SCALE_MOOD: &[(&str, u8)] = &[
    ("very_good", 5),
    ("good", 4),
    ("normal", 3),
    ("bad", 2),
    ("very_bad", 1),
];
const SCALE_ACTIVITY: &[(&str, u8)] = &[
    ("very_active", 5),
    ("active", 4),
    ("normal", 3),
    ("quiet", 2),
    ("very_quiet", 1),
];
const SCALE_MEMORY: &[(&str, u8)] = &[
    ("clear", 5),
    ("partial", 4),
    ("confused", 2),
    ("none", 1),
];
const SCALE_SEVERITY: &[(&str, u8)] = &[
    ("none", 5),
    ("mild", 4),
    ("moderate", 2),
    ("severe", 1),
];

/// The full registry. Ten common questions plus the disease-specific groups
/// carried over from the original care template.
pub static ALL_QUESTIONS: &[QuestionSpec] = &[
    QuestionSpec {
        key: QuestionKey::MealIntake,
        text: "How well did they eat their meals?",
        category: Category::Health,
        shape: AnswerShape::Choice(SCALE_MEAL),
    },
    QuestionSpec {
        key: QuestionKey::WaterIntake,
        text: "Did they drink enough water?",
        category: Category::Health,
        shape: AnswerShape::YesNo(Polarity::Positive),
    },
    QuestionSpec {
        key: QuestionKey::SleepQuality,
        text: "How did they sleep last night?",
        category: Category::Health,
        shape: AnswerShape::Choice(SCALE_SLEEP),
    },
    QuestionSpec {
        key: QuestionKey::MoodState,
        text: "How was their mood today?",
        category: Category::Mental,
        shape: AnswerShape::Choice(SCALE_MOOD),
    },
    QuestionSpec {
        key: QuestionKey::ActivityLevel,
        text: "How active were they today?",
        category: Category::Physical,
        shape: AnswerShape::Choice(SCALE_ACTIVITY),
    },
    QuestionSpec {
        key: QuestionKey::Communication,
        text: "Was communication with them smooth?",
        category: Category::Social,
        shape: AnswerShape::YesNo(Polarity::Positive),
    },
    QuestionSpec {
        key: QuestionKey::PainDiscomfort,
        text: "Did they complain of pain or discomfort?",
        category: Category::Health,
        shape: AnswerShape::YesNo(Polarity::Negative),
    },
    QuestionSpec {
        key: QuestionKey::MedicationTaken,
        text: "Did they take their prescribed medication on time?",
        category: Category::Health,
        shape: AnswerShape::YesNo(Polarity::Positive),
    },
    QuestionSpec {
        key: QuestionKey::BathroomNeeds,
        text: "Did they have difficulty using the bathroom?",
        category: Category::Daily,
        shape: AnswerShape::YesNo(Polarity::Negative),
    },
    QuestionSpec {
        key: QuestionKey::SocialInteraction,
        text: "Did they interact with other people?",
        category: Category::Social,
        shape: AnswerShape::YesNo(Polarity::Positive),
    },
    QuestionSpec {
        key: QuestionKey::MemoryCheck,
        text: "Did they remember today's date and day of the week?",
        category: Category::Mental,
        shape: AnswerShape::Choice(SCALE_MEMORY),
    },
    QuestionSpec {
        key: QuestionKey::FamilyRecognition,
        text: "Did they recognize people in family photos?",
        category: Category::Mental,
        shape: AnswerShape::YesNo(Polarity::Positive),
    },
    QuestionSpec {
        key: QuestionKey::WanderingBehavior,
        text: "Did they show wandering behavior?",
        category: Category::Mental,
        shape: AnswerShape::YesNo(Polarity::Negative),
    },
    QuestionSpec {
        key: QuestionKey::ConfusionLevel,
        text: "How confused did they seem?",
        category: Category::Mental,
        shape: AnswerShape::Choice(SCALE_SEVERITY),
    },
    QuestionSpec {
        key: QuestionKey::Agitation,
        text: "Did they show agitation or anxiety?",
        category: Category::Mental,
        shape: AnswerShape::YesNo(Polarity::Negative),
    },
    QuestionSpec {
        key: QuestionKey::BloodSugarCheck,
        text: "Was their blood sugar measured? (mg/dL)",
        category: Category::Health,
        shape: AnswerShape::BloodSugar,
    },
    QuestionSpec {
        key: QuestionKey::BloodPressureCheck,
        text: "Was their blood pressure measured? (mmHg)",
        category: Category::Health,
        shape: AnswerShape::BloodPressure,
    },
    QuestionSpec {
        key: QuestionKey::SaltIntake,
        text: "Did they avoid salty food?",
        category: Category::Health,
        shape: AnswerShape::YesNo(Polarity::Positive),
    },
    QuestionSpec {
        key: QuestionKey::Dizziness,
        text: "Did they report dizziness?",
        category: Category::Health,
        shape: AnswerShape::YesNo(Polarity::Negative),
    },
    QuestionSpec {
        key: QuestionKey::JointPain,
        text: "How severe was their joint pain?",
        category: Category::Physical,
        shape: AnswerShape::Choice(SCALE_SEVERITY),
    },
];

/// The disease labels that unlock a disease-specific question group.
/// Unknown labels simply add no extra questions.
pub fn questions_for_diseases<'a, I>(diseases: I) -> Vec<&'static QuestionSpec>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut keys: Vec<QuestionKey> = ALL_QUESTIONS[..10].iter().map(|q| q.key).collect();
    for disease in diseases {
        let group: &[QuestionKey] = match disease {
            "dementia" => &[
                QuestionKey::MemoryCheck,
                QuestionKey::FamilyRecognition,
                QuestionKey::WanderingBehavior,
                QuestionKey::ConfusionLevel,
                QuestionKey::Agitation,
            ],
            "diabetes" => &[QuestionKey::BloodSugarCheck],
            "hypertension" => &[
                QuestionKey::BloodPressureCheck,
                QuestionKey::SaltIntake,
                QuestionKey::Dizziness,
            ],
            "arthritis" => &[QuestionKey::JointPain],
            _ => &[],
        };
        for key in group {
            if !keys.contains(key) {
                keys.push(*key);
            }
        }
    }
    keys.into_iter().map(|k| k.spec()).collect()
}

//=========================================================================================
// Answer Payloads
//=========================================================================================

/// A validated checklist answer. The variant is dictated by the question's
/// declared shape, never by the client: construction goes through
/// [`AnswerPayload::parse`], including when re-reading stored rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnswerPayload {
    YesNo {
        value: bool,
    },
    Choice {
        selected: String,
    },
    BloodPressure {
        value: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        systolic: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        diastolic: Option<i64>,
    },
    BloodSugar {
        value: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        level: Option<i64>,
    },
}

impl AnswerPayload {
    /// Parses a raw JSON answer against the shape `key` expects.
    ///
    /// This is the explicit boundary validation: shape mismatches and
    /// out-of-list options are rejected here, before anything is stored.
    pub fn parse(key: QuestionKey, raw: &serde_json::Value) -> Result<Self, ChecklistError> {
        let spec = key.spec();
        let shape_err = |reason: &str| ChecklistError::ShapeMismatch {
            key: spec.key.as_str(),
            reason: reason.to_string(),
        };

        match spec.shape {
            AnswerShape::YesNo(_) => {
                let value = raw
                    .get("value")
                    .and_then(|v| v.as_bool())
                    .ok_or_else(|| shape_err("expected {\"value\": bool}"))?;
                Ok(AnswerPayload::YesNo { value })
            }
            AnswerShape::Choice(options) => {
                let selected = raw
                    .get("selected")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| shape_err("expected {\"selected\": string}"))?;
                if !options.iter().any(|(name, _)| *name == selected) {
                    return Err(ChecklistError::InvalidOption {
                        key: spec.key.as_str(),
                        selected: selected.to_string(),
                    });
                }
                Ok(AnswerPayload::Choice {
                    selected: selected.to_string(),
                })
            }
            AnswerShape::BloodPressure => {
                let value = raw
                    .get("value")
                    .and_then(|v| v.as_bool())
                    .ok_or_else(|| shape_err("expected {\"value\": bool, ...}"))?;
                let systolic = optional_int(raw, "systolic").map_err(|r| shape_err(&r))?;
                let diastolic = optional_int(raw, "diastolic").map_err(|r| shape_err(&r))?;
                if value && systolic.is_some() != diastolic.is_some() {
                    return Err(shape_err("systolic and diastolic must be given together"));
                }
                if !value && (systolic.is_some() || diastolic.is_some()) {
                    return Err(shape_err("readings given but value is false"));
                }
                Ok(AnswerPayload::BloodPressure {
                    value,
                    systolic,
                    diastolic,
                })
            }
            AnswerShape::BloodSugar => {
                let value = raw
                    .get("value")
                    .and_then(|v| v.as_bool())
                    .ok_or_else(|| shape_err("expected {\"value\": bool, ...}"))?;
                let level = optional_int(raw, "level").map_err(|r| shape_err(&r))?;
                if !value && level.is_some() {
                    return Err(shape_err("level given but value is false"));
                }
                Ok(AnswerPayload::BloodSugar { value, level })
            }
        }
    }
}

fn optional_int(raw: &serde_json::Value, field: &str) -> Result<Option<i64>, String> {
    match raw.get(field) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{field} must be an integer")),
    }
}

//=========================================================================================
// Scoring
//=========================================================================================

/// Computes the derived 1-5 score for a validated answer.
///
/// The rule table, in full:
/// - YesNo positive polarity: yes 5, no 2.
/// - YesNo negative polarity: yes 1, no 5.
/// - Choice: the score declared next to the selected option.
/// - BloodPressure: not measured 2; measured without readings 3;
///   systolic 90-139 and diastolic 60-89 -> 5; systolic 140-159 or
///   diastolic 90-99 (nothing worse) -> 3; otherwise 1.
/// - BloodSugar: not measured 2; measured without level 3;
///   70-180 -> 5; 54-69 or 181-250 -> 3; otherwise 1.
pub fn score_answer(key: QuestionKey, answer: &AnswerPayload) -> Result<u8, ChecklistError> {
    let spec = key.spec();
    let mismatch = || ChecklistError::ShapeMismatch {
        key: spec.key.as_str(),
        reason: "payload variant does not match question shape".to_string(),
    };

    match (&spec.shape, answer) {
        (AnswerShape::YesNo(polarity), AnswerPayload::YesNo { value }) => {
            Ok(match (polarity, value) {
                (Polarity::Positive, true) => 5,
                (Polarity::Positive, false) => 2,
                (Polarity::Negative, true) => 1,
                (Polarity::Negative, false) => 5,
            })
        }
        (AnswerShape::Choice(options), AnswerPayload::Choice { selected }) => options
            .iter()
            .find(|(name, _)| *name == selected.as_str())
            .map(|(_, score)| *score)
            .ok_or_else(|| ChecklistError::InvalidOption {
                key: spec.key.as_str(),
                selected: selected.clone(),
            }),
        (
            AnswerShape::BloodPressure,
            AnswerPayload::BloodPressure {
                value,
                systolic,
                diastolic,
            },
        ) => Ok(match (value, systolic, diastolic) {
            (false, _, _) => 2,
            (true, Some(sys), Some(dia)) => {
                if (90..=139).contains(sys) && (60..=89).contains(dia) {
                    5
                } else if (90..=159).contains(sys) && (60..=99).contains(dia) {
                    3
                } else {
                    1
                }
            }
            (true, _, _) => 3,
        }),
        (AnswerShape::BloodSugar, AnswerPayload::BloodSugar { value, level }) => {
            Ok(match (value, level) {
                (false, _) => 2,
                (true, Some(level)) => {
                    if (70..=180).contains(level) {
                        5
                    } else if (54..=250).contains(level) {
                        3
                    } else {
                        1
                    }
                }
                (true, None) => 3,
            })
        }
        _ => Err(mismatch()),
    }
}
