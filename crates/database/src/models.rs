//! Database models.
//!
//! Rows map one-to-one onto tables. Nested plan sub-records are stored as JSON
//! documents and decoded into the typed structs below.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::UnknownVariant;

/// Declares a text-backed enum column: serde names, `as_str` and `TryFrom<String>`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Column representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_uppercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

text_enum! {
    /// Access level of a user inside its company.
    pub enum Role {
        /// Elevated: manages users, company settings and materials.
        Admin => "ADMIN",
        User => "USER",
    }
}

text_enum! {
    /// Practitioner profession.
    pub enum Profession {
        Nutritionist => "NUTRITIONIST",
        Physician => "PHYSICIAN",
        Naturopath => "NATUROPATH",
        Other => "OTHER",
    }
}

text_enum! {
    /// Plan lifecycle.
    pub enum PlanStatus {
        Draft => "DRAFT",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Archived => "ARCHIVED",
    }
}

impl PlanStatus {
    /// Whether a plan may move from `self` to `next`.
    ///
    /// Plans move forward `DRAFT → IN_PROGRESS → COMPLETED`; any non-archived
    /// plan may be archived. Archived plans are frozen.
    pub fn can_transition_to(&self, next: PlanStatus) -> bool {
        use PlanStatus::*;
        matches!(
            (self, next),
            (Draft, InProgress)
                | (InProgress, Completed)
                | (Draft, Archived)
                | (InProgress, Archived)
                | (Completed, Archived)
        )
    }
}

text_enum! {
    /// Category of an educational material.
    pub enum MaterialCategory {
        Article => "ARTICLE",
        Guide => "GUIDE",
        Recipe => "RECIPE",
        Protocol => "PROTOCOL",
        Presentation => "PRESENTATION",
        Other => "OTHER",
    }
}

text_enum! {
    /// Indexing state of a material, advanced by the indexing collaborator.
    pub enum ProcessingStatus {
        Pending => "PENDING",
        Processing => "PROCESSING",
        Indexed => "INDEXED",
        Failed => "FAILED",
    }
}

impl ProcessingStatus {
    fn rank(&self) -> u8 {
        match self {
            ProcessingStatus::Pending => 0,
            ProcessingStatus::Processing => 1,
            ProcessingStatus::Indexed | ProcessingStatus::Failed => 2,
        }
    }

    /// Status only advances; `INDEXED` and `FAILED` are terminal.
    pub fn can_advance_to(&self, next: ProcessingStatus) -> bool {
        next.rank() > self.rank()
    }
}

text_enum! {
    /// Stage of the multi-stage analysis pipeline.
    pub enum AgentKind {
        ExamAnalysis => "EXAM_ANALYSIS",
        TcmAnalysis => "TCM_ANALYSIS",
        IfmAnalysis => "IFM_ANALYSIS",
        PlanGeneration => "PLAN_GENERATION",
    }
}

impl AgentKind {
    /// The stage whose stored result feeds this one, if any.
    pub fn previous(&self) -> Option<AgentKind> {
        match self {
            AgentKind::ExamAnalysis => None,
            AgentKind::TcmAnalysis => Some(AgentKind::ExamAnalysis),
            AgentKind::IfmAnalysis => Some(AgentKind::TcmAnalysis),
            AgentKind::PlanGeneration => Some(AgentKind::IfmAnalysis),
        }
    }

    /// URL slug (`exam-analysis`, ...).
    pub fn slug(&self) -> &'static str {
        match self {
            AgentKind::ExamAnalysis => "exam-analysis",
            AgentKind::TcmAnalysis => "tcm-analysis",
            AgentKind::IfmAnalysis => "ifm-analysis",
            AgentKind::PlanGeneration => "plan-generation",
        }
    }

    /// Parse a URL slug.
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.slug() == slug)
    }
}

text_enum! {
    /// Position of a radial pulse reading.
    pub enum PulsePosition {
        LeftCun => "LEFT_CUN",
        LeftGuan => "LEFT_GUAN",
        LeftChi => "LEFT_CHI",
        RightCun => "RIGHT_CUN",
        RightGuan => "RIGHT_GUAN",
        RightChi => "RIGHT_CHI",
    }
}

/// A tenant. Every plan, material and user belongs to exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: String,
    pub name: String,
    /// Domain used by the materials bucket read policy (e.g. "clinic.com").
    pub email_domain: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A practitioner account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub company_id: String,
    pub name: String,
    /// Lower-cased login e-mail, unique across tenants.
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub profession: Profession,
    pub registration_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Patient identity and intake history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientData {
    pub full_name: String,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub occupation: Option<String>,
    pub main_complaint: Option<String>,
    pub menstrual_history: Option<MenstrualHistory>,
    pub gestational_history: Option<GestationalHistory>,
    pub family_history: Option<FamilyHistory>,
    pub lifestyle: Option<Lifestyle>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenstrualHistory {
    pub menarche_age: Option<u32>,
    pub cycle_length_days: Option<u32>,
    pub period_length_days: Option<u32>,
    pub last_period: Option<String>,
    pub contraceptive: Option<String>,
    pub symptoms: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestationalHistory {
    pub pregnancies: Option<u32>,
    pub births: Option<u32>,
    pub miscarriages: Option<u32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FamilyHistory {
    pub conditions: Vec<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lifestyle {
    pub sleep: Option<String>,
    pub physical_activity: Option<String>,
    pub stress_level: Option<String>,
    pub diet: Option<String>,
    pub alcohol: Option<String>,
    pub smoking: Option<String>,
    pub water_intake: Option<String>,
    pub notes: Option<String>,
}

/// Reference to an object in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    /// Storage key (`tenant/unique-name.ext`).
    pub object_name: String,
    /// Original file name as uploaded.
    pub name: String,
    /// Presigned URL issued at upload time.
    pub url: String,
    pub size: u64,
    pub content_type: String,
}

/// One exam attached to a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub result: Option<ExamResult>,
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub files: Vec<FileRef>,
}

/// Allowed shapes of an exam result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExamResult {
    /// Single measured value.
    Numeric {
        value: f64,
        #[serde(default)]
        unit: Option<String>,
        #[serde(default)]
        reference_range: Option<String>,
    },
    /// Free-text report.
    Text { text: String },
    /// Several markers from one exam (e.g. a thyroid panel).
    Panel { markers: Vec<ExamMarker> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamMarker {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reference_range: Option<String>,
    /// "high", "low", ... as reported by the lab.
    #[serde(default)]
    pub flag: Option<String>,
}

/// Traditional-medicine observations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcmObservations {
    pub facial: Option<String>,
    pub tongue: Option<TongueObservation>,
    pub pulse: Vec<PulseReading>,
    pub energetic: Option<String>,
    pub notes: Option<String>,
}

impl TcmObservations {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TongueObservation {
    pub color: Option<String>,
    pub coating: Option<String>,
    pub shape: Option<String>,
    pub moisture: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseReading {
    pub position: PulsePosition,
    pub quality: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Antecedents, triggers and mediators for one functional-medicine category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IfmCategory {
    pub antecedents: String,
    pub triggers: String,
    pub mediators: String,
}

impl IfmCategory {
    pub fn is_empty(&self) -> bool {
        self.antecedents.trim().is_empty()
            && self.triggers.trim().is_empty()
            && self.mediators.trim().is_empty()
    }
}

/// The seven-category functional-medicine matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IfmMatrix {
    pub assimilation: IfmCategory,
    pub defense_repair: IfmCategory,
    pub energy: IfmCategory,
    pub biotransformation: IfmCategory,
    pub transport: IfmCategory,
    pub communication: IfmCategory,
    pub structural_integrity: IfmCategory,
}

impl IfmMatrix {
    /// Categories with their labels, in matrix order.
    pub fn categories(&self) -> [(&'static str, &IfmCategory); 7] {
        [
            ("Assimilation", &self.assimilation),
            ("Defense and repair", &self.defense_repair),
            ("Energy", &self.energy),
            ("Biotransformation and elimination", &self.biotransformation),
            ("Transport", &self.transport),
            ("Communication", &self.communication),
            ("Structural integrity", &self.structural_integrity),
        ]
    }
}

/// Nutritional sub-plans, one per menstrual phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionalPlan {
    pub menstrual: Option<String>,
    pub follicular: Option<String>,
    pub ovulatory: Option<String>,
    pub luteal: Option<String>,
}

/// Generated recommendation document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanContent {
    pub summary: Option<String>,
    pub correlations: Vec<String>,
    pub nutritional_plan: NutritionalPlan,
    pub supplementation: Option<String>,
    pub lifestyle: Option<String>,
    pub follow_up: Option<String>,
}

/// A practitioner's per-patient case record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: String,
    pub company_id: String,
    pub created_by: String,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: PlanStatus,
    #[sqlx(json)]
    pub patient: PatientData,
    #[sqlx(json)]
    pub exams: Vec<Exam>,
    #[sqlx(json)]
    pub tcm: TcmObservations,
    #[sqlx(json)]
    pub timeline: Vec<TimelineEvent>,
    #[sqlx(json)]
    pub ifm_matrix: IfmMatrix,
    #[sqlx(json)]
    pub content: PlanContent,
    pub created_at: String,
    pub updated_at: String,
}

/// An educational document uploaded by a practitioner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Material {
    pub id: String,
    pub company_id: String,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub category: MaterialCategory,
    #[sqlx(json)]
    pub tags: Vec<String>,
    pub author_id: String,
    pub author_name: String,
    pub file_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub object_name: String,
    pub content_text: Option<String>,
    #[sqlx(try_from = "String")]
    pub processing_status: ProcessingStatus,
    /// Visible to every user of the company; private materials are visible to
    /// their author and admins only.
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Accumulated state of one analysis stage for one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AgentContext {
    pub id: String,
    #[sqlx(try_from = "String")]
    pub agent: AgentKind,
    pub plan_id: String,
    pub company_id: String,
    #[sqlx(json)]
    pub state: serde_json::Value,
    /// Hash of the input the stored state was computed from.
    pub input_fingerprint: Option<String>,
    /// Number of times the stage has been written.
    pub runs: i64,
    pub created_at: String,
    pub updated_at: String,
}
