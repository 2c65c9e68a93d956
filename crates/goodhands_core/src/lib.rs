pub mod checklist;
pub mod domain;
pub mod ports;

pub use checklist::{AnswerPayload, Category, ChecklistError, QuestionKey};
pub use domain::{
    AiReport, CareNote, CareNoteKind, CareSession, CaregiverProfile, ChecklistResponse, GpsPoint,
    GuardianFeedback, GuardianProfile, Notification, Senior, SessionStatus, User, UserCredentials,
    UserRole, WeeklyScore,
};
pub use ports::{CareStore, PhotoStore, PortError, PortResult, ReportSynthesisService};
