pub mod alert;
pub mod feedback;
pub mod user;
pub mod user_settings;

pub use alert::Alert;
pub use alert::AlertKind;
pub use feedback::Feedback;
pub use feedback::FeedbackCategory;
pub use user::User;
pub use user_settings::UserSettings;
