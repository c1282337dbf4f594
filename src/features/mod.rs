pub mod analytics;
pub mod reports;
