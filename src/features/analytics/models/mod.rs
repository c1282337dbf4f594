mod fact_report;

pub use fact_report::FactReport;
