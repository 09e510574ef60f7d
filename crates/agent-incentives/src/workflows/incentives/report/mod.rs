mod coaching;
mod insights;
mod summary;
mod trend;
pub mod views;

pub use coaching::CoachingReport;
pub use insights::{golden_opportunities, missed_opportunities, momentum_pivot};
pub use summary::{summarize_awards, summarize_company};
pub use trend::{daily_totals, product_statistics, weekly_performance};
pub use views::{
    AwardSummary, CompanySummary, DailyTotal, GoldenOpportunity, MissedOpportunity,
    MomentumPivot, ProductStatistics, Urgency, WeeklyPerformance,
};
