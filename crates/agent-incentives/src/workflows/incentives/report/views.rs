use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AwardSummary {
    /// Final payout of the selected results.
    pub total_final_payout: f64,
    /// Payout expected once every award closes, selected results only.
    pub total_expected_payout: f64,
    /// Distinct (company, award) pairs.
    pub award_count: usize,
    /// Distinct pairs with a selected, paying result.
    pub achieved_count: usize,
    pub average_achievement: f64,
    pub errored_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanySummary {
    pub confirmed_payout: f64,
    pub confirmed_count: usize,
    pub in_progress_count: usize,
    pub not_achieved_count: usize,
    pub agent_count: usize,
    pub average_achievement: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn from_roi(roi_pct: f64) -> Self {
        if roi_pct >= 500.0 {
            Self::High
        } else if roi_pct >= 200.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// An award close to its next tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissedOpportunity {
    pub agent_id: String,
    pub company: String,
    pub award_name: String,
    pub performance: f64,
    pub next_target: f64,
    pub achievement_rate: f64,
    pub shortfall: f64,
    pub extra_reward: f64,
    pub roi_pct: f64,
    pub urgency: Urgency,
}

impl MissedOpportunity {
    pub fn advice(&self) -> String {
        match self.urgency {
            Urgency::High => format!(
                "{:.0} more unlocks {:.0} extra (ROI {:.0}%); close this first",
                self.shortfall, self.extra_reward, self.roi_pct
            ),
            Urgency::Medium => format!(
                "{:.0} more earns {:.0} (ROI {:.0}%)",
                self.shortfall, self.extra_reward, self.roi_pct
            ),
            Urgency::Low => format!(
                "{:.0} more reaches {:.0} (ROI {:.0}%)",
                self.shortfall, self.extra_reward, self.roi_pct
            ),
        }
    }
}

/// An award at least half way to a first payout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoldenOpportunity {
    pub agent_id: String,
    pub company: String,
    pub award_name: String,
    pub performance: f64,
    pub next_target: f64,
    pub achievement_rate: f64,
    pub gap: f64,
    pub expected_reward: f64,
    /// Reward per unit of premium still needed.
    pub roi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MomentumPivot {
    pub pivot_date: NaiveDate,
    pub decline_pct: f64,
    pub average_before: f64,
    pub average_after: f64,
}

impl MomentumPivot {
    pub fn message(&self) -> String {
        format!(
            "momentum dropped {:.1}% from {}; redirecting effort to another insurer's award at that point may have paid more",
            self.decline_pct, self.pivot_date
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    pub premium: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPerformance {
    pub week: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub contract_count: usize,
    pub premium_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductStatistics {
    pub category: String,
    pub contract_count: usize,
    pub premium_total: f64,
    pub premium_mean: f64,
}
