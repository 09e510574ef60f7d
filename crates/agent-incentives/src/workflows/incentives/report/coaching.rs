use super::insights::{golden_opportunities, missed_opportunities, momentum_pivot};
use super::summary::summarize_awards;
use super::views::{AwardSummary, GoldenOpportunity, MissedOpportunity, MomentumPivot};
use crate::workflows::incentives::domain::{AwardResult, ContractRecord, OptimizationRecommendation};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

const HIGHLIGHTS: usize = 3;

/// Per-agent daily coaching digest; `Display` renders it as Markdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoachingReport {
    pub agent_id: String,
    pub report_date: NaiveDate,
    pub summary: AwardSummary,
    pub missed: Vec<MissedOpportunity>,
    pub golden: Vec<GoldenOpportunity>,
    pub pivot: Option<MomentumPivot>,
    pub recommendations: Vec<OptimizationRecommendation>,
}

impl CoachingReport {
    pub fn build(
        agent_id: &str,
        report_date: NaiveDate,
        results: &[AwardResult],
        contracts: &[ContractRecord],
        recommendations: &[OptimizationRecommendation],
    ) -> Self {
        let results: Vec<AwardResult> = results
            .iter()
            .filter(|result| result.agent_id == agent_id)
            .cloned()
            .collect();
        let contracts: Vec<ContractRecord> = contracts
            .iter()
            .filter(|contract| contract.agent_id == agent_id)
            .cloned()
            .collect();

        let mut missed = missed_opportunities(&results);
        missed.truncate(HIGHLIGHTS);
        let mut golden = golden_opportunities(&results);
        golden.truncate(HIGHLIGHTS);

        Self {
            agent_id: agent_id.to_string(),
            report_date,
            summary: summarize_awards(&results),
            missed,
            golden,
            pivot: momentum_pivot(&contracts),
            recommendations: recommendations
                .iter()
                .filter(|recommendation| recommendation.saturated_ref.agent_id == agent_id)
                .cloned()
                .collect(),
        }
    }
}

impl fmt::Display for CoachingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Incentive report for {}", self.report_date.format("%Y-%m-%d"))?;
        writeln!(f)?;
        writeln!(f, "**Agent**: {}", self.agent_id)?;
        writeln!(f)?;
        writeln!(f, "## Overview")?;
        writeln!(f)?;
        writeln!(f, "| Item | Value |")?;
        writeln!(f, "|------|------|")?;
        writeln!(f, "| Final payout | {:.0} |", self.summary.total_final_payout)?;
        writeln!(f, "| Expected payout | {:.0} |", self.summary.total_expected_payout)?;
        writeln!(
            f,
            "| Awards achieved | {} / {} |",
            self.summary.achieved_count, self.summary.award_count
        )?;
        writeln!(f, "| Average achievement | {:.1}% |", self.summary.average_achievement)?;
        writeln!(f)?;

        writeln!(f, "## Missed opportunities (80-99%)")?;
        writeln!(f)?;
        if self.missed.is_empty() {
            writeln!(f, "None. Every award is either achieved or far from its next tier.")?;
        }
        for missed in &self.missed {
            writeln!(f, "### [{}] {}", missed.company, missed.award_name)?;
            writeln!(f, "- Achievement: {:.1}%", missed.achievement_rate)?;
            writeln!(f, "- Shortfall: {:.0}", missed.shortfall)?;
            writeln!(f, "- Extra reward: {:.0}", missed.extra_reward)?;
            writeln!(f, "- ROI: {:.0}% ({})", missed.roi_pct, missed.urgency.label())?;
            writeln!(f, "- {}", missed.advice())?;
            writeln!(f)?;
        }

        if !self.golden.is_empty() {
            writeln!(f, "## Golden opportunities")?;
            writeln!(f)?;
            for golden in &self.golden {
                writeln!(
                    f,
                    "- [{}] {}: {:.0} to go for {:.0} ({:.2} per unit)",
                    golden.company, golden.award_name, golden.gap, golden.expected_reward, golden.roi
                )?;
            }
            writeln!(f)?;
        }

        if let Some(pivot) = &self.pivot {
            writeln!(f, "## Momentum")?;
            writeln!(f)?;
            writeln!(f, "{}", pivot.message())?;
            writeln!(f)?;
            writeln!(f, "- Daily average before: {:.0}", pivot.average_before)?;
            writeln!(f, "- Daily average after: {:.0}", pivot.average_after)?;
            writeln!(f)?;
        }

        if !self.recommendations.is_empty() {
            writeln!(f, "## Cross-company moves")?;
            writeln!(f)?;
            for recommendation in &self.recommendations {
                writeln!(f, "- {}", recommendation.message())?;
            }
            writeln!(f)?;
        }

        writeln!(f, "## Today's focus")?;
        writeln!(f)?;
        match self.missed.first() {
            Some(top) => {
                writeln!(
                    f,
                    "1. Concentrate on {} (ROI {:.0}%).",
                    top.award_name, top.roi_pct
                )?;
                writeln!(
                    f,
                    "2. {:.0} more premium unlocks {:.0}.",
                    top.shortfall, top.extra_reward
                )?;
            }
            None => {
                writeln!(f, "1. Keep the current pace.")?;
                writeln!(f, "2. Look for new awards to open.")?;
            }
        }
        writeln!(f, "3. Check the days left in the week and pace accordingly.")
    }
}
