use crate::pipeline::{calculate_from_csv, CalculationOutcome};
use agent_incentives::config::AppConfig;
use agent_incentives::error::AppError;
use agent_incentives::telemetry::{self, LogSink};
use agent_incentives::workflows::incentives::report::CoachingReport;
use agent_incentives::workflows::incentives::{AwardResult, IncentiveEngine};
use chrono::NaiveDate;
use clap::Args;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct CalculateArgs {
    /// Contract export (CSV)
    #[arg(long)]
    pub(crate) contracts: PathBuf,
    /// Award rule sheet (CSV)
    #[arg(long)]
    pub(crate) rules: PathBuf,
    /// Dedicated consecutive-award sheet (CSV)
    #[arg(long)]
    pub(crate) consecutive_rules: Option<PathBuf>,
    /// First day of the calculation window (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) period_start: NaiveDate,
    /// Last day of the calculation window (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) period_end: NaiveDate,
    /// Only evaluate rules of this company (`전체` for every company)
    #[arg(long)]
    pub(crate) company: Option<String>,
    /// Only report on this agent
    #[arg(long)]
    pub(crate) agent: Option<String>,
    /// Print the outcome as JSON instead of a text report
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_calculate(args: CalculateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init_with_sink(&config.telemetry, LogSink::Stderr)?;

    let engine = IncentiveEngine::new(config.engine);
    let contracts = File::open(&args.contracts)?;
    let rules = File::open(&args.rules)?;
    let consecutive_rules = args.consecutive_rules.as_ref().map(File::open).transpose()?;

    let mut outcome = calculate_from_csv(
        &engine,
        contracts,
        rules,
        consecutive_rules,
        args.period_start,
        args.period_end,
        args.company.as_deref(),
    )?;
    if let Some(agent) = &args.agent {
        outcome.retain_agent(agent);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &outcome).map_err(std::io::Error::from)?;
        writeln!(out)?;
    } else {
        render_outcome(&mut out, &outcome)?;
    }
    Ok(())
}

pub(crate) fn render_outcome<W: Write>(out: &mut W, outcome: &CalculationOutcome) -> std::io::Result<()> {
    writeln!(
        out,
        "Incentive calculation {} to {}",
        outcome.period_start, outcome.period_end
    )?;
    if let Some(company) = &outcome.company_filter {
        writeln!(out, "Company filter: {company}")?;
    }

    let contracts = &outcome.contract_import;
    writeln!(
        out,
        "- {} of {} contract rows imported ({} without a date, {} without premium)",
        contracts.imported, contracts.rows_read, contracts.missing_date, contracts.non_positive_premium
    )?;
    let rules = &outcome.rule_import;
    writeln!(
        out,
        "- {} award rules loaded, {} rows skipped",
        rules.rules, rules.skipped_rules
    )?;
    if rules.consecutive_rows + rules.skipped_consecutive_rows > 0 {
        writeln!(
            out,
            "- {} consecutive period rows loaded, {} rows skipped",
            rules.consecutive_rows, rules.skipped_consecutive_rows
        )?;
    }

    let summary = &outcome.summary;
    writeln!(out, "\nSummary")?;
    writeln!(
        out,
        "- Final payout {} | expected {}",
        won(summary.total_final_payout),
        won(summary.total_expected_payout)
    )?;
    writeln!(
        out,
        "- {} of {} awards achieved | {:.1}% average achievement | {} errored",
        summary.achieved_count, summary.award_count, summary.average_achievement, summary.errored_count
    )?;
    let company = &outcome.company_summary;
    writeln!(
        out,
        "- Firm-wide: {} confirmed ({}) | {} in progress | {} not achieved | {} agents",
        company.confirmed_count,
        won(company.confirmed_payout),
        company.in_progress_count,
        company.not_achieved_count,
        company.agent_count
    )?;

    writeln!(out, "\nResults")?;
    if outcome.results.is_empty() {
        writeln!(out, "  (no awards evaluated)")?;
    }
    for result in &outcome.results {
        writeln!(out, "{}", result_line(result))?;
    }

    if !outcome.recommendations.is_empty() {
        writeln!(out, "\nCross-company recommendations")?;
        for recommendation in &outcome.recommendations {
            writeln!(
                out,
                "  - {}: {}",
                recommendation.saturated_ref.agent_id,
                recommendation.message()
            )?;
        }
    }

    for agent in outcome.agents() {
        let report = CoachingReport::build(
            agent,
            outcome.period_end,
            &outcome.results,
            &outcome.contracts,
            &outcome.recommendations,
        );
        writeln!(out, "\n{report}")?;
    }
    Ok(())
}

fn result_line(result: &AwardResult) -> String {
    let status = if let Some(error) = &result.error {
        format!(" [error: {error}]")
    } else if !result.is_selected {
        " [not selected]".to_string()
    } else if !result.is_payout_due && result.expected_payout > 0.0 {
        " [payout pending]".to_string()
    } else {
        String::new()
    };

    format!(
        "  - {} | [{}] {} ({}) | performance {} | payout {} of {} | {:.1}%{}",
        result.agent_id,
        result.company,
        result.award_name,
        result.award_type,
        won(result.performance_amount),
        won(result.final_payout),
        won(result.expected_payout),
        result.achievement_rate,
        status
    )
}

/// Whole-won amount with thousands separators.
fn won(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
