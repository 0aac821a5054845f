use std::fmt::Display;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use futures::StreamExt;
use now::DateTimeNow;
use tracing::debug;

use crate::daemon::{
    session::aggregate::{
        average, combine_with_occurrences, partition_by_date_window, sort_descending_by_time,
        UrlAverage,
    },
    storage::{
        records::{load_days, recorded_days},
        KeyValueStore,
    },
};

use super::{
    output::{collect_days, format_duration, share_percentage, total_of},
    Args,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(
        long = "start",
        short,
        help = "First day of the report. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\". Defaults to today"
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "Last day of the report. Same format as --start. Defaults to today"
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        short,
        long,
        help = "Report the current week",
        conflicts_with_all = ["start_date", "end_date"]
    )]
    week: bool,
    #[arg(short = 'n', long, help = "Show only the top N sites")]
    limit: Option<usize>,
}

/// Command to process `report`. Prints time per site between two days, longest first.
pub async fn process_report_command(
    store: impl KeyValueStore,
    ReportCommand {
        start_date,
        end_date,
        date_style,
        week,
        limit,
    }: ReportCommand,
) -> Result<()> {
    let (start, end) = if week {
        let now = Local::now();
        (now.beginning_of_week().date_naive(), now.date_naive())
    } else {
        (
            parse_day(start_date, date_style, "start")?,
            parse_day(end_date, date_style, "end")?,
        )
    };
    if start > end {
        return Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Start of the report {start} is after its end {end}"),
            )
            .into());
    }
    debug!("Reporting from {start} to {end}");

    let days = collect_days(store, start, end).await;
    let usages = sort_descending_by_time(combine_with_occurrences(
        days.iter().map(|(_, entries)| entries.as_slice()),
    ));

    if usages.is_empty() {
        println!("No activity between {start} and {end}");
        return Ok(());
    }

    let total = total_of(&usages);
    for usage in usages.iter().take(limit.unwrap_or(usize::MAX)) {
        println!(
            "{}\t{}%\t{}d\t{}",
            format_duration(usage.total_time),
            share_percentage(usage.total_time, total),
            usage.occurrences,
            usage.url
        );
    }
    println!();
    println!("Total\t{}", format_duration(total));
    Ok(())
}

fn parse_day(value: Option<String>, style: DateStyle, name: &str) -> Result<NaiveDate> {
    let now = Local::now();
    match value.map(|s| parse_date_string(&s, now, style.into())) {
        Some(Ok(v)) => Ok(v.date_naive()),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate {name} date {e}"),
            )
            .into()),
        None => Ok(now.date_naive()),
    }
}

#[derive(Debug, Parser)]
pub struct AverageCommand {
    #[arg(
        short,
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of days to average over, today included"
    )]
    days: u32,
    #[arg(
        short,
        long = "active-days",
        help = "Divide every site by the days it was visited on instead of all recorded days"
    )]
    active_days: bool,
    #[arg(short = 'n', long, help = "Show only the top N sites")]
    limit: Option<usize>,
}

/// Command to process `average`. Prints average time per day for every site seen in the last
/// `days` days.
pub async fn process_average_command(
    store: impl KeyValueStore,
    AverageCommand {
        days,
        active_days,
        limit,
    }: AverageCommand,
) -> Result<()> {
    let today = Local::now().date_naive();
    let keys = recorded_days(&store).await?;
    // A window of N days reaches N - 1 days back from today.
    let (_, recent) = partition_by_date_window(keys, days - 1, today);
    let recorded = recent.len();

    let loaded = load_days(&store, recent).collect::<Vec<_>>().await;
    let usages = combine_with_occurrences(loaded.iter().map(|(_, entries)| entries.as_slice()));

    let averages: Vec<UrlAverage> = if active_days {
        usages
            .iter()
            .flat_map(|usage| {
                average(
                    std::slice::from_ref(usage),
                    usage.occurrences.try_into().unwrap_or(i32::MAX),
                )
            })
            .collect()
    } else {
        average(&usages, recorded.try_into().unwrap_or(i32::MAX))
    };
    let averages = sort_descending_by_time(averages);

    if averages.is_empty() {
        println!("No activity in the last {days} days");
        return Ok(());
    }

    for entry in averages.iter().take(limit.unwrap_or(usize::MAX)) {
        println!("{}\t{}", format_duration(entry.average), entry.url);
    }
    println!();
    println!("Averaged over {recorded} recorded days");
    Ok(())
}
