//! Output formatting module

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use uuid::Uuid;

use calorie_app::Config;
use calorie_domain::service::DailySummary;
use calorie_types::{
    BudgetStatus, CalorieSnapshot, FoodAnalysis, FoodEntry, OutputFormat, Result, UserSettings,
};
use calorie_vision::ConnectionCheck;

/// Entry as printed; photo bytes are reduced to a size
#[derive(Debug, Serialize)]
struct EntryView<'a> {
    id: Uuid,
    timestamp: DateTime<Utc>,
    description: &'a str,
    calories_per_serving: u32,
    servings: u32,
    total_calories: i64,
    image_bytes: Option<usize>,
}

impl<'a> From<&'a FoodEntry> for EntryView<'a> {
    fn from(entry: &'a FoodEntry) -> Self {
        Self {
            id: entry.id,
            timestamp: entry.timestamp,
            description: &entry.description,
            calories_per_serving: entry.calories_per_serving,
            servings: entry.servings,
            total_calories: entry.total_calories(),
            image_bytes: entry.image_data.as_ref().map(Vec::len),
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryView<'a> {
    window_start: DateTime<Utc>,
    target: i64,
    consumed: i64,
    remaining: i64,
    status: BudgetStatus,
    entries: Vec<EntryView<'a>>,
}

#[derive(Debug, Serialize)]
struct SettingsView<'a> {
    daily_calorie_target: i64,
    day_reset_hour: u32,
    provider: String,
    api_key: &'a str,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    println!("{}", content);
    Ok(())
}

fn local_time(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Keep the last four characters of a key visible
fn mask_key(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        return "(not set)".to_string();
    }
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

fn short_id(id: &Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

pub fn output_entry(output_format: OutputFormat, entry: &FoodEntry) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(&EntryView::from(entry));
    }

    println!("\nEntry");
    println!("=====");
    println!("Id:           {}", entry.id);
    println!("Time:         {}", local_time(&entry.timestamp));
    println!("Description:  {}", entry.description);
    println!(
        "Calories:     {} kcal x {} = {} kcal",
        entry.calories_per_serving,
        entry.servings,
        entry.total_calories()
    );
    println!(
        "Photo:        {}",
        match entry.image_data {
            Some(ref data) => format!("{} bytes", data.len()),
            None => "none".to_string(),
        }
    );
    Ok(())
}

pub fn output_entries(output_format: OutputFormat, entries: &[FoodEntry]) -> Result<()> {
    if output_format == OutputFormat::Json {
        let views: Vec<EntryView> = entries.iter().map(EntryView::from).collect();
        return print_json(&views);
    }

    if entries.is_empty() {
        println!("No entries today.");
        return Ok(());
    }

    println!(
        "{:<10} {:<17} {:<30} {:>8} {:>4} {:>8}",
        "ID", "Time", "Description", "kcal", "x", "Total"
    );
    println!("{}", "-".repeat(82));
    for entry in entries {
        let photo = if entry.has_image() { " *" } else { "" };
        println!(
            "{:<10} {:<17} {:<30} {:>8} {:>4} {:>8}{}",
            short_id(&entry.id),
            local_time(&entry.timestamp),
            truncate(&entry.description, 30),
            entry.calories_per_serving,
            entry.servings,
            entry.total_calories(),
            photo
        );
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max {
        return line.to_string();
    }
    let cut: String = line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

pub fn output_summary(output_format: OutputFormat, summary: &DailySummary) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(&SummaryView {
            window_start: summary.window_start,
            target: summary.target,
            consumed: summary.consumed,
            remaining: summary.remaining,
            status: summary.status,
            entries: summary.entries.iter().map(EntryView::from).collect(),
        });
    }

    println!("\nToday");
    println!("=====");
    println!("Since:        {}", local_time(&summary.window_start));
    println!("Target:       {} kcal", summary.target);
    println!("Consumed:     {} kcal", summary.consumed);
    if summary.remaining < 0 {
        println!("Over by:      {} kcal", -summary.remaining);
    } else {
        println!("Remaining:    {} kcal", summary.remaining);
    }
    println!("Status:       {}", summary.status.label());
    println!("Entries:      {}", summary.entries.len());
    Ok(())
}

pub fn output_settings(output_format: OutputFormat, settings: &UserSettings) -> Result<()> {
    let masked = mask_key(&settings.api_key);
    if output_format == OutputFormat::Json {
        return print_json(&SettingsView {
            daily_calorie_target: settings.daily_calorie_target,
            day_reset_hour: settings.day_reset_hour,
            provider: settings.provider.to_string(),
            api_key: &masked,
        });
    }

    println!("\nSettings");
    println!("========");
    println!("Daily target: {} kcal", settings.daily_calorie_target);
    println!("Day resets:   {:02}:00", settings.day_reset_hour);
    println!("Provider:     {}", settings.provider);
    println!("API key:      {}", masked);
    Ok(())
}

pub fn output_analysis(output_format: OutputFormat, analysis: &FoodAnalysis) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(analysis);
    }

    println!("\nAnalysis Result");
    println!("===============");
    println!("Description:  {}", analysis.description);
    println!("Calories:     {} kcal per serving", analysis.calories_per_serving);
    Ok(())
}

pub fn output_connection(output_format: OutputFormat, check: &ConnectionCheck) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(check);
    }

    println!("{} connection OK", check.provider);
    match (&check.analysis, &check.note) {
        (Some(analysis), _) => println!(
            "Test photo:   {} ({} kcal)",
            analysis.description, analysis.calories_per_serving
        ),
        (None, Some(note)) => println!("Test photo:   no estimate ({})", note),
        (None, None) => {}
    }
    Ok(())
}

pub fn output_snapshot(output_format: OutputFormat, snapshot: Option<&CalorieSnapshot>) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(&snapshot);
    }

    match snapshot {
        Some(s) => {
            println!("\nShared Snapshot");
            println!("===============");
            println!("Remaining:    {} kcal", s.remaining_calories);
            println!("Consumed:     {} kcal", s.consumed_calories);
            println!("Target:       {} kcal", s.total_calories);
            println!("Updated:      {}", local_time(&s.last_updated));
        }
        None => println!("No snapshot published yet."),
    }
    Ok(())
}

pub fn output_deleted(output_format: OutputFormat, id: Uuid, deleted: bool) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(&serde_json::json!({ "id": id, "deleted": deleted }));
    }

    if deleted {
        println!("Deleted {}", id);
    } else {
        println!("No entry {}", id);
    }
    Ok(())
}

pub fn output_config(output_format: OutputFormat, config: &Config) -> Result<()> {
    if output_format == OutputFormat::Json {
        return print_json(config);
    }
    print!("{}", config);
    Ok(())
}
