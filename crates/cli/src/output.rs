//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use cartcheck_e2e::runner::{CaseInfo, CaseResult, CaseStatus, SuiteResult};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for CaseResult {
    fn headers() -> Vec<&'static str> {
        vec!["Case", "Suite", "Status", "Time (ms)", "Message"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.suite.to_string(),
            status_label(self.status),
            self.duration_ms.to_string(),
            self.message.clone().unwrap_or_default(),
        ]
    }
}

impl TableDisplay for CaseInfo {
    fn headers() -> Vec<&'static str> {
        vec!["Case", "Suite", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.suite.to_string(),
            self.description.clone(),
        ]
    }
}

fn status_label(status: CaseStatus) -> String {
    match status {
        CaseStatus::Passed => "passed".green().to_string(),
        CaseStatus::Failed => "failed".red().to_string(),
        CaseStatus::Errored => "errored".yellow().to_string(),
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Print a whole run, with a summary line for the human formats
pub fn print_suite(result: &SuiteResult, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(result).unwrap_or_default());
        }
        OutputFormat::Table | OutputFormat::Plain => {
            print_list(&result.results, format);
            let summary = format!(
                "{} passed, {} failed, {} errored ({} ms)",
                result.passed, result.failed, result.errored, result.duration_ms
            );
            if result.success() {
                print_success(&summary);
            } else {
                print_error(&summary);
            }
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
