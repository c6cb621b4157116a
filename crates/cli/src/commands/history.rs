//! History and export commands

use anyhow::{Context, Result};
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, HistoryLog};
use crate::output::{
    color_label, format_percent, print_info, print_json, print_success, print_warning,
    OutputFormat,
};

/// Default download name, same as the server's attachment name
pub const EXPORT_FILE_NAME: &str = "riwayat_prediksi_pcos.csv";

/// Row for the history table
#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Prediksi")]
    label: String,
    #[tabled(rename = "Probabilitas PCOS")]
    probability_positive: String,
    #[tabled(rename = "Probabilitas Tidak PCOS")]
    probability_negative: String,
}

/// Show every stored prediction, oldest first
pub async fn show_history(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let log: HistoryLog = client.get("api/v1/history").await?;

    match format {
        OutputFormat::Json => print_json(&log)?,
        OutputFormat::Table => {
            if log.records.is_empty() {
                print_warning("Belum ada riwayat prediksi yang tersimpan.");
                return Ok(());
            }

            let rows: Vec<HistoryRow> = log
                .records
                .iter()
                .enumerate()
                .map(|(i, r)| HistoryRow {
                    position: i + 1,
                    label: color_label(&r.label),
                    probability_positive: format_percent(r.probability_positive),
                    probability_negative: format_percent(r.probability_negative),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} predictions", log.records.len());
            print_info("Use --format json to see the submitted inputs");
        }
    }

    Ok(())
}

/// Download the raw history CSV to `output`
pub async fn export_history(client: &ApiClient, output: &Path) -> Result<()> {
    match client.get_bytes("api/v1/history/export").await? {
        Some(bytes) => {
            std::fs::write(output, &bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            print_success(&format!("History exported to {}", output.display()));
        }
        None => print_warning("Belum ada riwayat prediksi yang tersimpan."),
    }

    Ok(())
}
