//! Prediction command

use anyhow::{Context, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, IncompleteResponse, PredictReply, PredictResponse, SessionCreated};
use crate::output::{
    color_label, format_percent, format_value, print_json, print_warning, OutputFormat,
};

/// Row for the submitted inputs table
#[derive(Tabled)]
struct InputRow {
    #[tabled(rename = "Fitur")]
    name: String,
    #[tabled(rename = "Nilai")]
    value: String,
}

/// Row for the class probability table
#[derive(Tabled)]
struct ProbabilityRow {
    #[tabled(rename = "Kelas")]
    class: String,
    #[tabled(rename = "Probabilitas")]
    probability: String,
    #[tabled(rename = "")]
    bar: String,
}

fn bar(probability: f64) -> String {
    let width = (probability.clamp(0.0, 1.0) * 20.0).round() as usize;
    "█".repeat(width)
}

/// Parse a `NAME=VALUE` argument. Splits on the first `=`.
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{}`", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing feature name in `{}`", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Read a JSON object of feature name to value. Numbers are accepted as-is.
pub fn read_input_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let object: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&content).context("Input file must be a JSON object")?;

    object
        .into_iter()
        .map(|(name, value)| {
            let value = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::Null => String::new(),
                other => anyhow::bail!("Unsupported value for {}: {}", name, other),
            };
            Ok((name, value))
        })
        .collect()
}

/// Submit one form and show the result
pub async fn run_prediction(
    client: &ApiClient,
    input_file: Option<&Path>,
    assignments: Vec<(String, String)>,
    format: OutputFormat,
) -> Result<()> {
    let mut inputs = match input_file {
        Some(path) => read_input_file(path)?,
        None => BTreeMap::new(),
    };
    inputs.extend(assignments);

    let session: SessionCreated = client.post("api/v1/sessions", &serde_json::json!({})).await?;
    let reply = client.predict(&session.session_id, &inputs).await;

    if let Err(e) = client
        .delete(&format!("api/v1/sessions/{}", session.session_id))
        .await
    {
        print_warning(&format!("Could not close session: {}", e));
    }

    let reply = reply?;
    match format {
        OutputFormat::Json => print_json(&reply)?,
        OutputFormat::Table => match &reply {
            PredictReply::Predicted(result) => print_result(result),
            PredictReply::Incomplete(body) => print_incomplete(body),
        },
    }

    if let PredictReply::Incomplete(_) = reply {
        std::process::exit(2);
    }
    Ok(())
}

fn print_result(result: &PredictResponse) {
    println!("{} {}", "Hasil:".bold(), color_label(&result.label));
    println!("{}", result.probability_text);
    println!();

    let probabilities = vec![
        ProbabilityRow {
            class: "Tidak PCOS".to_string(),
            probability: format_percent(result.distribution[0]),
            bar: bar(result.distribution[0]),
        },
        ProbabilityRow {
            class: "PCOS".to_string(),
            probability: format_percent(result.distribution[1]),
            bar: bar(result.distribution[1]),
        },
    ];
    let table = tabled::Table::new(probabilities)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);

    let inputs: Vec<InputRow> = result
        .inputs
        .iter()
        .map(|i| InputRow {
            name: i.name.clone(),
            value: format_value(i.value),
        })
        .collect();
    let table = tabled::Table::new(inputs)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);

    println!();
    println!("{}", "Rekomendasi".bold());
    println!("{}", result.recommendation);
    println!();
    println!("{}", result.disclaimer.dimmed());
}

fn print_incomplete(body: &IncompleteResponse) {
    print_warning(&body.message);
    for field in &body.missing {
        println!("  - {}", field);
    }
    for err in &body.field_errors {
        println!("  {} {}", "✗".red(), err.message);
    }
}
