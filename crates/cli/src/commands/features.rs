//! Feature catalog command

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, FeatureCatalog, FeatureSpec};
use crate::output::{print_json, OutputFormat};

/// Row for the features table
#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Fitur")]
    name: String,
    #[tabled(rename = "Deskripsi")]
    description: String,
    #[tabled(rename = "Rentang")]
    range_hint: String,
    #[tabled(rename = "Pilihan")]
    choices: String,
}

fn choices_text(spec: &FeatureSpec) -> String {
    spec.choices
        .iter()
        .map(|c| c.label.as_str())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// List the inputs the classifier expects, in model order
pub async fn list_features(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let catalog: FeatureCatalog = client.get("api/v1/features").await?;

    match format {
        OutputFormat::Json => print_json(&catalog)?,
        OutputFormat::Table => {
            let rows: Vec<FeatureRow> = catalog
                .features
                .iter()
                .enumerate()
                .map(|(i, spec)| FeatureRow {
                    position: i + 1,
                    name: spec.name.clone(),
                    description: spec.description.clone(),
                    range_hint: spec.range_hint.clone(),
                    choices: choices_text(spec),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
        }
    }

    Ok(())
}
