//! Service metadata commands: health, labels, features

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, FeatureInfo};
use crate::output::{color_status, print_info, print_json, print_table, print_warning, OutputFormat};

#[derive(Tabled)]
struct LabelRow {
    #[tabled(rename = "Code")]
    code: u8,
    #[tabled(rename = "Label")]
    label: String,
}

#[derive(Tabled)]
struct FeatureRow {
    #[tabled(rename = "Feature")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Allowed")]
    allowed: String,
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn allowed_values(info: &FeatureInfo) -> String {
    match (&info.range, &info.values) {
        (Some([min, max]), _) => format!("{} - {}", min, max),
        (None, Some(values)) => values.join(", "),
        (None, None) => "-".to_string(),
    }
}

pub async fn health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}", "Service Health".bold());
            println!("{}", "=".repeat(40));
            println!("Endpoint:     {}", client.base_url().as_str().cyan());
            println!("Status:       {}", color_status(&health.status));
            println!("Version:      {}", health.version);
            println!(
                "Model:        {}",
                health.model_format.as_deref().unwrap_or("not loaded")
            );
            if let Some(checked_at) = &health.checked_at {
                println!("Checked at:   {}", format_timestamp(checked_at));
            }
            if !health.model_loaded {
                println!();
                print_warning("No model is loaded; predictions will fail with 503");
            }
        }
    }
    Ok(())
}

pub async fn labels(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let labels = client.labels().await?;

    match format {
        OutputFormat::Json => print_json(&labels)?,
        OutputFormat::Table => {
            let rows = labels
                .by_code()
                .into_iter()
                .map(|(code, label)| LabelRow {
                    code,
                    label: label.to_string(),
                })
                .collect();
            print_table::<LabelRow>(rows);
            print_info(&format!("{} classes", labels.total_classes));
        }
    }
    Ok(())
}

pub async fn features(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let features = client.features().await?;

    match format {
        OutputFormat::Json => print_json(&features)?,
        OutputFormat::Table => {
            let rows = features
                .features
                .iter()
                .map(|(name, info)| FeatureRow {
                    name: name.clone(),
                    kind: info.kind.clone(),
                    allowed: allowed_values(info),
                    unit: info.unit.clone().unwrap_or_default(),
                    description: info.description.clone().unwrap_or_default(),
                })
                .collect();
            print_table::<FeatureRow>(rows);
        }
    }
    Ok(())
}

/// Render an RFC 3339 timestamp in local time, or as given if unparsable
fn format_timestamp(ts: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(ts)
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| ts.to_string())
}
