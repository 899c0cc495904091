//! Prediction command

use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tabled::Tabled;

use crate::client::{ApiClient, ApiError, PredictionResponse};
use crate::output::{
    color_confidence, color_level, format_probability, print_json, print_table, probability_bar,
    OutputFormat,
};

#[derive(Tabled)]
struct ProbabilityRow {
    #[tabled(rename = "Level")]
    level: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "")]
    bar: String,
}

#[derive(Tabled)]
struct FieldErrorRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Problem")]
    message: String,
}

/// Read a JSON record from a file, or stdin when the path is `-`
pub fn read_record(path: &Path) -> Result<Value> {
    let content = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    serde_json::from_str(&content).context("Input is not valid JSON")
}

pub async fn predict(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let record = read_record(file)?;

    let result = match client.predict(&record).await {
        Ok(result) => result,
        Err(e) => {
            if let Some(api_error) = e.downcast_ref::<ApiError>() {
                print_field_errors(api_error);
            }
            return Err(e);
        }
    };

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_result(&result),
    }
    Ok(())
}

fn print_result(result: &PredictionResponse) {
    println!("{}", "Prediction".bold());
    println!("{}", "=".repeat(50));
    println!("Level:        {} (code {})", color_level(&result.prediction), result.prediction_code);
    println!("Confidence:   {}", color_confidence(result.confidence));
    println!("BMI:          {:.2} ({})", result.bmi, result.bmi_category.cyan());
    println!();

    let rows = result
        .ranked()
        .into_iter()
        .map(|(label, p)| ProbabilityRow {
            level: label.to_string(),
            probability: format_probability(p),
            bar: probability_bar(p, 20),
        })
        .collect();
    print_table::<ProbabilityRow>(rows);
}

/// Table of offending fields; the error itself is reported by the caller
fn print_field_errors(error: &ApiError) {
    if !error.errors.is_empty() {
        let rows = error
            .errors
            .iter()
            .map(|e| FieldErrorRow {
                field: e.field.clone(),
                message: e.message.clone(),
            })
            .collect();
        print_table::<FieldErrorRow>(rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_record_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"Gender": "Female", "Age": 31}}"#).unwrap();
        let record = read_record(file.path()).unwrap();
        assert_eq!(record["Gender"], "Female");
    }

    #[test]
    fn test_read_record_errors() {
        assert!(read_record(Path::new("/nonexistent/input.json")).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Gender=Female").unwrap();
        assert!(read_record(file.path()).is_err());
    }
}
