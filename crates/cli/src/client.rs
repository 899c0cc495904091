//! API client for the Obesity Level Prediction API

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use url::Url;

pub const API_KEY_HEADER: &str = "X-API-Key";

/// A non-2xx answer from the service
#[derive(Debug, Error)]
#[error("{detail} ({status}, {code})")]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub detail: String,
    pub errors: Vec<FieldErrorBody>,
}

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // Relative joins keep any path prefix only with a trailing slash.
        let mut base_url = Url::parse(base_url).context("Invalid API URL")?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .with_key(self.client.get(self.url(path)?))
            .send()
            .await
            .context("Failed to send request")?;
        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .with_key(self.client.post(self.url(path)?).json(body))
            .send()
            .await
            .context("Failed to send request")?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.context("Failed to parse response");
        }

        let body = response.text().await.unwrap_or_default();
        let error = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => ApiError {
                status: status.as_u16(),
                code: parsed.error_code.unwrap_or_else(|| "UNKNOWN".to_string()),
                detail: parsed.detail,
                errors: parsed.errors,
            },
            Err(_) => ApiError {
                status: status.as_u16(),
                code: "UNKNOWN".to_string(),
                detail: if body.is_empty() {
                    status.to_string()
                } else {
                    body
                },
                errors: Vec::new(),
            },
        };
        Err(error.into())
    }

    pub async fn predict(&self, record: &serde_json::Value) -> Result<PredictionResponse> {
        self.post("predict", record).await
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        self.get("health").await
    }

    pub async fn labels(&self) -> Result<LabelsResponse> {
        self.get("labels").await
    }

    pub async fn features(&self) -> Result<FeaturesResponse> {
        self.get("features").await
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub prediction_code: u8,
    pub probabilities: HashMap<String, f64>,
    pub confidence: f64,
    pub bmi: f64,
    pub bmi_category: String,
}

impl PredictionResponse {
    /// Label/probability pairs, most likely first
    pub fn ranked(&self) -> Vec<(&str, f64)> {
        let mut ranked: Vec<(&str, f64)> = self
            .probabilities
            .iter()
            .map(|(label, p)| (label.as_str(), *p))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    #[serde(default)]
    pub model_format: Option<String>,
    pub version: String,
    #[serde(default)]
    pub checked_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsResponse {
    pub labels: BTreeMap<String, String>,
    pub total_classes: usize,
}

impl LabelsResponse {
    /// Labels ordered by numeric class code
    pub fn by_code(&self) -> Vec<(u8, &str)> {
        let mut labels: Vec<(u8, &str)> = self
            .labels
            .iter()
            .filter_map(|(code, label)| code.parse().ok().map(|c| (c, label.as_str())))
            .collect();
        labels.sort_by_key(|(code, _)| *code);
        labels
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    #[serde(default)]
    pub range: Option<[f64; 2]>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesResponse {
    /// Input fields in the order the service declares them
    #[serde(with = "ordered_map")]
    pub features: Vec<(String, FeatureInfo)>,
}

/// A JSON object kept as a list of entries in document order
mod ordered_map {
    use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
    use serde::ser::{Serialize, SerializeMap, Serializer};
    use std::fmt;
    use std::marker::PhantomData;

    pub fn serialize<S, V>(entries: &[(String, V)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Vec<(String, V)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some(entry) = access.next_entry()? {
                    entries.push(entry);
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldErrorBody {
    pub field: String,
    #[serde(default)]
    pub kind: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub errors: Vec<FieldErrorBody>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn prediction_body() -> String {
        json!({
            "prediction": "Normal_Weight",
            "prediction_code": 1,
            "probabilities": {
                "Insufficient_Weight": 0.02, "Normal_Weight": 0.85, "Overweight_Level_I": 0.05,
                "Overweight_Level_II": 0.03, "Obesity_Type_I": 0.02, "Obesity_Type_II": 0.02,
                "Obesity_Type_III": 0.01
            },
            "confidence": 0.85,
            "bmi": 24.49,
            "bmi_category": "Normal"
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_predict_sends_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/predict")
            .match_header("x-api-key", "s3cret")
            .match_body(Matcher::PartialJson(json!({"Gender": "Male"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(prediction_body())
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), Some("s3cret".to_string())).unwrap();
        let result = client.predict(&json!({"Gender": "Male"})).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.prediction, "Normal_Weight");
        assert_eq!(result.ranked()[0], ("Normal_Weight", 0.85));
    }

    #[test]
    fn test_features_keep_server_order() {
        let body = json!({
            "features": {
                "Gender": {"type": "string", "values": ["Male", "Female"]},
                "Age": {"type": "float", "range": [10.0, 120.0], "unit": "years"},
                "MTRANS": {"type": "string", "values": ["Automobile", "Walking"]}
            }
        })
        .to_string();

        let parsed: FeaturesResponse = serde_json::from_str(&body).unwrap();
        let names: Vec<&str> = parsed.features.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["Gender", "Age", "MTRANS"]);
        assert_eq!(parsed.features[1].1.range, Some([10.0, 120.0]));

        let echoed = serde_json::to_string(&parsed).unwrap();
        assert!(echoed.find("Gender").unwrap() < echoed.find("MTRANS").unwrap());
    }

    #[tokio::test]
    async fn test_error_body_is_parsed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/predict")
            .with_status(422)
            .with_body(
                json!({
                    "detail": "Input validation error",
                    "error_code": "VALIDATION_ERROR",
                    "errors": [{"field": "Age", "kind": "out_of_range", "message": "must be between 10 and 120"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), None).unwrap();
        let err = client.predict(&json!({})).await.unwrap_err();
        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.status, 422);
        assert_eq!(api_error.code, "VALIDATION_ERROR");
        assert_eq!(api_error.errors[0].field, "Age");
    }

    #[tokio::test]
    async fn test_non_json_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ApiClient::new(&server.url(), None).unwrap();
        let err = client.health().await.unwrap_err();
        let api_error = err.downcast_ref::<ApiError>().unwrap();
        assert_eq!(api_error.code, "UNKNOWN");
        assert_eq!(api_error.detail, "bad gateway");
    }

    #[test]
    fn test_base_url_keeps_prefix() {
        let client = ApiClient::new("http://gateway.local/obesity", None).unwrap();
        assert_eq!(
            client.url("predict").unwrap().as_str(),
            "http://gateway.local/obesity/predict"
        );
        assert!(ApiClient::new("not a url", None).is_err());
    }

    #[test]
    fn test_labels_by_code() {
        let labels: LabelsResponse = serde_json::from_value(json!({
            "labels": {"10": "x", "2": "Overweight_Level_I", "0": "Insufficient_Weight"},
            "total_classes": 3
        }))
        .unwrap();
        let codes: Vec<u8> = labels.by_code().iter().map(|(c, _)| *c).collect();
        assert_eq!(codes, vec![0, 2, 10]);
    }
}
