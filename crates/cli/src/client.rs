//! API client for communicating with the carbon agent

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the carbon agent
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub timestamp: String,
    pub network: NetworkStats,
    pub carbon: CarbonStats,
    pub energy: EnergyStats,
    pub system: SystemStats,
    #[serde(default)]
    pub processes: Vec<ProcessStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStats {
    pub packets: u64,
    pub bytes_sent_mb: f64,
    pub bytes_received_mb: f64,
    pub total_mb: f64,
    pub active_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarbonStats {
    pub cpu_carbon_g: f64,
    pub network_carbon_g: f64,
    pub total_carbon_g: f64,
    pub total_carbon_kg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyStats {
    pub cpu_power_w: f64,
    pub total_energy_kwh: f64,
    pub runtime_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_used_gb: f64,
    pub memory_total_gb: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessStats {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: History,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    pub timestamps: Vec<String>,
    pub cpu_usage: Vec<f64>,
    pub network_mb: Vec<f64>,
    pub carbon_emissions: Vec<f64>,
    pub energy_consumption: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesResponse {
    pub series: String,
    pub unit: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeRequest {
    #[serde(rename = "type")]
    pub optimization_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub success: bool,
    pub optimization_type: String,
    pub actions: Vec<Action>,
    pub estimated_reduction: String,
    pub before_carbon_g: Option<f64>,
    pub after_carbon_g: Option<f64>,
    pub reduction_g: Option<f64>,
    pub reduction_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action: String,
    pub details: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationDataResponse {
    pub optimization_data: OptimizationData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationData {
    pub before_carbon_g: Option<f64>,
    pub after_carbon_g: Option<f64>,
    pub reduction_g: Option<f64>,
    pub reduction_percent: Option<f64>,
    pub strategy_id: Option<String>,
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsResponse {
    pub savings: BTreeMap<String, SavingsEstimate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsEstimate {
    pub name: String,
    pub description: String,
    pub potential_reduction_percent: f64,
    pub estimated_savings_g: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
