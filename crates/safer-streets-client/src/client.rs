//! HTTP client for the Safer Streets API

use reqwest::{RequestBuilder, Response};
use safer_streets_core::wire::{
    CountsResponse, HealthResponse, HotspotsResponse, NationalHotspotsResponse, PfaAreaResponse,
    ReloadResponse,
};
use safer_streets_core::{
    Area, AreaSummary, ErrorBody, HotspotRepetition, Month, PersistenceReport, Record, SpatialUnit,
    API_KEY_HEADER,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Query parameters as sent on the wire.
pub type Params = Vec<(&'static str, String)>;

/// Parameters of a hotspot repetition request. Unset fields take the
/// server defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepetitionRequest {
    pub window: Option<usize>,
    pub step: Option<usize>,
    pub prediction: Option<usize>,
    pub coverage: Option<f64>,
    pub n_hotspots: Option<usize>,
}

impl RepetitionRequest {
    fn params(&self, force: &str, category: &str) -> Params {
        let mut params = vec![("force", force.to_string()), ("category", category.to_string())];
        let optional = [
            ("window", self.window.map(|v| v.to_string())),
            ("step", self.step.map(|v| v.to_string())),
            ("prediction", self.prediction.map(|v| v.to_string())),
            ("coverage", self.coverage.map(|v| v.to_string())),
            ("n_hotspots", self.n_hotspots.map(|v| v.to_string())),
        ];
        params.extend(optional.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));
        params
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::Unavailable(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(API_KEY_HEADER, &self.config.api_key)
    }

    /// GET `endpoint` and return the raw JSON body.
    pub async fn get_value(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ClientError> {
        debug!("GET {} {:?}", endpoint, params);
        let request = self.authorized(self.http.get(self.url(endpoint)).query(params));
        decode(request.send().await?).await
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let value = self.get_value(endpoint, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        debug!("POST {}", endpoint);
        let request = self.authorized(self.http.post(self.url(endpoint)).json(body));
        let value = decode(request.send().await?).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get_json("/api/health", &[]).await
    }

    pub async fn forces(&self) -> Result<Vec<AreaSummary>, ClientError> {
        self.get_json("/forces", &[]).await
    }

    pub async fn area(&self, force: &str) -> Result<Area, ClientError> {
        self.get_json("/area", &force_params(force)).await
    }

    pub async fn pfa_area(&self, force: &str) -> Result<PfaAreaResponse, ClientError> {
        self.get_json("/pfa_area", &force_params(force)).await
    }

    pub async fn record(&self, dataset: &str, force: &str) -> Result<Record, ClientError> {
        self.get_json("/records", &record_params(dataset, force)).await
    }

    pub async fn persistence(&self, force: &str, series: &str) -> Result<PersistenceReport, ClientError> {
        self.get_json("/persistence", &persistence_params(force, series)).await
    }

    pub async fn counts(&self, force: &str, category: &str) -> Result<CountsResponse, ClientError> {
        self.get_json("/counts", &counts_params(force, category)).await
    }

    pub async fn hotspots(
        &self,
        force: &str,
        category: &str,
        months: &[Month],
        n_hotspots: usize,
    ) -> Result<HotspotsResponse, ClientError> {
        self.get_json("/hotspots", &hotspot_params(force, category, months, n_hotspots))
            .await
    }

    /// Top cells across every force.
    pub async fn national_hotspots(
        &self,
        category: &str,
        months: &[Month],
        n_hotspots: usize,
    ) -> Result<NationalHotspotsResponse, ClientError> {
        self.get_json("/hotspots/national", &national_params(category, months, n_hotspots))
            .await
    }

    pub async fn repetition(
        &self,
        force: &str,
        category: &str,
        request: &RepetitionRequest,
    ) -> Result<HotspotRepetition, ClientError> {
        self.get_json("/hotspots/repetition", &request.params(force, category))
            .await
    }

    /// GeoJSON FeatureCollection for the given cells.
    pub async fn hexes(&self, ids: &[SpatialUnit]) -> Result<Value, ClientError> {
        self.post_json("/hexes", ids).await
    }

    pub async fn reload(&self) -> Result<ReloadResponse, ClientError> {
        self.post_json("/admin/reload", &Value::Null).await
    }
}

async fn decode(response: Response) -> Result<Value, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<Value>().await?);
    }
    // an unreadable error body still classifies by status
    let body = response.json::<ErrorBody>().await.ok();
    debug!("Request failed with {}: {:?}", status, body);
    Err(ClientError::from_response(status, body))
}

pub(crate) fn force_params(force: &str) -> Params {
    vec![("force", force.to_string())]
}

pub(crate) fn record_params(dataset: &str, force: &str) -> Params {
    vec![("dataset", dataset.to_string()), ("force", force.to_string())]
}

pub(crate) fn persistence_params(force: &str, series: &str) -> Params {
    vec![("force", force.to_string()), ("series", series.to_string())]
}

pub(crate) fn counts_params(force: &str, category: &str) -> Params {
    vec![("force", force.to_string()), ("category", category.to_string())]
}

pub(crate) fn hotspot_params(force: &str, category: &str, months: &[Month], n_hotspots: usize) -> Params {
    let mut params = vec![("force", force.to_string())];
    params.extend(national_params(category, months, n_hotspots));
    params
}

pub(crate) fn national_params(category: &str, months: &[Month], n_hotspots: usize) -> Params {
    let months: Vec<String> = months.iter().map(Month::to_string).collect();
    vec![
        ("category", category.to_string()),
        ("months", months.join(",")),
        ("n_hotspots", n_hotspots.to_string()),
    ]
}

pub(crate) fn repetition_params(force: &str, category: &str, request: &RepetitionRequest) -> Params {
    request.params(force, category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repetition_params_skip_unset() {
        let request = RepetitionRequest {
            window: Some(3),
            coverage: Some(0.5),
            ..Default::default()
        };
        let params = request.params("WYP", "burglary");
        assert_eq!(
            params,
            vec![
                ("force", "WYP".to_string()),
                ("category", "burglary".to_string()),
                ("window", "3".to_string()),
                ("coverage", "0.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_hotspot_months_joined() {
        let months = [Month::new(2024, 1).unwrap(), Month::new(2024, 2).unwrap()];
        let params = hotspot_params("WYP", "burglary", &months, 5);
        assert_eq!(params[2], ("months", "2024-01,2024-02".to_string()));

        let national = national_params("burglary", &months, 5);
        assert_eq!(national, params[1..].to_vec());
    }
}
