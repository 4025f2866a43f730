use serde::Deserialize;
use thiserror::Error;

use retailscope_shared::models::{
    BoundaryCollection, BoundaryLevel, CatchmentData, CompetitorGroup, EnrichmentSummary,
    IrveStation, IrveStats, Poi, Store, ZoneAnalysis, ZoneAnalyzeRequest,
};

use crate::auth::AuthContext;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http status {status}")]
    Http { status: u16 },
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// A 503 from the enrichment endpoint means the real provider is not
    /// configured for this tenant; callers fall back to the demo provider.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApiError::Http { status: 503 })
    }
}

// --- Query-string builders (pure, unit-tested) ---

pub fn competitor_stores_query(include_stores: bool) -> String {
    format!("/geo/competitor-stores?include_stores={include_stores}")
}

pub fn catchment_query(radius_km: u32) -> String {
    format!("/geo/catchment-zones?radius_km={radius_km}")
}

pub fn enrich_query(path: &str, force: bool, max_per_run: u32) -> String {
    format!("{path}?force={force}&max_per_run={max_per_run}")
}

pub fn irve_query(lat: f64, lng: f64, radius_km: f64, limit: u32) -> String {
    format!("/layers/irve?lat={lat}&lng={lng}&radius_km={radius_km}&limit={limit}")
}

pub fn poi_query(lat: f64, lng: f64, radius_m: f64, categories: &[&str]) -> String {
    format!(
        "/layers/poi?lat={lat}&lng={lng}&radius_m={radius_m}&categories={}",
        categories.join(",")
    )
}

// --- Response envelopes ---

#[derive(Debug, Deserialize)]
pub struct StoresResponse {
    pub stores: Vec<Store>,
}

#[derive(Debug, Deserialize)]
pub struct CompetitorStoresResponse {
    pub competitors: Vec<CompetitorGroup>,
}

#[derive(Debug, Deserialize)]
pub struct IrveResponse {
    pub stations: Vec<IrveStation>,
}

#[derive(Debug, Deserialize)]
pub struct PoiResponse {
    pub pois: Vec<Poi>,
}

/// Authenticated dashboard API client. Every request carries the bearer
/// token and tenant id from [`AuthContext`].
#[derive(Clone)]
pub struct ApiClient {
    base: String,
    auth: AuthContext,
    http: reqwest::Client,
}

impl ApiClient {
    /// Client against the page origin (production layout: same-origin API).
    pub fn from_origin(auth: AuthContext) -> Self {
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_default();
        Self::with_base(origin, auth)
    }

    pub fn with_base(base: impl Into<String>, auth: AuthContext) -> Self {
        Self {
            base: base.into(),
            auth,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base, path_and_query)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path_and_query: &str,
    ) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(self.url(path_and_query))
            .header("Authorization", self.auth.bearer())
            .header("X-Tenant-Id", &self.auth.tenant_id)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(ApiError::Http { status });
        }
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn post_json<T: for<'de> Deserialize<'de>, B: serde::Serialize>(
        &self,
        path_and_query: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self
            .http
            .post(self.url(path_and_query))
            .header("Authorization", self.auth.bearer())
            .header("X-Tenant-Id", &self.auth.tenant_id)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            return Err(ApiError::Http { status });
        }
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    // --- Endpoints ---

    pub async fn fetch_own_stores(&self) -> Result<Vec<Store>, ApiError> {
        let resp: StoresResponse = self.get_json("/geo/stores").await?;
        Ok(resp.stores)
    }

    pub async fn fetch_competitor_groups(
        &self,
        include_stores: bool,
    ) -> Result<Vec<CompetitorGroup>, ApiError> {
        let resp: CompetitorStoresResponse = self
            .get_json(&competitor_stores_query(include_stores))
            .await?;
        Ok(resp.competitors)
    }

    pub async fn fetch_catchment(&self, radius_km: u32) -> Result<CatchmentData, ApiError> {
        self.get_json(&catchment_query(radius_km)).await
    }

    pub async fn analyze_zone(&self, req: &ZoneAnalyzeRequest) -> Result<ZoneAnalysis, ApiError> {
        self.post_json("/geo/zone/analyze-enriched", req).await
    }

    /// Rating enrichment. A 503 from the real provider falls back to the
    /// demo provider with the same parameters.
    pub async fn enrich_ratings(
        &self,
        force: bool,
        max_per_run: u32,
    ) -> Result<EnrichmentSummary, ApiError> {
        let primary = enrich_query("/geo/stores/enrich-gmb", force, max_per_run);
        match self
            .post_json::<EnrichmentSummary, _>(&primary, &serde_json::json!({}))
            .await
        {
            Err(e) if e.is_unavailable() => {
                let demo = enrich_query("/geo/stores/enrich-gmb-demo", force, max_per_run);
                self.post_json(&demo, &serde_json::json!({})).await
            }
            other => other,
        }
    }

    pub async fn fetch_irve(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: u32,
    ) -> Result<Vec<IrveStation>, ApiError> {
        let resp: IrveResponse = self.get_json(&irve_query(lat, lng, radius_km, limit)).await?;
        Ok(resp.stations)
    }

    pub async fn fetch_irve_stats(&self) -> Result<IrveStats, ApiError> {
        self.get_json("/layers/irve/stats").await
    }

    pub async fn fetch_poi(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
        categories: &[&str],
    ) -> Result<Vec<Poi>, ApiError> {
        let resp: PoiResponse = self
            .get_json(&poi_query(lat, lng, radius_m, categories))
            .await?;
        Ok(resp.pois)
    }

    pub async fn fetch_boundaries(
        &self,
        level: BoundaryLevel,
    ) -> Result<BoundaryCollection, ApiError> {
        self.get_json(&format!("/layers/boundaries/{}", level.as_str()))
            .await
    }
}
