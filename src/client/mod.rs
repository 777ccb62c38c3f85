//! Scan client
//!
//! HTTP client for the scanning workflow: list materials, look one up by
//! barcode, record a movement. The bearer token is kept in a local file; a
//! 401 from the server discards it.

pub mod history;

use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use stockroom_types::{
    Credentials, ErrorBody, MaterialDto, RecordKind, RecordRequest, RecordResponse, TokenResponse,
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;

pub use history::{HistoryEntry, TransactionHistory};

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected before any request was sent
    #[error("{0}")]
    Validation(String),

    #[error("not authorized, log in first")]
    NoToken,

    #[error("authorization expired, log in again to get a new token")]
    AuthExpired,

    #[error("server returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("token file: {0}")]
    Io(#[from] std::io::Error),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Bearer token persisted between runs
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    pub fn save(&self, token: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, token)
    }

    pub fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove token file {}: {}", self.path.display(), e);
            }
        }
    }
}

pub struct ScanClient {
    http: Client,
    base: Url,
    tokens: TokenStore,
    token: Option<String>,
}

impl ScanClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let tokens = TokenStore::new(&config.token_file);
        let token = tokens.load();
        Ok(Self {
            http,
            base: Url::parse(config.api_base_url.trim_end_matches('/'))?,
            tokens,
            token,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn set_token(&mut self, token: &str) -> ClientResult<()> {
        self.tokens.save(token)?;
        self.token = Some(token.to_string());
        Ok(())
    }

    pub fn forget_token(&mut self) {
        self.tokens.clear();
        self.token = None;
    }

    /// `base` + percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation(format!("API URL cannot be a base: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, req: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = self.token.as_deref().ok_or(ClientError::NoToken)?;
        Ok(req.bearer_auth(token))
    }

    async fn read<T: DeserializeOwned>(&mut self, response: Response) -> ClientResult<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!("Server rejected the stored token");
            self.forget_token();
            return Err(ClientError::AuthExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(ClientError::Api { status, message });
        }
        Ok(response.json().await?)
    }

    /// Exchange credentials for a token and store it
    pub async fn login(&mut self, username: &str, password: &str) -> ClientResult<()> {
        let url = self.endpoint(&["login"])?;
        let body = Credentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        };
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|e| e.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(ClientError::Api { status, message });
        }
        let token: TokenResponse = response.json().await?;
        self.set_token(&token.access_token)
    }

    pub async fn list_materials(&mut self, category: Option<&str>) -> ClientResult<Vec<MaterialDto>> {
        let mut url = self.endpoint(&["materials"])?;
        if let Some(category) = category {
            url.query_pairs_mut().append_pair("category", category);
        }
        let response = self.authorized(self.http.get(url))?.send().await?;
        let materials: Vec<MaterialDto> = self.read(response).await?;
        debug!("Loaded {} materials", materials.len());
        Ok(materials)
    }

    pub async fn material_by_barcode(&mut self, barcode: &str) -> ClientResult<MaterialDto> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Err(ClientError::Validation("enter or scan a barcode".into()));
        }
        let url = self.endpoint(&["materials", "barcode", barcode])?;
        let response = self.authorized(self.http.get(url))?.send().await?;
        self.read(response).await
    }

    /// Record a scanned movement for a material previously looked up
    pub async fn submit_record(
        &mut self,
        material: Option<&MaterialDto>,
        kind: RecordKind,
        quantity: i64,
    ) -> ClientResult<RecordResponse> {
        let material = material
            .ok_or_else(|| ClientError::Validation("scan and select a material first".into()))?;
        if quantity < 1 {
            return Err(ClientError::Validation("quantity must be at least 1".into()));
        }

        let body = RecordRequest {
            item_id: Some(material.item_id.clone()),
            kind: Some(kind.as_str().to_string()),
            quantity: Some(serde_json::Value::from(quantity)),
            scan_mode: true,
            ..Default::default()
        };
        let url = self.endpoint(&["inventory", "record"])?;
        let response = self.authorized(self.http.post(url).json(&body))?.send().await?;
        self.read(response).await
    }
}
