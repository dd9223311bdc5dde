//! Collaborators that deliver raw bank text.

use async_trait::async_trait;
use std::path::PathBuf;

use cbt_core::BankError;
use cbt_core::bank::{LoadReport, load_bank_strict};

/// Delivers the bank as opaque delimited text.
#[async_trait]
pub trait BankSource: Send + Sync {
    /// Fetch the raw bank text.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Unavailable` when the text cannot be obtained.
    async fn fetch(&self) -> Result<String, BankError>;

    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
}

/// Reads the bank from a local file.
#[derive(Debug, Clone)]
pub struct FileBankSource {
    path: PathBuf,
}

impl FileBankSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl BankSource for FileBankSource {
    async fn fetch(&self) -> Result<String, BankError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| BankError::Unavailable(format!("{}: {err}", self.path.display())))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Fetches the bank over HTTP(S). Non-success statuses count as unavailable.
#[derive(Debug, Clone)]
pub struct HttpBankSource {
    client: reqwest::Client,
    url: String,
}

impl HttpBankSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

#[async_trait]
impl BankSource for HttpBankSource {
    async fn fetch(&self) -> Result<String, BankError> {
        let unavailable = |err: reqwest::Error| BankError::Unavailable(err.to_string());
        self.client
            .get(&self.url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .text()
            .await
            .map_err(unavailable)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Serves fixed text; handy for tests and embedded banks.
#[derive(Debug, Clone)]
pub struct StaticBankSource(pub String);

#[async_trait]
impl BankSource for StaticBankSource {
    async fn fetch(&self) -> Result<String, BankError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        "static bank".to_string()
    }
}

/// Fetch and parse a bank, treating text without usable questions as unavailable.
///
/// # Errors
///
/// Returns `BankError` if the source fails or yields no questions.
pub async fn fetch_bank(source: &dyn BankSource) -> Result<LoadReport, BankError> {
    let text = source.fetch().await?;
    load_bank_strict(&text)
}
