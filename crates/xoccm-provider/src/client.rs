//! Xen Orchestra REST client
//!
//! Talks to the `/rest/v0` API. Only the calls needed by [`VmInventory`] are
//! implemented.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::StatusCode;
use tracing::{debug, info};
use uuid::Uuid;

use xoccm_common::Error;

use crate::config::XoConfig;
use crate::inventory::{VmInventory, VmRecord};

/// Fields requested for every VM object
const VM_FIELDS: &str = "id,name_label,$pool,$container,CPUs,memory,power_state";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
enum Auth {
    Token(String),
    Basic { username: String, password: String },
}

/// HTTP client for one Xen Orchestra instance
#[derive(Clone)]
pub struct XoClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl XoClient {
    /// Build a client from a validated config
    pub fn new(config: &XoConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| {
                Error::transport_with_context("client", format!("failed to build HTTP client: {e}"))
            })?;

        let auth = if config.token.is_empty() {
            Auth::Basic {
                username: config.username.clone(),
                password: config.password.clone(),
            }
        } else {
            Auth::Token(config.token.clone())
        };

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Verify connectivity and permissions by listing at most one VM
    pub async fn check(&self) -> Result<(), Error> {
        let vms = self.list("", Some(1)).await?;
        if vms.is_empty() {
            info!("Xen Orchestra instance has no VMs, or check the account permission");
        } else {
            debug!(count = vms.len(), "Xen Orchestra instance has VMs");
        }
        Ok(())
    }

    fn vms_url(&self) -> String {
        format!("{}/rest/v0/vms", self.base_url)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.auth {
            Auth::Token(token) => request.header(COOKIE, format!("authenticationToken={token}")),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

async fn error_body(context: &str, response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Error::transport_with_context(context, format!("API error: {status} {body}"))
}

#[async_trait]
impl VmInventory for XoClient {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<VmRecord>, Error> {
        let url = format!("{}/{}", self.vms_url(), id);
        let response = self
            .get(&url)
            .query(&[("fields", VM_FIELDS)])
            .send()
            .await
            .map_err(|e| Error::transport_with_context("get_vm", e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_body("get_vm", response).await);
        }

        let vm = response
            .json::<VmRecord>()
            .await
            .map_err(|e| Error::transport_with_context("get_vm", format!("invalid VM object: {e}")))?;
        Ok(Some(vm))
    }

    async fn list(&self, filter: &str, limit: Option<usize>) -> Result<Vec<VmRecord>, Error> {
        let mut query = vec![("fields", VM_FIELDS.to_string())];
        if !filter.is_empty() {
            query.push(("filter", filter.to_string()));
        }
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let response = self
            .get(&self.vms_url())
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::transport_with_context("list_vms", e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_body("list_vms", response).await);
        }

        response
            .json::<Vec<VmRecord>>()
            .await
            .map_err(|e| Error::transport_with_context("list_vms", format!("invalid VM list: {e}")))
    }
}
