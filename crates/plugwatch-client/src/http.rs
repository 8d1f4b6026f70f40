//! JSON-RPC over HTTP client for the Zabbix API

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use plugwatch_api::{
    ConfigurationImport, CreatedHosts, GroupRef, HostCreate, HostRef, LoginRequest, ObjectQuery,
    RpcRequest, RpcResponse, TemplateRef,
};

use crate::error::{ClientError, Result};
use crate::traits::{ManagementApi, SessionHandle};

/// Script name of the JSON-RPC endpoint under the frontend root
const API_SCRIPT: &str = "api_jsonrpc.php";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for the Zabbix JSON-RPC API
#[derive(Debug, Clone)]
pub struct ZabbixClient {
    client: Client,
    endpoint: Url,
    next_id: Arc<AtomicU64>,
}

impl ZabbixClient {
    /// Create a new client
    ///
    /// `url` is either the frontend root (`http://zabbix-web:8080`) or the
    /// full endpoint (`http://zabbix-web:8080/api_jsonrpc.php`).
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(url: impl AsRef<str>) -> Result<Self> {
        let client = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Self::with_client(url, client)
    }

    /// Create a new client with a custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the URL is invalid.
    pub fn with_client(url: impl AsRef<str>, client: Client) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: Self::endpoint_url(url.as_ref())?,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Endpoint all calls are posted to
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn endpoint_url(url: &str) -> Result<Url> {
        let mut base = Url::parse(url)?;
        if base.path().ends_with(".php") {
            return Ok(base);
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(API_SCRIPT)?)
    }

    /// Perform one JSON-RPC call and deserialize its `result`
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: impl Serialize,
        session: Option<&SessionHandle>,
    ) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(method, serde_json::to_value(params)?, id);

        debug!(method, id, "calling management API");

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(session) = session {
            builder = builder.bearer_auth(session.token());
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Api { status, message });
        }

        let body = response.text().await?;
        let reply: RpcResponse = serde_json::from_str(&body)
            .map_err(|e| ClientError::InvalidResponse(format!("{method}: {e}")))?;

        if let Some(error) = reply.error {
            return Err(ClientError::Rpc {
                method: method.to_string(),
                error,
            });
        }

        let result = reply.result.ok_or_else(|| {
            ClientError::InvalidResponse(format!("{method}: reply has neither result nor error"))
        })?;

        serde_json::from_value(result)
            .map_err(|e| ClientError::InvalidResponse(format!("{method}: {e}")))
    }

    fn query(output: &[&str], field: &str, names: Option<&[String]>) -> ObjectQuery {
        let query = ObjectQuery::new(output);
        match names {
            Some(names) => query.filter(field, names),
            None => query,
        }
    }
}

#[async_trait]
impl ManagementApi for ZabbixClient {
    async fn api_version(&self) -> Result<String> {
        self.call("apiinfo.version", json!({}), None).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<SessionHandle> {
        let params = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let token: String = self.call("user.login", params, None).await?;
        Ok(SessionHandle::new(token))
    }

    async fn logout(&self, session: &SessionHandle) -> Result<()> {
        let _: Value = self.call("user.logout", json!([]), Some(session)).await?;
        Ok(())
    }

    async fn get_hosts(
        &self,
        session: &SessionHandle,
        names: Option<&[String]>,
    ) -> Result<Vec<HostRef>> {
        let query = Self::query(&["hostid", "host"], "host", names);
        self.call("host.get", query, Some(session)).await
    }

    async fn get_host_groups(
        &self,
        session: &SessionHandle,
        names: Option<&[String]>,
    ) -> Result<Vec<GroupRef>> {
        let query = Self::query(&["groupid", "name"], "name", names);
        self.call("hostgroup.get", query, Some(session)).await
    }

    async fn get_templates(
        &self,
        session: &SessionHandle,
        names: Option<&[String]>,
    ) -> Result<Vec<TemplateRef>> {
        let query = Self::query(&["templateid", "name"], "name", names);
        self.call("template.get", query, Some(session)).await
    }

    async fn create_host(&self, session: &SessionHandle, host: &HostCreate) -> Result<String> {
        let created: CreatedHosts = self.call("host.create", host, Some(session)).await?;
        created.hostids.into_iter().next().ok_or_else(|| {
            ClientError::InvalidResponse("host.create: reply carries no host id".to_string())
        })
    }

    async fn import_configuration(
        &self,
        session: &SessionHandle,
        import: &ConfigurationImport,
    ) -> Result<()> {
        let _: Value = self
            .call("configuration.import", import, Some(session))
            .await?;
        Ok(())
    }
}
