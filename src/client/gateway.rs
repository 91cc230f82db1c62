//! Remote access to the links API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::domain::links::Link;
use crate::domain::types::LinkScope;
use crate::infra::http::api::error::ApiErrorBody;
use crate::infra::http::api::models::{
    LinkCreateRequest, LinkUpdateRequest, LinkUpdateResponse, SuccessResponse,
};

use super::error::ClientError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The network round-trips the optimistic store depends on.
#[async_trait]
pub trait LinkGateway: Send + Sync {
    async fn fetch_links(&self, workspace_id: Uuid, scope: LinkScope)
    -> Result<Vec<Link>, ClientError>;

    async fn create_link(&self, request: &LinkCreateRequest) -> Result<Link, ClientError>;

    /// Returns the canonical record after the update.
    async fn update_link(
        &self,
        id: Uuid,
        request: &LinkUpdateRequest,
    ) -> Result<Link, ClientError>;

    async fn delete_link(&self, id: Uuid) -> Result<(), ClientError>;
}

/// [`LinkGateway`] over HTTP. Timeouts surface as [`ClientError::Network`].
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    pub fn new(site: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Self::with_client(client, site)
    }

    pub fn with_client(client: Client, site: &str) -> Result<Self, ClientError> {
        let base = Url::parse(site)?.join("/")?;
        Ok(Self { client, base })
    }

    pub fn user_agent() -> &'static str {
        concat!("linkstash-client/", env!("CARGO_PKG_VERSION"))
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base.join(path).map_err(ClientError::Url)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        Ok(self.client.request(method, self.url(path)?))
    }

    async fn handle<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(match serde_json::from_slice::<ApiErrorBody>(&bytes) {
                Ok(body) => ClientError::Server {
                    status,
                    code: body.error.code,
                    message: body.error.message,
                },
                Err(_) => ClientError::Server {
                    status,
                    code: "unknown".to_string(),
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                },
            });
        }
        serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[async_trait]
impl LinkGateway for HttpGateway {
    async fn fetch_links(
        &self,
        workspace_id: Uuid,
        scope: LinkScope,
    ) -> Result<Vec<Link>, ClientError> {
        let mut url = self.url("api/links")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("workspaceId", &workspace_id.to_string());
            match scope {
                LinkScope::All => query.append_pair("all", "true"),
                LinkScope::Category(category) => query.append_pair("category", category.as_str()),
            };
        }
        let resp = self.client.get(url).send().await?;
        Self::handle(resp).await
    }

    async fn create_link(&self, request: &LinkCreateRequest) -> Result<Link, ClientError> {
        let resp = self
            .request(Method::POST, "api/links")?
            .json(request)
            .send()
            .await?;
        Self::handle(resp).await
    }

    async fn update_link(
        &self,
        id: Uuid,
        request: &LinkUpdateRequest,
    ) -> Result<Link, ClientError> {
        let resp = self
            .request(Method::PATCH, &format!("api/links/{id}"))?
            .json(request)
            .send()
            .await?;
        let body: LinkUpdateResponse = Self::handle(resp).await?;
        if body.success {
            Ok(body.link)
        } else {
            Err(ClientError::Decode("server reported success=false".to_string()))
        }
    }

    async fn delete_link(&self, id: Uuid) -> Result<(), ClientError> {
        let resp = self
            .request(Method::DELETE, &format!("api/links/{id}"))?
            .send()
            .await?;
        let body: SuccessResponse = Self::handle(resp).await?;
        if body.success {
            Ok(())
        } else {
            Err(ClientError::Decode("server reported success=false".to_string()))
        }
    }
}
