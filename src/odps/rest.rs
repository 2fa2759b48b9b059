//! ODPS REST client implementation.
//!
//! Provides `RestOdpsClient`, which implements `OdpsClient` over the ODPS
//! REST API using reqwest, and `RestConnector`, which builds one per project.

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::form_urlencoded;

use super::xml::{self, InstanceState};
use super::{Connector, OdpsClient, QueryOutput, Signer, SqlInstance, TableSchema};
use crate::config::{EngineSettings, InstanceConfig};
use crate::error::{EngineError, Result};

/// Page size for table listings.
const TABLE_PAGE_SIZE: usize = 1000;

/// RFC 1123 date format used in the `Date` header.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// ODPS client for one project, speaking the REST API.
#[derive(Debug, Clone)]
pub struct RestOdpsClient {
    endpoint: String,
    project: String,
    signer: Signer,
    http: Client,
    poll_interval: Duration,
    job_timeout: Duration,
}

impl RestOdpsClient {
    /// Creates a client for `project` using the instance's credentials and endpoint.
    pub fn new(instance: &InstanceConfig, project: &str, settings: &EngineSettings) -> Result<Self> {
        let endpoint = instance.endpoint_url()?;
        let (access_id, access_key) = instance.credentials()?;

        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| EngineError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            project: project.to_string(),
            signer: Signer::new(access_id, access_key),
            http,
            poll_interval: settings.poll_interval(),
            job_timeout: settings.job_timeout(),
        })
    }

    /// Resource path under this client's project.
    fn project_resource(&self, suffix: &str) -> String {
        format!("/projects/{}{}", self.project, suffix)
    }

    /// Sends a signed request and returns the raw response.
    async fn send(
        &self,
        method: Method,
        resource: &str,
        params: &[(&str, String)],
        body: Option<String>,
    ) -> Result<Response> {
        let date = chrono::Utc::now().format(HTTP_DATE_FORMAT).to_string();

        let mut headers: Vec<(&str, &str)> = vec![("Date", date.as_str())];
        if body.is_some() {
            headers.push(("Content-Type", "application/xml"));
        }

        let authorization = self
            .signer
            .authorization(method.as_str(), &headers, resource, params);

        let url = request_url(&self.endpoint, resource, params);
        debug!("{} {}", method, url);

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", authorization);
        for (name, value) in &headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        request.send().await.map_err(map_request_error)
    }

    /// Sends a GET and returns the body of a successful response.
    async fn get_text(&self, resource: &str, params: &[(&str, String)]) -> Result<String> {
        let response = self.send(Method::GET, resource, params, None).await?;
        read_success(response).await
    }

    async fn instance_state(&self, id: &str) -> Result<InstanceState> {
        let resource = self.project_resource(&format!("/instances/{id}"));
        let body = self
            .get_text(&resource, &[("taskstatus", String::new())])
            .await?;
        xml::parse_instance_state(&body)
    }

    async fn task_result(&self, id: &str) -> Result<String> {
        let resource = self.project_resource(&format!("/instances/{id}"));
        let body = self.get_text(&resource, &[("result", String::new())]).await?;
        xml::parse_task_result(&body)
    }

    async fn poll_until_terminated(&self, instance: &SqlInstance) -> Result<()> {
        loop {
            match self.instance_state(&instance.id).await? {
                InstanceState::Running => tokio::time::sleep(self.poll_interval).await,
                InstanceState::Succeeded => return Ok(()),
                InstanceState::Failed => {
                    let detail = self.task_result(&instance.id).await?;
                    let detail = detail.trim();
                    return Err(EngineError::query(if detail.is_empty() {
                        format!("Instance {} failed", instance.id)
                    } else {
                        detail.to_string()
                    }));
                }
            }
        }
    }
}

#[async_trait]
impl OdpsClient for RestOdpsClient {
    fn project(&self) -> &str {
        &self.project
    }

    async fn exist_project(&self, name: &str) -> Result<bool> {
        let resource = format!("/projects/{name}");
        let response = self.send(Method::GET, &resource, &[], None).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        read_success(response).await?;
        Ok(true)
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let resource = self.project_resource("/tables");
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut params = vec![
                ("expectmarker", "true".to_string()),
                ("maxitems", TABLE_PAGE_SIZE.to_string()),
            ];
            if let Some(m) = &marker {
                params.push(("marker", m.clone()));
            }

            let body = self.get_text(&resource, &params).await?;
            let page = xml::parse_table_page(&body)?;
            let page_len = page.names.len();
            names.extend(page.names);

            match page.marker {
                Some(next) if page_len > 0 => marker = Some(next),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn get_table(&self, name: &str) -> Result<TableSchema> {
        let resource = self.project_resource(&format!("/tables/{name}"));
        let body = self.get_text(&resource, &[]).await?;
        xml::parse_table(&body)
    }

    async fn execute_sql(&self, sql: &str) -> Result<SqlInstance> {
        let resource = self.project_resource("/instances");
        let response = self
            .send(Method::POST, &resource, &[], Some(xml::sql_job_body(sql)))
            .await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        read_success(response).await?;

        let location = location
            .ok_or_else(|| EngineError::internal("Instance creation returned no Location"))?;
        let id = instance_id_from_location(&location)
            .ok_or_else(|| EngineError::internal(format!("Malformed instance Location: {location}")))?;

        debug!("Submitted instance {} in project {}", id, self.project);

        Ok(SqlInstance {
            id,
            sql: sql.to_string(),
        })
    }

    async fn wait_for_completion(&self, instance: &SqlInstance) -> Result<()> {
        tokio::time::timeout(self.job_timeout, self.poll_until_terminated(instance))
            .await
            .map_err(|_| {
                warn!("Instance {} exceeded {:?}", instance.id, self.job_timeout);
                EngineError::query(format!(
                    "Instance {} did not finish within {} seconds",
                    instance.id,
                    self.job_timeout.as_secs()
                ))
            })?
    }

    async fn read_result(&self, instance: &SqlInstance) -> Result<QueryOutput> {
        self.wait_for_completion(instance).await?;
        let text = self.task_result(&instance.id).await?;
        xml::parse_csv(&text)
    }
}

/// Returns the body of a 2xx response, or maps the error body.
async fn read_success(response: Response) -> Result<String> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| EngineError::connection(format!("Failed to read response: {}", e)))?;

    if status.is_success() {
        return Ok(body);
    }

    let message = xml::error_message(&body);
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            EngineError::connection(format!("ODPS rejected credentials ({status}): {message}"))
        }
        _ => EngineError::query(format!("ODPS API error ({status}): {message}")),
    })
}

fn map_request_error(e: reqwest::Error) -> EngineError {
    if e.is_timeout() {
        EngineError::connection("Request to ODPS timed out")
    } else if e.is_connect() {
        EngineError::connection(format!("Failed to connect to ODPS endpoint: {}", e))
    } else {
        EngineError::connection(format!("Request failed: {}", e))
    }
}

/// Joins endpoint, resource and query. Empty-valued params are sent as a
/// bare key, matching how they are signed.
fn request_url(endpoint: &str, resource: &str, params: &[(&str, String)]) -> String {
    let mut url = format!("{endpoint}{resource}");
    if params.is_empty() {
        return url;
    }

    let query = params
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.to_string()
            } else {
                let value: String = form_urlencoded::byte_serialize(value.as_bytes()).collect();
                format!("{key}={value}")
            }
        })
        .collect::<Vec<_>>()
        .join("&");

    url.push('?');
    url.push_str(&query);
    url
}

/// Extracts the instance id, the last path segment of the Location header.
fn instance_id_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(String::from)
}

/// Builds REST clients from an instance config.
#[derive(Debug, Clone)]
pub struct RestConnector {
    instance: InstanceConfig,
    settings: EngineSettings,
}

impl RestConnector {
    pub fn new(instance: InstanceConfig, settings: EngineSettings) -> Self {
        Self { instance, settings }
    }
}

impl Connector for RestConnector {
    fn connect(&self, project: &str) -> Result<Arc<dyn OdpsClient>> {
        let client = RestOdpsClient::new(&self.instance, project, &self.settings)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance() -> InstanceConfig {
        InstanceConfig {
            endpoint: Some("http://service.cn-hangzhou.maxcompute.aliyun.com/api/".to_string()),
            access_id: Some("id".to_string()),
            access_key: Some("secret".to_string()),
            project: Some("analytics".to_string()),
        }
    }

    #[test]
    fn test_instance_id_from_location() {
        assert_eq!(
            instance_id_from_location(
                "http://service.odps.aliyun.com/api/projects/p/instances/20261019080000123gabc"
            ),
            Some("20261019080000123gabc".to_string())
        );
        assert_eq!(
            instance_id_from_location("/projects/p/instances/abc/"),
            Some("abc".to_string())
        );
        assert_eq!(instance_id_from_location(""), None);
    }

    #[test]
    fn test_request_url() {
        let endpoint = "http://service.odps.aliyun.com/api";
        assert_eq!(
            request_url(endpoint, "/projects/p", &[]),
            "http://service.odps.aliyun.com/api/projects/p"
        );
        assert_eq!(
            request_url(
                endpoint,
                "/projects/p/tables",
                &[
                    ("expectmarker", "true".to_string()),
                    ("marker", "a b/c".to_string()),
                ]
            ),
            "http://service.odps.aliyun.com/api/projects/p/tables?expectmarker=true&marker=a+b%2Fc"
        );
        assert_eq!(
            request_url(endpoint, "/projects/p/instances/1", &[("taskstatus", String::new())]),
            "http://service.odps.aliyun.com/api/projects/p/instances/1?taskstatus"
        );
    }

    #[test]
    fn test_new_trims_endpoint_and_scopes_project() {
        let client =
            RestOdpsClient::new(&instance(), "warehouse", &EngineSettings::default()).unwrap();
        assert_eq!(
            client.endpoint,
            "http://service.cn-hangzhou.maxcompute.aliyun.com/api"
        );
        assert_eq!(client.project(), "warehouse");
        assert_eq!(client.project_resource("/tables"), "/projects/warehouse/tables");
    }

    #[test]
    fn test_new_requires_credentials() {
        let mut config = instance();
        config.access_key = None;
        let err = RestOdpsClient::new(&config, "p", &EngineSettings::default()).unwrap_err();
        assert_eq!(err.category(), "Configuration Error");
    }

    #[test]
    fn test_connector_builds_client_for_project() {
        let connector = RestConnector::new(instance(), EngineSettings::default());
        let client = connector.connect("other").unwrap();
        assert_eq!(client.project(), "other");
    }
}
