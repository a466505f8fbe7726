//! `reqwest`-backed implementation of [`ActionsApi`].

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::{
    ActionsApi, DeleteError, GitHubError, GitHubResult, RepoRef,
    types::{ApiErrorBody, RateLimitResponse, WorkflowRunsPage, WorkflowsPage},
};
use crate::{
    config::GitHubConfig,
    models::{RunId, WorkflowDefinition, WorkflowRun},
    retention::QuotaStatus,
};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// Client for the GitHub Actions endpoints of one repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: Url,
    repo: RepoRef,
    token: String,
    per_page: u32,
}

impl GitHubClient {
    /// Create a client, resolving the token from config or `GH_TOKEN`.
    pub fn from_config(config: &GitHubConfig, repo: RepoRef) -> GitHubResult<Self> {
        let token = config.resolve_token().ok_or(GitHubError::MissingToken)?;
        Self::new(config, repo, token)
    }

    pub fn new(config: &GitHubConfig, repo: RepoRef, token: String) -> GitHubResult<Self> {
        // `Url::join` replaces the last path segment unless the base ends in '/'.
        let mut base = config.api_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url,
            repo,
            token,
            per_page: config.per_page,
        })
    }

    fn url(&self, path: &str) -> GitHubResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn repo_path(&self, suffix: &str) -> String {
        format!("repos/{}/{}{}", self.repo.owner, self.repo.name, suffix)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Confirm the repository exists and the token can see it.
    pub async fn verify_repository(&self) -> GitHubResult<()> {
        let endpoint = self.repo_path("");
        let response = self
            .request(Method::GET, self.url(&endpoint)?)
            .send()
            .await?;
        check_status(response, &endpoint, Some(&self.repo)).await?;
        tracing::debug!(repo = %self.repo, "Repository verified");
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> GitHubResult<T> {
        let response = self
            .request(Method::GET, self.url(endpoint)?)
            .query(query)
            .send()
            .await?;
        let scope = endpoint.starts_with("repos/").then_some(&self.repo);
        let response = check_status(response, endpoint, scope).await?;
        response.json::<T>().await.map_err(|e| GitHubError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch every page of a listing endpoint.
    ///
    /// Stops at the first page shorter than `per_page`.
    async fn paginate<P, T>(
        &self,
        endpoint: &str,
        split: impl Fn(P) -> (u64, Vec<T>),
    ) -> GitHubResult<Vec<T>>
    where
        P: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let query = [
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ];
            let (total_count, batch) = split(self.get_json::<P>(endpoint, &query).await?);
            let fetched = batch.len();
            items.extend(batch);

            tracing::debug!(
                endpoint = endpoint,
                page = page,
                fetched = fetched,
                collected = items.len(),
                total_count = total_count,
                "Fetched page"
            );

            if fetched < self.per_page as usize {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}

#[async_trait]
impl ActionsApi for GitHubClient {
    async fn list_workflows(&self) -> GitHubResult<Vec<WorkflowDefinition>> {
        let endpoint = self.repo_path("/actions/workflows");
        let workflows = self
            .paginate(&endpoint, |page: WorkflowsPage| {
                (page.total_count, page.workflows)
            })
            .await?;
        Ok(workflows.into_iter().map(Into::into).collect())
    }

    async fn list_runs(&self) -> GitHubResult<Vec<WorkflowRun>> {
        let endpoint = self.repo_path("/actions/runs");
        let runs = self
            .paginate(&endpoint, |page: WorkflowRunsPage| {
                (page.total_count, page.workflow_runs)
            })
            .await?;
        Ok(runs.into_iter().map(Into::into).collect())
    }

    async fn delete_run(&self, run_id: RunId) -> Result<(), DeleteError> {
        let other = |message: String| DeleteError::Other { run_id, message };

        let endpoint = self.repo_path(&format!("/actions/runs/{run_id}"));
        let url = self.url(&endpoint).map_err(|e| other(e.to_string()))?;
        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(|e| other(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status {
            StatusCode::NOT_FOUND => Err(DeleteError::NotFound(run_id)),
            StatusCode::TOO_MANY_REQUESTS => Err(DeleteError::RateLimited(run_id)),
            StatusCode::FORBIDDEN if is_rate_limited(&response) => {
                Err(DeleteError::RateLimited(run_id))
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                Err(DeleteError::PermissionDenied(run_id))
            }
            _ => {
                let body = error_message(response).await;
                Err(other(format!("status {}: {}", status.as_u16(), body)))
            }
        }
    }

    async fn rate_limit(&self) -> GitHubResult<QuotaStatus> {
        let endpoint = "rate_limit";
        let response: RateLimitResponse = self.get_json(endpoint, &[]).await?;
        response
            .resources
            .core
            .into_status()
            .ok_or_else(|| GitHubError::Decode {
                endpoint: endpoint.to_string(),
                message: "invalid reset timestamp".to_string(),
            })
    }
}

fn is_rate_limited(response: &Response) -> bool {
    response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
}

fn rate_limit_reset(response: &Response) -> String {
    response
        .headers()
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn error_message(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&text)
        .map(|body| body.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or(text)
}

/// Map non-success statuses on listing/probe endpoints to fatal errors.
///
/// A 404 on a repository-scoped endpoint means the repository is missing or
/// invisible to the token.
async fn check_status(
    response: Response,
    endpoint: &str,
    repo: Option<&RepoRef>,
) -> GitHubResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && is_rate_limited(&response))
    {
        return Err(GitHubError::RateLimited {
            reset_at: rate_limit_reset(&response),
        });
    }

    let message = error_message(response).await;
    match (status, repo) {
        (StatusCode::UNAUTHORIZED, _) => Err(GitHubError::Authentication(message)),
        (StatusCode::NOT_FOUND, Some(repo)) => Err(GitHubError::RepositoryNotFound(repo.to_string())),
        _ => Err(GitHubError::UnexpectedStatus {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            message,
        }),
    }
}
