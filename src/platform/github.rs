//! GitHub REST client.

use super::{PlatformClient, PlatformFuture, PlatformRequest, PlatformResponse};
use crate::authorize::RepoSlug;
use crate::error::{PlatformError, echo_value};
use crate::gatekeeper::{HistoryFuture, RunRecord, TriggerHistory};
use crate::operation::ResourceRef;
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, Response};
use serde_json::{Value, json};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: url::Url,
}

impl GitHubClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("safe-outputs/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));
        if let Some(t) = token.filter(|t| !t.is_empty())
            && let Ok(mut val) = HeaderValue::from_str(&format!("Bearer {t}"))
        {
            val.set_sensitive(true);
            headers.insert(AUTHORIZATION, val);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = url::Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid GitHub API URL '{base_url}'"))?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, repository: &RepoSlug, tail: &[&str]) -> Result<url::Url, PlatformError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PlatformError::permanent("GitHub API URL cannot be a base"))?
            .pop_if_empty()
            .extend(["repos", repository.owner(), repository.name()])
            .extend(tail);
        Ok(url)
    }

    fn route(&self, request: &PlatformRequest) -> Result<(Method, url::Url, Option<Value>), PlatformError> {
        let route = match request {
            PlatformRequest::CreateIssue {
                repository,
                title,
                body,
                labels,
                assignees,
            } => (
                Method::POST,
                self.endpoint(repository, &["issues"])?,
                Some(json!({ "title": title, "body": body, "labels": labels, "assignees": assignees })),
            ),
            PlatformRequest::CreateComment {
                repository,
                number,
                body,
            } => (
                Method::POST,
                self.endpoint(repository, &["issues", &number.to_string(), "comments"])?,
                Some(json!({ "body": body })),
            ),
            PlatformRequest::CreatePullRequest {
                repository,
                title,
                body,
                head,
                base,
                draft,
            } => (
                Method::POST,
                self.endpoint(repository, &["pulls"])?,
                Some(json!({ "title": title, "body": body, "head": head, "base": base, "draft": draft })),
            ),
            PlatformRequest::UpdateIssue {
                repository,
                number,
                title,
                body,
                state,
                state_reason,
            } => {
                let mut patch = serde_json::Map::new();
                if let Some(title) = title {
                    patch.insert("title".into(), json!(title));
                }
                if let Some(body) = body {
                    patch.insert("body".into(), json!(body));
                }
                if let Some(state) = state {
                    patch.insert("state".into(), json!(state));
                }
                if let Some(reason) = state_reason {
                    patch.insert("state_reason".into(), json!(reason));
                }
                (
                    Method::PATCH,
                    self.endpoint(repository, &["issues", &number.to_string()])?,
                    Some(Value::Object(patch)),
                )
            }
            PlatformRequest::AddLabels {
                repository,
                number,
                labels,
            } => (
                Method::POST,
                self.endpoint(repository, &["issues", &number.to_string(), "labels"])?,
                Some(json!({ "labels": labels })),
            ),
            PlatformRequest::RemoveLabel {
                repository,
                number,
                label,
            } => (
                Method::DELETE,
                self.endpoint(repository, &["issues", &number.to_string(), "labels", label])?,
                None,
            ),
            PlatformRequest::GetIssue { repository, number } => (
                Method::GET,
                self.endpoint(repository, &["issues", &number.to_string()])?,
                None,
            ),
            PlatformRequest::AddSubIssue {
                repository,
                parent,
                sub_issue_id,
            } => (
                Method::POST,
                self.endpoint(repository, &["issues", &parent.to_string(), "sub_issues"])?,
                Some(json!({ "sub_issue_id": sub_issue_id })),
            ),
            PlatformRequest::AddAssignees {
                repository,
                number,
                assignees,
            } => (
                Method::POST,
                self.endpoint(repository, &["issues", &number.to_string(), "assignees"])?,
                Some(json!({ "assignees": assignees })),
            ),
            PlatformRequest::DispatchWorkflow {
                repository,
                workflow,
                git_ref,
                inputs,
            } => (
                Method::POST,
                self.endpoint(
                    repository,
                    &["actions", "workflows", &format!("{workflow}.yml"), "dispatches"],
                )?,
                Some(json!({ "ref": git_ref, "inputs": inputs })),
            ),
        };
        Ok(route)
    }

    async fn execute(&self, request: &PlatformRequest) -> Result<PlatformResponse, PlatformError> {
        let (method, url, body) = self.route(request)?;
        tracing::debug!(request = request.name(), %method, path = url.path(), "GitHub request");

        let mut builder = self.client.request(method, url);
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        let resp = builder.send().await.map_err(classify_transport_error)?;
        let status = resp.status();

        if status.is_success() {
            return parse_success(request, resp).await;
        }
        // Removing a label that is not present is already the desired state.
        if status.as_u16() == 404 && matches!(request, PlatformRequest::RemoveLabel { .. }) {
            return Ok(PlatformResponse::empty());
        }
        Err(error_from_response(resp).await)
    }
}

impl PlatformClient for GitHubClient {
    fn send<'a>(&'a self, request: &'a PlatformRequest) -> PlatformFuture<'a> {
        Box::pin(self.execute(request))
    }

    fn name(&self) -> &str {
        "github"
    }
}

impl TriggerHistory for GitHubClient {
    fn recent_runs<'a>(
        &'a self,
        repository: &'a RepoSlug,
        actor: &'a str,
        since: DateTime<Utc>,
    ) -> HistoryFuture<'a> {
        Box::pin(async move {
            let mut url = self.endpoint(repository, &["actions", "runs"])?;
            url.query_pairs_mut()
                .append_pair("actor", actor)
                .append_pair(
                    "created",
                    &format!(">={}", since.to_rfc3339_opts(SecondsFormat::Secs, true)),
                )
                .append_pair("per_page", "100");

            let resp = self.client.get(url).send().await?;
            if !resp.status().is_success() {
                anyhow::bail!("{}", error_from_response(resp).await);
            }
            let body: Value = resp.json().await?;
            let runs = body
                .get("workflow_runs")
                .and_then(Value::as_array)
                .map(|runs| runs.iter().filter_map(parse_run).collect())
                .unwrap_or_default();
            Ok(runs)
        })
    }
}

fn parse_run(run: &Value) -> Option<RunRecord> {
    let timestamp = |key: &str| {
        run.get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    };
    let started_at = timestamp("run_started_at").or_else(|| timestamp("created_at"))?;
    let completed = run.get("status").and_then(Value::as_str) == Some("completed");
    let duration = if completed {
        timestamp("updated_at")
            .and_then(|end| (end - started_at).to_std().ok())
    } else {
        None
    };
    Some(RunRecord {
        started_at,
        duration,
        cancelled: run.get("conclusion").and_then(Value::as_str) == Some("cancelled"),
    })
}

fn classify_transport_error(err: reqwest::Error) -> PlatformError {
    if err.is_builder() {
        PlatformError::permanent(format!("invalid request: {err}"))
    } else {
        PlatformError::transient(format!("request failed: {err}"))
    }
}

async fn parse_success(
    request: &PlatformRequest,
    resp: Response,
) -> Result<PlatformResponse, PlatformError> {
    let creates_resource = matches!(
        request,
        PlatformRequest::CreateIssue { .. }
            | PlatformRequest::CreatePullRequest { .. }
            | PlatformRequest::CreateComment { .. }
            | PlatformRequest::GetIssue { .. }
    );
    if !creates_resource {
        return Ok(PlatformResponse::empty());
    }

    let body: Value = resp
        .json()
        .await
        .map_err(|e| PlatformError::permanent(format!("unreadable GitHub response: {e}")))?;
    let id = body.get("id").and_then(Value::as_u64);
    let url = body.get("html_url").and_then(Value::as_str).map(String::from);

    let mut resource = match request {
        PlatformRequest::CreateComment {
            repository, number, ..
        } => ResourceRef::new(repository.clone(), *number),
        _ => {
            let number = body
                .get("number")
                .and_then(Value::as_u64)
                .ok_or_else(|| PlatformError::permanent("GitHub response has no number"))?;
            ResourceRef::new(request.repository().clone(), number)
        }
    };
    resource.id = id;
    resource.url = url;
    Ok(PlatformResponse::resource(resource))
}

async fn error_from_response(resp: Response) -> PlatformError {
    let status = resp.status().as_u16();
    let headers = resp.headers();
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    let retry_after = headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .or_else(|| {
            let reset = headers
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())?
                .trim()
                .parse::<i64>()
                .ok()?;
            let wait = reset - chrono::Utc::now().timestamp();
            u64::try_from(wait).ok().map(Duration::from_secs)
        });

    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
        .unwrap_or(text);

    PlatformError::from_status(
        status,
        format!("GitHub returned {status}: {}", echo_value(&message)),
        exhausted,
        retry_after,
    )
}
