//! Per-type handlers. Each one turns a resolved payload into one or more
//! platform requests; every request is retried on its own.

mod comments;
mod issues;
mod labels;
mod pull_requests;
mod reports;
mod workflows;

use super::retry::{RetryPolicy, execute_with_retry};
use crate::authorize::RepoSlug;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::error::PlatformError;
use crate::operation::{IssueRef, OperationPayload, ResourceRef};
use crate::platform::{PlatformClient, PlatformRequest, PlatformResponse};

/// Everything a handler needs for one operation.
pub struct HandlerContext<'a> {
    pub client: &'a dyn PlatformClient,
    pub retry: &'a RetryPolicy,
    pub sink: &'a dyn DiagnosticSink,
    pub index: usize,
    pub repository: &'a RepoSlug,
}

impl HandlerContext<'_> {
    pub async fn send(&self, request: PlatformRequest) -> Result<PlatformResponse, PlatformError> {
        let request = &request;
        execute_with_retry(
            self.retry,
            || self.client.send(request),
            |attempt, delay, _| {
                self.sink.record(&DiagnosticEvent::RequestRetried {
                    index: self.index,
                    request: request.name(),
                    attempt,
                    delay,
                });
            },
        )
        .await
    }
}

/// Execute one operation. Returns the resource it created or acted on.
pub async fn execute(
    ctx: &HandlerContext<'_>,
    payload: &OperationPayload,
) -> Result<Option<ResourceRef>, PlatformError> {
    match payload {
        OperationPayload::CreateIssue(p) => issues::create_issue(ctx, p).await.map(Some),
        OperationPayload::UpdateIssue(p) => issues::update_issue(ctx, p).await.map(Some),
        OperationPayload::CloseIssue(p) => issues::close_issue(ctx, p).await.map(Some),
        OperationPayload::LinkSubIssue(p) => issues::link_sub_issue(ctx, p).await.map(Some),
        OperationPayload::AssignToAgent(p) => issues::assign_to_agent(ctx, p).await.map(Some),
        OperationPayload::AddComment(p) => comments::add_comment(ctx, p).await.map(Some),
        OperationPayload::AddLabels(p) => labels::add_labels(ctx, p).await.map(Some),
        OperationPayload::RemoveLabels(p) => labels::remove_labels(ctx, p).await.map(Some),
        OperationPayload::CreatePullRequest(p) => {
            pull_requests::create_pull_request(ctx, p).await.map(Some)
        }
        OperationPayload::DispatchWorkflow(p) => workflows::dispatch_workflow(ctx, p).await,
        OperationPayload::Noop(p) => {
            reports::noop(p);
            Ok(None)
        }
        OperationPayload::MissingTool(p) => {
            reports::missing_tool(p);
            Ok(None)
        }
    }
}

/// A field reference that resolution should already have bound.
fn bound<'r>(reference: &'r IssueRef, field: &str) -> Result<&'r ResourceRef, PlatformError> {
    reference
        .resolved()
        .ok_or_else(|| PlatformError::permanent(format!("{field} {reference} is not resolved")))
}

fn created(response: PlatformResponse, request: &str) -> Result<ResourceRef, PlatformError> {
    response
        .resource
        .ok_or_else(|| PlatformError::permanent(format!("{request} returned no resource")))
}
