use super::{HandlerContext, created};
use crate::error::PlatformError;
use crate::operation::{CreatePullRequest, ResourceRef};
use crate::platform::PlatformRequest;

pub(super) async fn create_pull_request(
    ctx: &HandlerContext<'_>,
    pr: &CreatePullRequest,
) -> Result<ResourceRef, PlatformError> {
    let response = ctx
        .send(PlatformRequest::CreatePullRequest {
            repository: ctx.repository.clone(),
            title: pr.title.clone(),
            body: pr.body.render(ctx.repository),
            head: pr.head.clone(),
            base: pr.base.clone(),
            draft: pr.draft,
        })
        .await?;
    let resource = created(response, "create_pull_request")?;
    tracing::info!(index = ctx.index, pull_request = %resource, "Pull request created");

    if !pr.labels.is_empty() {
        ctx.send(PlatformRequest::AddLabels {
            repository: resource.repository.clone(),
            number: resource.number,
            labels: pr.labels.clone(),
        })
        .await?;
    }
    Ok(resource)
}
