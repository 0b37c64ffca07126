use super::{HandlerContext, bound, created};
use crate::error::PlatformError;
use crate::operation::{AddComment, ResourceRef};
use crate::platform::PlatformRequest;

pub(super) async fn add_comment(
    ctx: &HandlerContext<'_>,
    comment: &AddComment,
) -> Result<ResourceRef, PlatformError> {
    let issue = bound(&comment.issue, "issue_number")?;
    let response = ctx
        .send(PlatformRequest::CreateComment {
            repository: issue.repository.clone(),
            number: issue.number,
            body: comment.body.render(&issue.repository),
        })
        .await?;
    let resource = created(response, "add_comment")?;
    tracing::info!(index = ctx.index, issue = %issue, "Comment added");
    Ok(resource)
}
