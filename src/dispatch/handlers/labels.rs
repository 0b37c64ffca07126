use super::{HandlerContext, bound};
use crate::error::PlatformError;
use crate::operation::{LabelChange, ResourceRef};
use crate::platform::PlatformRequest;

pub(super) async fn add_labels(
    ctx: &HandlerContext<'_>,
    change: &LabelChange,
) -> Result<ResourceRef, PlatformError> {
    let issue = bound(&change.issue, "issue_number")?;
    ctx.send(PlatformRequest::AddLabels {
        repository: issue.repository.clone(),
        number: issue.number,
        labels: change.labels.clone(),
    })
    .await?;
    Ok(issue.clone())
}

/// One request per label; the platform has no bulk removal.
pub(super) async fn remove_labels(
    ctx: &HandlerContext<'_>,
    change: &LabelChange,
) -> Result<ResourceRef, PlatformError> {
    let issue = bound(&change.issue, "issue_number")?;
    for label in &change.labels {
        ctx.send(PlatformRequest::RemoveLabel {
            repository: issue.repository.clone(),
            number: issue.number,
            label: label.clone(),
        })
        .await?;
    }
    Ok(issue.clone())
}
