use super::{HandlerContext, bound, created};
use crate::error::PlatformError;
use crate::operation::{
    AssignToAgent, CloseIssue, CreateIssue, IssueState, LinkSubIssue, ResourceRef, UpdateIssue,
};
use crate::platform::PlatformRequest;

pub(super) async fn create_issue(
    ctx: &HandlerContext<'_>,
    issue: &CreateIssue,
) -> Result<ResourceRef, PlatformError> {
    let response = ctx
        .send(PlatformRequest::CreateIssue {
            repository: ctx.repository.clone(),
            title: issue.title.clone(),
            body: issue.body.render(ctx.repository),
            labels: issue.labels.clone(),
            assignees: issue.assignees.clone(),
        })
        .await?;
    let resource = created(response, "create_issue")?;
    tracing::info!(index = ctx.index, issue = %resource, "Issue created");

    if let Some(parent) = &issue.parent {
        let parent = bound(parent, "parent")?;
        // The issue exists either way; a failed link is reported, not fatal.
        if let Err(e) = attach_sub_issue(ctx, parent, &resource).await {
            tracing::warn!(
                index = ctx.index,
                parent = %parent,
                issue = %resource,
                "Failed to link new issue to parent: {e}"
            );
        }
    }
    Ok(resource)
}

pub(super) async fn update_issue(
    ctx: &HandlerContext<'_>,
    update: &UpdateIssue,
) -> Result<ResourceRef, PlatformError> {
    let issue = bound(&update.issue, "issue_number")?;
    ctx.send(PlatformRequest::UpdateIssue {
        repository: issue.repository.clone(),
        number: issue.number,
        title: update.title.clone(),
        body: update.body.as_ref().map(|b| b.render(&issue.repository)),
        state: update.state,
        state_reason: None,
    })
    .await?;
    Ok(issue.clone())
}

pub(super) async fn close_issue(
    ctx: &HandlerContext<'_>,
    close: &CloseIssue,
) -> Result<ResourceRef, PlatformError> {
    let issue = bound(&close.issue, "issue_number")?;
    if let Some(comment) = close.comment.as_ref().filter(|c| !c.is_empty()) {
        ctx.send(PlatformRequest::CreateComment {
            repository: issue.repository.clone(),
            number: issue.number,
            body: comment.render(&issue.repository),
        })
        .await?;
    }
    ctx.send(PlatformRequest::UpdateIssue {
        repository: issue.repository.clone(),
        number: issue.number,
        title: None,
        body: None,
        state: Some(IssueState::Closed),
        state_reason: Some(close.state_reason),
    })
    .await?;
    Ok(issue.clone())
}

pub(super) async fn link_sub_issue(
    ctx: &HandlerContext<'_>,
    link: &LinkSubIssue,
) -> Result<ResourceRef, PlatformError> {
    let parent = bound(&link.parent, "parent_issue_number")?;
    let child = bound(&link.child, "sub_issue_number")?;
    attach_sub_issue(ctx, parent, child).await?;
    tracing::info!(index = ctx.index, parent = %parent, child = %child, "Sub-issue linked");
    Ok(child.clone())
}

pub(super) async fn assign_to_agent(
    ctx: &HandlerContext<'_>,
    assign: &AssignToAgent,
) -> Result<ResourceRef, PlatformError> {
    let issue = bound(&assign.issue, "issue_number")?;
    ctx.send(PlatformRequest::AddAssignees {
        repository: issue.repository.clone(),
        number: issue.number,
        assignees: vec![assign.agent.clone()],
    })
    .await?;
    Ok(issue.clone())
}

/// The sub-issue API wants the child's internal id, not its number.
async fn attach_sub_issue(
    ctx: &HandlerContext<'_>,
    parent: &ResourceRef,
    child: &ResourceRef,
) -> Result<(), PlatformError> {
    let child_id = match child.id {
        Some(id) => id,
        None => {
            let response = ctx
                .send(PlatformRequest::GetIssue {
                    repository: child.repository.clone(),
                    number: child.number,
                })
                .await?;
            created(response, "get_issue")?
                .id
                .ok_or_else(|| PlatformError::permanent(format!("{child} has no internal id")))?
        }
    };
    ctx.send(PlatformRequest::AddSubIssue {
        repository: parent.repository.clone(),
        parent: parent.number,
        sub_issue_id: child_id,
    })
    .await?;
    Ok(())
}
