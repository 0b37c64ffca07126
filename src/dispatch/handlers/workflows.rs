use super::HandlerContext;
use crate::error::PlatformError;
use crate::operation::{DispatchWorkflow, ResourceRef};
use crate::platform::PlatformRequest;

pub(super) async fn dispatch_workflow(
    ctx: &HandlerContext<'_>,
    dispatch: &DispatchWorkflow,
) -> Result<Option<ResourceRef>, PlatformError> {
    ctx.send(PlatformRequest::DispatchWorkflow {
        repository: ctx.repository.clone(),
        workflow: dispatch.workflow.clone(),
        git_ref: dispatch.git_ref.clone(),
        inputs: dispatch.inputs.clone(),
    })
    .await?;
    tracing::info!(
        index = ctx.index,
        workflow = dispatch.workflow.as_str(),
        git_ref = dispatch.git_ref.as_str(),
        "Workflow dispatched"
    );
    Ok(None)
}
