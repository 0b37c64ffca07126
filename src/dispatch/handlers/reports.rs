use crate::operation::{MissingTool, Noop};

pub(super) fn noop(noop: &Noop) {
    tracing::info!(message = noop.message.as_str(), "Agent reported no action");
}

pub(super) fn missing_tool(report: &MissingTool) {
    tracing::warn!(
        tool = report.tool.as_str(),
        reason = report.reason.as_str(),
        alternatives = report.alternatives.as_deref().unwrap_or("-"),
        "Agent reported a missing tool"
    );
}
