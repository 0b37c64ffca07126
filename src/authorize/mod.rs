//! Repository and link-domain authorization.
//!
//! Repository targets resolve against the per-type allowlist when the type
//! defines one, else the global allowlist, else cross-repository targets are
//! denied. The workflow's own repository is always reachable.

mod domain;
mod repo;

pub use domain::{DomainAllowlist, LinkVerdict, classify_url};
pub use repo::{RepoSlug, RepoSlugError};

use crate::config::SafeOutputsConfig;
use crate::error::{ConfigError, ErrorCode, OperationError, echo_value};
use crate::operation::{Operation, OperationKind, OperationStatus};

/// Where an allowlist decision came from, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AllowlistSource {
    OwnRepository,
    PerType,
    Global,
    None,
}

pub struct RepositoryAuthorizer<'a> {
    own: RepoSlug,
    config: &'a SafeOutputsConfig,
}

impl<'a> RepositoryAuthorizer<'a> {
    pub fn new(config: &'a SafeOutputsConfig) -> Result<Self, ConfigError> {
        let own = RepoSlug::parse(&config.repository).map_err(|e| {
            ConfigError::Validation(format!("repository '{}': {e}", config.repository))
        })?;
        Ok(Self { own, config })
    }

    pub fn own_repository(&self) -> &RepoSlug {
        &self.own
    }

    fn allowlist_for(&self, kind: OperationKind) -> (AllowlistSource, Option<&'a [String]>) {
        if let Some(list) = self
            .config
            .operations
            .common(kind)
            .and_then(|c| c.allowed_repos.as_deref())
        {
            return (AllowlistSource::PerType, Some(list));
        }
        if let Some(list) = self.config.allowed_repos.as_deref() {
            return (AllowlistSource::Global, Some(list));
        }
        (AllowlistSource::None, None)
    }

    /// Resolve the repository an operation of `kind` will act on.
    pub fn resolve_target(
        &self,
        kind: OperationKind,
        requested: Option<&str>,
    ) -> Result<RepoSlug, OperationError> {
        let Some(raw) = requested else {
            return Ok(self.own.clone());
        };
        let slug = RepoSlug::parse(raw).map_err(|e| {
            OperationError::new(
                ErrorCode::MalformedRepository,
                format!("repository '{}' is malformed: {e}", echo_value(raw)),
            )
            .field("repo")
        })?;
        if slug == self.own {
            return Ok(slug);
        }

        let (source, list) = self.allowlist_for(kind);
        let permitted = list.is_some_and(|entries| entries.iter().any(|e| *e == slug.to_string()));
        if permitted {
            tracing::debug!(%kind, repository = %slug, %source, "cross-repository target allowed");
            return Ok(slug);
        }

        let message = match source {
            AllowlistSource::None => format!(
                "cross-repository target '{slug}' denied: no repository allowlist is configured"
            ),
            _ => format!("repository '{slug}' is not in the {source} allowlist for {kind}"),
        };
        Err(OperationError::new(ErrorCode::UnauthorizedRepository, message).field("repo"))
    }

    /// Authorize one operation in place: bind its target repository and
    /// enforce the link-redaction policy.
    pub fn authorize(&self, op: &mut Operation) {
        if !op.is_live() {
            return;
        }
        let Some(kind) = op.kind else {
            return;
        };

        match self.resolve_target(kind, op.requested_repository.as_deref()) {
            Ok(target) => op.target_repository = Some(target),
            Err(err) => {
                tracing::warn!(index = op.index, %kind, code = %err.code, "repository rejected");
                op.reject(err);
                return;
            }
        }

        if self.config.sanitize.reject_on_link_redaction
            && let Some(redacted) = op.redactions.iter().find(|r| r.redaction.is_link())
        {
            let err = OperationError::new(
                ErrorCode::UnauthorizedDomain,
                format!("a link in '{}' was redacted: {}", redacted.field, redacted.redaction.reason),
            )
            .field(redacted.field.clone());
            tracing::warn!(index = op.index, %kind, "link redaction rejected operation");
            op.reject(err);
            return;
        }

        op.advance(OperationStatus::Authorized);
    }

    /// Reject an operation whose resolved issue references point outside
    /// the repositories its type may write to. Literal numbers are bound to
    /// the approved target; placeholders resolve to wherever their creator
    /// or an earlier job put them.
    pub fn authorize_references(&self, op: &mut Operation) {
        if !op.is_live() {
            return;
        }
        let (Some(kind), Some(target), Some(payload)) = (
            op.kind,
            op.target_repository.as_ref(),
            op.payload.as_mut(),
        ) else {
            return;
        };

        let denied = payload.issue_refs_mut().into_iter().find_map(|(field, reference)| {
            let resolved = reference.resolved()?;
            if resolved.repository == *target {
                return None;
            }
            self.resolve_target(kind, Some(&resolved.repository.to_string()))
                .err()
                .map(|err| {
                    OperationError::new(
                        err.code,
                        format!("{field} {resolved}: {}", err.message),
                    )
                    .field(field)
                })
        });

        if let Some(err) = denied {
            tracing::warn!(index = op.index, %kind, code = %err.code, "resolved reference rejected");
            op.reject(err);
        }
    }
}
