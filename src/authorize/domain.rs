/// Schemes that execute or read local content when a link is followed.
const DANGEROUS_SCHEMES: &[&str] = &["javascript", "vbscript", "data", "file"];

/// Normalised domain allowlist. An entry matches its exact host and any
/// subdomain; `*.example.com` is accepted as a spelling of `example.com`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainAllowlist {
    domains: Vec<String>,
}

impl DomainAllowlist {
    pub fn new(entries: &[String]) -> Self {
        let domains = entries
            .iter()
            .map(|d| {
                d.trim()
                    .to_lowercase()
                    .trim_start_matches("*.")
                    .trim_start_matches('.')
                    .trim_end_matches('.')
                    .to_string()
            })
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    pub fn permits_host(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        self.domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkVerdict {
    Allowed,
    DangerousScheme(String),
    DisallowedHost(String),
    /// An allowlist is configured but the target has no checkable host.
    Unverifiable,
}

/// Decide whether a link target may stay in agent text.
///
/// Relative targets are always fine. Executable schemes never are. Anything
/// else is checked against `allowlist` when one is configured.
pub fn classify_url(raw: &str, allowlist: Option<&DomainAllowlist>) -> LinkVerdict {
    let compact: String = raw
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let scheme = scheme_of(&compact);
    if let Some(scheme) = &scheme
        && DANGEROUS_SCHEMES.contains(&scheme.as_str())
    {
        return LinkVerdict::DangerousScheme(scheme.clone());
    }

    let absolute = match (&scheme, compact.starts_with("//")) {
        (Some(_), _) => compact,
        (None, true) => format!("https:{compact}"),
        (None, false) => return LinkVerdict::Allowed,
    };

    let Some(allowlist) = allowlist else {
        return LinkVerdict::Allowed;
    };

    let Ok(url) = url::Url::parse(&absolute) else {
        return LinkVerdict::Unverifiable;
    };
    match url.host_str() {
        Some(host) if allowlist.permits_host(host) => LinkVerdict::Allowed,
        Some(host) => LinkVerdict::DisallowedHost(host.to_string()),
        None => LinkVerdict::Unverifiable,
    }
}

/// Lowercased scheme, if the text starts with one (`name:` before any
/// path, query or fragment character).
fn scheme_of(text: &str) -> Option<String> {
    let end = text.find(|c: char| matches!(c, ':' | '/' | '?' | '#'))?;
    if !text[end..].starts_with(':') || end == 0 {
        return None;
    }
    let scheme = &text[..end];
    let mut chars = scheme.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    (first_ok && rest_ok).then(|| scheme.to_ascii_lowercase())
}
