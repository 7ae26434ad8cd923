use kubevet_common::diagnostic::Diagnosable;
use tracing::debug;

/// A single literal find/replace rule applied to an image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    pub matcher: String,
    pub replacement: String,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("replacement rule '{0}' is not in 'match|replacement' format")]
    MalformedRule(String),
}

impl Diagnosable for ResolveError {
    fn code(&self) -> String {
        "IMAGE_RULE_MALFORMED".to_string()
    }
    fn suggestion(&self) -> Option<String> {
        Some("Rules are comma separated, each one 'matchingString|replacementString'".to_string())
    }
}

/// Parses a comma-separated rule string. Every rule must split into exactly
/// two parts on `|`, with a non-empty match part.
pub fn parse_rules(rules: &str) -> Result<Vec<RewriteRule>, ResolveError> {
    if rules.is_empty() {
        return Ok(Vec::new());
    }
    rules
        .split(',')
        .map(|rule| match rule.split_once('|') {
            Some((matcher, replacement))
                if !matcher.is_empty() && !replacement.contains('|') =>
            {
                Ok(RewriteRule {
                    matcher: matcher.to_string(),
                    replacement: replacement.to_string(),
                })
            }
            _ => Err(ResolveError::MalformedRule(rule.to_string())),
        })
        .collect()
}

/// Rewrites an image reference through the ordered rule list. Substitution
/// is literal and global, and the output of each rule feeds the next one.
///
/// Callers treat a format error as non-fatal: log it and scan under the
/// original, unresolved name.
pub fn resolve(image: &str, rules: &str) -> Result<String, ResolveError> {
    let mut resolved = image.to_string();
    for rule in parse_rules(rules)? {
        debug!(
            image = %resolved,
            matcher = %rule.matcher,
            replacement = %rule.replacement,
            "applying image rewrite rule"
        );
        resolved = resolved.replace(&rule.matcher, &rule.replacement);
    }
    Ok(resolved)
}
