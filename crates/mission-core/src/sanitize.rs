//! Reply sanitizing
//!
//! The model is told to speak as a persona and sometimes opens its answer
//! with that persona's name ("The Boss: ..."). The persona already travels
//! with the reply as its `name`, so the salutation is stripped here.

use regex::Regex;
use std::sync::LazyLock;

/// Start-anchored persona salutation: optional "The ", a short name,
/// optional colon, optional whitespace.
static PERSONA_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:the )?(?:swarm|boss|engineer|analyst|custodian|ab-|deployer):?\s*")
        .expect("persona prefix pattern is valid")
});

/// Strip a leading persona salutation from a model reply.
///
/// Only the start of the text is inspected; names appearing later are left
/// alone. Text without a salutation is returned unchanged.
pub fn sanitize(raw_reply: &str) -> String {
    match PERSONA_PREFIX.find(raw_reply) {
        Some(m) => raw_reply[m.end()..].to_string(),
        None => raw_reply.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_full_salutation() {
        assert_eq!(sanitize("The Boss: all systems go"), "all systems go");
        assert_eq!(sanitize("The Engineer: build is green"), "build is green");
        assert_eq!(sanitize("The AB-: unverified"), "unverified");
    }

    #[test]
    fn test_strips_without_article_or_colon() {
        assert_eq!(sanitize("Swarm: we are online"), "we are online");
        assert_eq!(sanitize("Deployer pipeline healthy"), "pipeline healthy");
        assert_eq!(sanitize("Custodian:backups verified"), "backups verified");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(sanitize("THE SWARM: ready"), "ready");
        assert_eq!(sanitize("the analyst:\n  trends up"), "trends up");
    }

    #[test]
    fn test_mid_text_untouched() {
        assert_eq!(sanitize("Ask The Boss about this"), "Ask The Boss about this");
        assert_eq!(sanitize("  The Boss: leading space"), "  The Boss: leading space");
    }

    #[test]
    fn test_no_prefix_unchanged() {
        assert_eq!(sanitize("All systems nominal."), "All systems nominal.");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_only_salutation() {
        assert_eq!(sanitize("The Swarm:"), "");
    }

    #[test]
    fn test_strips_once() {
        assert_eq!(sanitize("The Boss: The Engineer: hi"), "The Engineer: hi");
    }
}
