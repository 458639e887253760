//! Ordered route → capability table.
//!
//! Rules are evaluated top to bottom and the first match decides. A request
//! that matches no rule falls through to the fallback capability, which is
//! [`Capability::Authenticated`] unless overridden.

use crate::Capability;

/// A path pattern.
///
/// - literal segments match themselves
/// - `*` matches exactly one segment
/// - a trailing `/**` matches the prefix itself and everything below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    subtree: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Any,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Self {
        let (body, subtree) = match pattern.strip_suffix("/**") {
            Some(prefix) => (prefix, true),
            None if pattern == "**" => ("", true),
            None => (pattern, false),
        };

        let segments = split_path(body)
            .map(|segment| match segment {
                "*" => Segment::Any,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
            subtree,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = split_path(path).collect();

        if path.len() < self.segments.len() || (!self.subtree && path.len() != self.segments.len()) {
            return false;
        }

        self.segments.iter().zip(&path).all(|(segment, actual)| match segment {
            Segment::Any => true,
            Segment::Literal(expected) => expected == actual,
        })
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRule {
    /// Upper-case HTTP method; `None` matches any method. A `GET` rule also
    /// covers `HEAD`, which routers answer with the `GET` handler.
    pub method: Option<String>,
    pub pattern: PathPattern,
    pub capability: Capability,
}

impl RouteRule {
    pub fn matches(&self, method: &str, path: &str) -> bool {
        let method_ok = self.method.as_deref().is_none_or(|expected| {
            expected.eq_ignore_ascii_case(method)
                || (expected.eq_ignore_ascii_case("GET") && method.eq_ignore_ascii_case("HEAD"))
        });
        method_ok && self.pattern.matches(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    rules: Vec<RouteRule>,
    fallback: Capability,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutePolicy {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Capability::Authenticated,
        }
    }

    /// Append a rule that applies to every method.
    pub fn any(mut self, pattern: &str, capability: Capability) -> Self {
        self.rules.push(RouteRule {
            method: None,
            pattern: PathPattern::parse(pattern),
            capability,
        });
        self
    }

    /// Append a rule for a single method.
    pub fn method(mut self, method: &str, pattern: &str, capability: Capability) -> Self {
        self.rules.push(RouteRule {
            method: Some(method.to_ascii_uppercase()),
            pattern: PathPattern::parse(pattern),
            capability,
        });
        self
    }

    pub fn with_fallback(mut self, capability: Capability) -> Self {
        self.fallback = capability;
        self
    }

    /// Capability required for `method` on `path`.
    pub fn required(&self, method: &str, path: &str) -> &Capability {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| &rule.capability)
            .unwrap_or(&self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn policy() -> RoutePolicy {
        RoutePolicy::new()
            .any("/health", Capability::Public)
            .any("/request-token", Capability::Public)
            .method("post", "/users", Capability::Public)
            .method("GET", "/users/me", Capability::any_of([Role::User, Role::Admin]))
            .any("/users", Capability::role(Role::Admin))
            .any("/users/*", Capability::role(Role::Admin))
            .any("/admin/**", Capability::role(Role::Admin))
    }

    #[test]
    fn star_matches_exactly_one_segment() {
        let pattern = PathPattern::parse("/users/*");
        assert!(pattern.matches("/users/42"));
        assert!(!pattern.matches("/users"));
        assert!(!pattern.matches("/users/42/roles"));
    }

    #[test]
    fn double_star_matches_prefix_and_descendants() {
        let pattern = PathPattern::parse("/admin/**");
        assert!(pattern.matches("/admin"));
        assert!(pattern.matches("/admin/"));
        assert!(pattern.matches("/admin/audit/today"));
        assert!(!pattern.matches("/administrator"));
    }

    #[test]
    fn literal_match_tolerates_trailing_slash() {
        assert!(PathPattern::parse("/health").matches("/health/"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let policy = policy();
        assert_eq!(
            policy.required("GET", "/users/me"),
            &Capability::any_of([Role::User, Role::Admin])
        );
        assert_eq!(policy.required("GET", "/users/0190"), &Capability::role(Role::Admin));
        assert_eq!(policy.required("DELETE", "/users/me"), &Capability::role(Role::Admin));
    }

    #[test]
    fn method_specific_rules_only_match_their_method() {
        let policy = policy();
        assert_eq!(policy.required("POST", "/users"), &Capability::Public);
        assert_eq!(policy.required("GET", "/users"), &Capability::role(Role::Admin));
    }

    #[test]
    fn get_rules_also_cover_head() {
        let policy = policy();
        let self_service = Capability::any_of([Role::User, Role::Admin]);
        assert_eq!(policy.required("HEAD", "/users/me"), &self_service);
        assert_eq!(policy.required("head", "/users/me"), &self_service);

        let post_only = RoutePolicy::new().method("POST", "/users", Capability::Public);
        assert_eq!(post_only.required("HEAD", "/users"), &Capability::Authenticated);
    }

    #[test]
    fn unmatched_routes_require_authentication() {
        let policy = policy();
        assert_eq!(policy.required("GET", "/whoami"), &Capability::Authenticated);
        assert_eq!(policy.required("POST", "/logout"), &Capability::Authenticated);
    }

    #[test]
    fn fallback_can_be_overridden() {
        let policy = RoutePolicy::new().with_fallback(Capability::role(Role::Admin));
        assert_eq!(policy.required("GET", "/anything"), &Capability::role(Role::Admin));
    }
}
