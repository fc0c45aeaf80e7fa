use std::sync::Arc;

/// Decides whether a WebSocket upgrade may proceed, based on the request's
/// `Origin` header. Evaluated once per upgrade attempt.
pub trait OriginPolicy: Send + Sync {
    fn allows(&self, origin: Option<&str>) -> bool;
}

/// Accepts every origin.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAnyOrigin;

impl OriginPolicy for AllowAnyOrigin {
    fn allows(&self, _origin: Option<&str>) -> bool {
        true
    }
}

/// Accepts only the listed origins (scheme + host + optional port),
/// compared case-insensitively. Requests without an `Origin` header come
/// from non-browser clients and are accepted.
#[derive(Clone, Debug, Default)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins
                .into_iter()
                .map(|o| o.into().trim_end_matches('/').to_ascii_lowercase())
                .collect(),
        }
    }
}

impl OriginPolicy for AllowedOrigins {
    fn allows(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => {
                let origin = origin.trim_end_matches('/').to_ascii_lowercase();
                self.origins.iter().any(|allowed| *allowed == origin)
            }
        }
    }
}

/// Policy for a configured allow-list; empty means any origin.
pub fn policy_for(allowed_origins: &[String]) -> Arc<dyn OriginPolicy> {
    if allowed_origins.is_empty() {
        Arc::new(AllowAnyOrigin)
    } else {
        Arc::new(AllowedOrigins::new(allowed_origins.iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_any() {
        assert!(AllowAnyOrigin.allows(None));
        assert!(AllowAnyOrigin.allows(Some("https://evil.example")));
    }

    #[test]
    fn allow_list_matches_exactly_ignoring_case_and_trailing_slash() {
        let policy = AllowedOrigins::new(["https://klok.example.nl", "http://localhost:8080/"]);

        assert!(policy.allows(Some("https://klok.example.nl")));
        assert!(policy.allows(Some("HTTPS://KLOK.EXAMPLE.NL/")));
        assert!(policy.allows(Some("http://localhost:8080")));
        assert!(!policy.allows(Some("http://klok.example.nl")));
        assert!(!policy.allows(Some("https://klok.example.nl.evil.example")));
        assert!(!policy.allows(Some("http://localhost:8081")));
    }

    #[test]
    fn missing_origin_is_allowed() {
        let policy = AllowedOrigins::new(["https://a.example"]);
        assert!(policy.allows(None));
    }

    #[test]
    fn policy_for_config() {
        assert!(policy_for(&[]).allows(Some("https://anything.example")));

        let strict = policy_for(&["https://a.example".to_string()]);
        assert!(strict.allows(Some("https://a.example")));
        assert!(!strict.allows(Some("https://b.example")));
    }
}
