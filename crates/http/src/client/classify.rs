//! Response classification

use super::retry::OriginalRequest;
use super::transport::ApiResponse;
use reqwest::StatusCode;

/// How the pipeline treats a completed response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 2xx, delivered to the caller
    Ok,
    /// Expired credential on a protected call that may still be renewed
    Unauthorized,
    /// Anything else, surfaced to the caller as-is
    OtherError,
}

/// Targets that must never trigger a renewal when they answer 401.
///
/// Paths are compared without query string or trailing slash.
#[derive(Debug, Clone, Default)]
pub struct AuthEndpoints {
    paths: Vec<String>,
}

impl AuthEndpoints {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| normalize(p.as_ref()).to_string())
                .collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        let path = normalize(path);
        self.paths.iter().any(|p| p == path)
    }
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Sorts responses into ok / unauthorized / other-error
#[derive(Debug, Clone)]
pub struct FailureClassifier {
    auth_endpoints: AuthEndpoints,
}

impl FailureClassifier {
    pub fn new(auth_endpoints: AuthEndpoints) -> Self {
        Self { auth_endpoints }
    }

    pub fn is_auth_endpoint(&self, path: &str) -> bool {
        self.auth_endpoints.contains(path)
    }

    pub fn classify(&self, response: &ApiResponse, original: &OriginalRequest) -> Classification {
        if response.is_success() {
            return Classification::Ok;
        }

        if response.status != StatusCode::UNAUTHORIZED
            || original.is_retried()
            || self.is_auth_endpoint(&original.request().path)
        {
            return Classification::OtherError;
        }

        Classification::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transport::ApiRequest;
    use bytes::Bytes;

    fn classifier() -> FailureClassifier {
        FailureClassifier::new(AuthEndpoints::new([
            "/api/auth/login",
            "/api/auth/register",
            "/api/auth/refresh",
        ]))
    }

    fn response(status: StatusCode) -> ApiResponse {
        ApiResponse::new(status, Bytes::new())
    }

    #[test]
    fn test_success_is_ok() {
        let original = OriginalRequest::new(ApiRequest::get("/api/lotes"));
        assert_eq!(
            classifier().classify(&response(StatusCode::OK), &original),
            Classification::Ok
        );
    }

    #[test]
    fn test_protected_401_is_unauthorized() {
        let original = OriginalRequest::new(ApiRequest::get("/api/lotes"));
        assert_eq!(
            classifier().classify(&response(StatusCode::UNAUTHORIZED), &original),
            Classification::Unauthorized
        );
    }

    #[test]
    fn test_auth_endpoint_401_passes_through() {
        for path in [
            "/api/auth/login",
            "/api/auth/register/",
            "/api/auth/refresh?source=cli",
        ] {
            let original = OriginalRequest::new(ApiRequest::post(path));
            assert_eq!(
                classifier().classify(&response(StatusCode::UNAUTHORIZED), &original),
                Classification::OtherError,
                "{path}"
            );
        }
    }

    #[test]
    fn test_auth_lookalike_is_still_protected() {
        let original = OriginalRequest::new(ApiRequest::get("/api/auth/me"));
        assert_eq!(
            classifier().classify(&response(StatusCode::UNAUTHORIZED), &original),
            Classification::Unauthorized
        );
    }

    #[test]
    fn test_retried_401_escalates() {
        let original = OriginalRequest::new(ApiRequest::get("/api/lotes")).into_retry("T2");
        assert_eq!(
            classifier().classify(&response(StatusCode::UNAUTHORIZED), &original),
            Classification::OtherError
        );
    }

    #[test]
    fn test_other_statuses_pass_through() {
        let original = OriginalRequest::new(ApiRequest::get("/api/lotes"));
        for status in [
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert_eq!(
                classifier().classify(&response(status), &original),
                Classification::OtherError
            );
        }
    }
}
