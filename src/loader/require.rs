//! Require Dispatch
//!
//! Tagged form of the request strings scripts pass to `require`, so
//! resolution is an explicit two-case match instead of ad-hoc string
//! inspection at every call site.

/// A parsed `require` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RequireRequest {
    /// `"./sub/file"` style: a file within the requesting component,
    /// relative to the requesting script's own directory.
    Relative(String),
    /// `"name"` or `"name/sub/path"` style: a dependency short name plus an
    /// optional file inside that dependency.
    Named { name: String, file: Option<String> },
}

impl RequireRequest {
    pub(crate) fn parse(raw: &str) -> Self {
        if raw == "." || raw == ".." || raw.starts_with("./") || raw.starts_with("../") {
            return RequireRequest::Relative(raw.to_string());
        }
        match raw.split_once('/') {
            Some((name, file)) => RequireRequest::Named {
                name: name.to_string(),
                file: (!file.is_empty()).then(|| file.to_string()),
            },
            None => RequireRequest::Named {
                name: raw.to_string(),
                file: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_requests() {
        assert_eq!(
            RequireRequest::parse("./lib/util"),
            RequireRequest::Relative("./lib/util".to_string())
        );
        assert_eq!(
            RequireRequest::parse("../shared"),
            RequireRequest::Relative("../shared".to_string())
        );
    }

    #[test]
    fn named_requests() {
        assert_eq!(
            RequireRequest::parse("bar"),
            RequireRequest::Named {
                name: "bar".to_string(),
                file: None,
            }
        );
        assert_eq!(
            RequireRequest::parse("bar/lib/util"),
            RequireRequest::Named {
                name: "bar".to_string(),
                file: Some("lib/util".to_string()),
            }
        );
    }

    #[test]
    fn trailing_slash_means_no_file() {
        assert_eq!(
            RequireRequest::parse("bar/"),
            RequireRequest::Named {
                name: "bar".to_string(),
                file: None,
            }
        );
    }
}
