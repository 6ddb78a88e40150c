//! Fetch status classification

use std::fmt;

/// Buckets a robots.txt fetch status into the categories a crawler acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchStatusClass {
    /// 200
    Success,

    /// 403
    Forbidden,

    /// 429 or any 5xx: server error or "Too many requests"
    DeferVisits,

    /// 3xx
    Redirect,

    /// 404, 410, or 400 (bad request)
    NotFound,

    /// 401
    Unauthorized,

    /// Anything else
    Other,
}

impl FetchStatusClass {
    /// Stable name used in the ranked list artifact
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatusClass::Success => "success",
            FetchStatusClass::Forbidden => "forbidden",
            FetchStatusClass::DeferVisits => "defer_visits",
            FetchStatusClass::Redirect => "redirect",
            FetchStatusClass::NotFound => "notfound",
            FetchStatusClass::Unauthorized => "unauthorized",
            FetchStatusClass::Other => "other",
        }
    }
}

impl fmt::Display for FetchStatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a numeric HTTP fetch status.
pub fn classify_fetch_status(status_code: i32) -> FetchStatusClass {
    match status_code {
        200 => FetchStatusClass::Success,
        403 => FetchStatusClass::Forbidden,
        429 | 500..=599 => FetchStatusClass::DeferVisits,
        300..=399 => FetchStatusClass::Redirect,
        404 | 410 | 400 => FetchStatusClass::NotFound,
        401 => FetchStatusClass::Unauthorized,
        _ => FetchStatusClass::Other,
    }
}
