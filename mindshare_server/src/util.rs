use axum::http::{HeaderMap, header::HOST};
use mindshare_core::twitter::dto::CallerOrigin;

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Scheme and host the request came in on, honouring reverse-proxy headers.
pub fn caller_origin(headers: &HeaderMap) -> CallerOrigin {
    let host = header_value(headers, "x-forwarded-host")
        .or_else(|| header_value(headers, HOST.as_str()))
        .unwrap_or("localhost");
    let scheme = header_value(headers, "x-forwarded-proto").unwrap_or("http");

    CallerOrigin::new(scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_caller_origin_from_host() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("localhost:5000"));

        assert_eq!(
            caller_origin(&headers),
            CallerOrigin::new("http", "localhost:5000")
        );
    }

    #[test]
    fn test_caller_origin_behind_proxy() {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("10.0.0.3:5000"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("mindshare.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https, http"));

        assert_eq!(
            caller_origin(&headers),
            CallerOrigin::new("https", "mindshare.example.com")
        );
    }

    #[test]
    fn test_caller_origin_without_headers() {
        assert_eq!(
            caller_origin(&HeaderMap::new()),
            CallerOrigin::new("http", "localhost")
        );
    }
}
