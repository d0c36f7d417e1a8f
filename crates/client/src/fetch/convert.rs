//! Conversions between reqwest types and the worker's request and response model.

use reqwest::header::HeaderMap;
use url::Url;

use waystation_core::http::url::same_origin;
use waystation_core::{Error, ResponseType};

/// `basic` when the final URL is on the application origin, `cors` otherwise.
pub fn response_type_for(origin: &Url, final_url: &Url) -> ResponseType {
    if same_origin(origin, final_url) { ResponseType::Basic } else { ResponseType::Cors }
}

pub fn transport_error(url: &Url, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

/// Header pairs with lowercase names. Values that are not valid UTF-8 are dropped.
pub(crate) fn headers(map: &HeaderMap) -> Vec<(String, String)> {
    map.iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{CONTENT_TYPE, HeaderValue, SET_COOKIE};

    #[test]
    fn test_response_type_for() {
        let origin = Url::parse("https://app.test").unwrap();
        assert_eq!(response_type_for(&origin, &Url::parse("https://app.test/static/a.js").unwrap()), ResponseType::Basic);
        assert_eq!(response_type_for(&origin, &Url::parse("https://cdn.test/a.js").unwrap()), ResponseType::Cors);
        assert_eq!(response_type_for(&origin, &Url::parse("http://app.test/a.js").unwrap()), ResponseType::Cors);
    }

    #[test]
    fn test_headers_lowercase_and_skip_binary() {
        let mut map = HeaderMap::new();
        map.insert(CONTENT_TYPE, HeaderValue::from_static("Application/JSON"));
        map.append(SET_COOKIE, HeaderValue::from_bytes(b"a=\xff").unwrap());

        assert_eq!(headers(&map), vec![("content-type".to_string(), "Application/JSON".to_string())]);
    }
}
