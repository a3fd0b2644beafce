use axum::{extract::Request, middleware::Next, response::Response};
use utils::i18n::Locale;

/// `Accept-Language` first, then `?lang=`, then English
fn request_locale(request: &Request) -> Locale {
    request
        .headers()
        .get("accept-language")
        .and_then(|value| value.to_str().ok())
        .and_then(Locale::from_accept_language)
        .or_else(|| {
            request
                .uri()
                .query()?
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "lang")
                .and_then(|(_, value)| Locale::parse(value))
        })
        .unwrap_or_default()
}

/// Renders every message produced while handling the request in its locale
pub async fn locale(request: Request, next: Next) -> Response {
    request_locale(&request).scope(next.run(request)).await
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http};

    use super::*;

    fn request(uri: &str, accept: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri(uri);
        if let Some(value) = accept {
            builder = builder.header("accept-language", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_request_locale() {
        assert_eq!(request_locale(&request("/", Some("pt-BR,pt;q=0.9"))), Locale::Pt);
        assert_eq!(request_locale(&request("/?page=2&lang=pt", None)), Locale::Pt);
        assert_eq!(
            request_locale(&request("/?lang=pt", Some("en-US"))),
            Locale::En
        );
        assert_eq!(request_locale(&request("/?lang=fr", Some("de"))), Locale::En);
        assert_eq!(request_locale(&request("/", None)), Locale::En);
    }
}
