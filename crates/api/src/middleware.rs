use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use bullion_core::UserId;

use crate::context::ActorContext;

pub const USER_HEADER: &str = "x-user-id";

pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = extract_user(req.headers())?;
    req.extensions_mut().insert(ActorContext::new(user_id));
    Ok(next.run(req).await)
}

fn extract_user(headers: &HeaderMap) -> Result<Option<UserId>, StatusCode> {
    let Some(header) = headers.get(USER_HEADER) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| StatusCode::BAD_REQUEST)?.trim();
    if value.is_empty() {
        return Ok(None);
    }

    value.parse().map(Some).map_err(|_| StatusCode::BAD_REQUEST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_or_blank_header_means_anonymous() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_user(&headers), Ok(None));

        headers.insert(USER_HEADER, HeaderValue::from_static("  "));
        assert_eq!(extract_user(&headers), Ok(None));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_static("not-a-uuid"));
        assert_eq!(extract_user(&headers), Err(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn uuid_header_becomes_the_actor() {
        let user = UserId::new();
        let mut headers = HeaderMap::new();
        headers.insert(USER_HEADER, HeaderValue::from_str(&user.to_string()).unwrap());
        assert_eq!(extract_user(&headers), Ok(Some(user)));
    }
}
