use axum::http::Request;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The `x-request-id` set on the request, or `-` when absent or not ASCII.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_request_id_header() {
        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "4b1c0f0e-req")
            .body(())
            .unwrap();
        assert_eq!(request_id(&request), "4b1c0f0e-req");
    }

    #[test]
    fn missing_header_is_a_dash() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(request_id(&request), "-");
    }
}
