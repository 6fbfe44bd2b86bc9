use turnstile::http::response::{Response, ResponseBuilder, StatusCode};
use turnstile::http::writer::{DecodeError, decode_response, serialize_response};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::Unauthorized.as_u16(), 401);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
}

#[test]
fn test_status_code_from_u16_inverts_as_u16() {
    for status in [
        StatusCode::Ok,
        StatusCode::BadRequest,
        StatusCode::Unauthorized,
        StatusCode::NotFound,
        StatusCode::MethodNotAllowed,
        StatusCode::InternalServerError,
    ] {
        assert_eq!(StatusCode::from_u16(status.as_u16()), Some(status));
    }
    assert_eq!(StatusCode::from_u16(418), None);
}

#[test]
fn test_builder_adds_no_implicit_headers() {
    let response = ResponseBuilder::new(StatusCode::Ok).body("hello").build();

    assert!(response.headers.is_empty());
    assert_eq!(serialize_response(&response), b"HTTP/1.1 200 OK\r\n\r\nhello");
}

#[test]
fn test_builder_content_length_and_header_replace() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .header("content-type", "application/json")
        .body(b"{}".to_vec())
        .content_length()
        .build();

    assert_eq!(response.headers.len(), 2);
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.header("Content-Length"), Some("2"));
}

#[test]
fn test_serialize_keeps_header_order() {
    let response = Response::builder(StatusCode::NotFound)
        .header("B", "2")
        .header("A", "1")
        .body("gone")
        .build();

    assert_eq!(
        serialize_response(&response),
        b"HTTP/1.1 404 Not Found\r\nB: 2\r\nA: 1\r\n\r\ngone"
    );
}

#[test]
fn test_canonical_responses() {
    assert_eq!(Response::not_found().status, StatusCode::NotFound);
    assert_eq!(Response::method_not_allowed().status, StatusCode::MethodNotAllowed);
    assert!(Response::method_not_allowed().body.is_empty());
    assert_eq!(Response::internal_error().status, StatusCode::InternalServerError);
    assert_eq!(Response::bad_request("x").status, StatusCode::BadRequest);
    assert_eq!(Response::unauthorized("x").status, StatusCode::Unauthorized);
}

#[test]
fn test_serialize_then_decode_round_trip() {
    let cases = [
        Response::ok("Server running, connections: 3"),
        Response::not_found(),
        Response::method_not_allowed(),
        Response::builder(StatusCode::Ok)
            .body(b"line one\r\n\r\nline two".to_vec())
            .content_length()
            .build(),
    ];

    for response in cases {
        let decoded = decode_response(&serialize_response(&response)).unwrap();
        assert_eq!(decoded.code, response.status.as_u16());
        assert_eq!(decoded.reason, response.status.reason_phrase());
        assert_eq!(decoded.headers, response.headers);
        assert_eq!(decoded.body, response.body);
    }
}

#[test]
fn test_decode_rejects_garbage() {
    assert_eq!(decode_response(b"HTTP/1.1 200 OK\r\n"), Err(DecodeError::MissingSeparator));
    assert_eq!(decode_response(b"HTTP/1.1 abc\r\n\r\n"), Err(DecodeError::InvalidStatusLine));
}

