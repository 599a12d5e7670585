//! `test-utils` is used for testing in both `httprobe-lib` and `httprobe-bin`.
//! This crate does not depend on `httprobe-lib` or `httprobe-bin`, else we would get dependency cycles.
//! Macros are used instead, so that the importer is responsible for providing the dependencies.

/// Create a mock web server, which responds with a predefined status when
/// handling a `GET` request. Further calls are applied to the response
/// template, e.g. `mock_server!(StatusCode::OK, set_body_string("hi"))`.
#[macro_export]
macro_rules! mock_server {
    ($status:expr $(, $func:tt ($($arg:expr),*))*) => {{
        let mock_server = wiremock::MockServer::start().await;
        let response_template = wiremock::ResponseTemplate::new(http::StatusCode::from($status));
        let template = response_template$(.$func($($arg),*))*;
        wiremock::Mock::given(wiremock::matchers::method("GET")).respond_with(template).mount(&mock_server).await;
        mock_server
    }};
}

/// The `host:port` of a mock server, as it would be read from stdin
#[macro_export]
macro_rules! mock_host {
    ($mock_server:expr) => {
        $mock_server.address().to_string()
    };
}

/// The port of a mock server, e.g. for building a `http:<port>` probe
#[macro_export]
macro_rules! mock_port {
    ($mock_server:expr) => {
        $mock_server.address().port()
    };
}
