//! Common functions used across test cases.

use std::sync::Mutex;

use query_engine_execution::ExecutionResult;
use sqlmod::{ErrorKind, RequestId, SqlModule, Transport};
use sqlmod_configuration::environment::FixedEnvironment;

/// Everything the module sent back, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Result(RequestId, ExecutionResult),
    Error(RequestId, ErrorKind, String),
    ConfigOk,
    ConfigErr(String),
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    fn push(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

impl Transport for RecordingTransport {
    fn send_result(&self, id: RequestId, result: ExecutionResult) {
        self.push(Sent::Result(id, result));
    }

    fn send_error(&self, id: RequestId, kind: ErrorKind, message: String) {
        self.push(Sent::Error(id, kind, message));
    }

    fn send_config_ok(&self) {
        self.push(Sent::ConfigOk);
    }

    fn send_config_err(&self, message: String) {
        self.push(Sent::ConfigErr(message));
    }
}

pub type TestModule = SqlModule<RecordingTransport, FixedEnvironment>;

/// A module with fresh metrics and no pool.
pub fn create_module(environment: FixedEnvironment) -> TestModule {
    create_module_in(environment, &mut prometheus::Registry::new())
}

/// A module with no pool whose metrics are registered in `registry`.
pub fn create_module_in(
    environment: FixedEnvironment,
    registry: &mut prometheus::Registry,
) -> TestModule {
    tests_common::init_logging();
    SqlModule::new(RecordingTransport::default(), environment, registry).unwrap()
}

/// A module whose pool points at `connection_uri`.
pub async fn configured_module(connection_uri: &str) -> TestModule {
    let module = create_module(FixedEnvironment::default());
    let config = serde_json::json!({ "dsn": connection_uri, "max_open_conn": 4 });
    module.on_config(config.to_string().as_bytes()).await;
    assert_eq!(module.transport().take(), vec![Sent::ConfigOk]);
    module
}

/// Send one request and return the single answer it produced.
pub async fn request(module: &TestModule, id: RequestId, body: serde_json::Value) -> Sent {
    module.on_request(id, body.to_string().as_bytes()).await;
    let mut sent = module.transport().take();
    assert_eq!(sent.len(), 1, "expected exactly one answer, got {sent:?}");
    sent.remove(0)
}
