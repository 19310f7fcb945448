//! CLI error reporting
//!
//! Prints the error chain to stderr, or a JSON object carrying the stable
//! error code when `--json` is set.

use docket_error::{BackendError, CommitError, ConfigError, DocketError, RecorderError};
use serde_json::{json, Value};

/// Shared error handler for command line operations
#[derive(Debug, Clone)]
pub struct CliErrorHandler {
    pub verbose: bool,
    pub json: bool,
}

impl CliErrorHandler {
    pub fn new(verbose: bool, json: bool) -> Self {
        Self { verbose, json }
    }

    pub fn handle_error(&self, error: &anyhow::Error) -> Value {
        let error_obj = self.describe(error);

        if self.json {
            eprintln!("{}", error_obj);
        } else {
            eprintln!("Error: {}", error);
            // Without --verbose only the innermost cause is added
            let causes: Vec<_> = error.chain().skip(1).collect();
            if self.verbose {
                for cause in &causes {
                    eprintln!("Caused by: {}", cause);
                }
            } else if let Some(cause) = causes.last() {
                eprintln!("Caused by: {}", cause);
            }
        }

        error_obj
    }

    fn describe(&self, error: &anyhow::Error) -> Value {
        let chain: Vec<String> = error.chain().skip(1).map(|cause| cause.to_string()).collect();
        let mut error_obj = json!({
            "error": error.to_string(),
            "causes": chain,
        });

        if let Some(docket) = docket_error(error) {
            error_obj["code"] = json!(docket.error_code());
            error_obj["domain"] = json!(docket.domain().to_string());
            error_obj["transient"] = json!(docket.is_transient());
        }
        error_obj
    }
}

/// First error in the chain raised by a docket crate
fn docket_error(error: &anyhow::Error) -> Option<&dyn DocketError> {
    error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<RecorderError>() {
            Some(e as &dyn DocketError)
        } else if let Some(e) = cause.downcast_ref::<CommitError>() {
            Some(e as &dyn DocketError)
        } else if let Some(e) = cause.downcast_ref::<BackendError>() {
            Some(e as &dyn DocketError)
        } else {
            cause.downcast_ref::<ConfigError>().map(|e| e as &dyn DocketError)
        }
    })
}
