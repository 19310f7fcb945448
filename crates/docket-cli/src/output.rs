//! Result printing, human-readable or JSON

use std::fmt::Display;

use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Print `text`, or `value` as one JSON line with `--json`
    pub fn emit(&self, text: impl Display, value: Value) {
        if self.json {
            println!("{}", value);
        } else {
            println!("{}", text);
        }
    }
}
