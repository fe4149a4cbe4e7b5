use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::utils::time::{format_unix_ms, unix_timestamp_millis};

pub const ENVELOPE_SCHEMA_VERSION: &str = "jvbrowse.envelope.v1";

pub type EnvelopeMeta = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeNotice {
    pub code: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// JSON document every subcommand prints on stdout, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ok: bool,
    pub command: String,
    pub generated_at_utc: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    pub meta: EnvelopeMeta,
    pub warnings: Vec<EnvelopeNotice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<EnvelopeNotice>,
}

impl Envelope {
    #[must_use]
    pub fn ok(command: impl Into<String>, data: Value) -> Self {
        Self::base(command, true).with_data(data)
    }

    #[must_use]
    pub fn error(
        command: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut envelope = Self::base(command, false);
        envelope.error = Some(EnvelopeNotice {
            code: code.into(),
            message: message.into(),
            details: None,
        });
        envelope
    }

    fn base(command: impl Into<String>, ok: bool) -> Self {
        let mut meta = EnvelopeMeta::new();
        meta.insert("schema_version".to_string(), json!(ENVELOPE_SCHEMA_VERSION));

        Self {
            ok,
            command: command.into(),
            generated_at_utc: format_unix_ms(unix_timestamp_millis()),
            data: None,
            meta,
            warnings: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_warning(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.warnings.push(EnvelopeNotice {
            code: code.into(),
            message: message.into(),
            details: None,
        });
        self
    }

    #[must_use]
    pub fn with_warnings(self, warnings: impl IntoIterator<Item = (String, String)>) -> Self {
        warnings
            .into_iter()
            .fold(self, |envelope, (code, message)| envelope.with_warning(code, message))
    }

    #[must_use]
    pub fn with_error_details(mut self, details: Value) -> Self {
        if let Some(error) = self.error.as_mut() {
            error.details = Some(details);
        }
        self
    }

    /// Serializes to one line; falls back to a minimal hand-built document.
    #[must_use]
    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"ok\":{},\"command\":{:?},\"error\":{{\"code\":\"envelope_encode_failed\"}}}}",
                self.ok, self.command
            )
        })
    }
}

/// How a failed command maps onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Store, process or I/O failure after work started.
    Runtime,
    /// Rejected before any side effect (missing file, bad argument).
    Preflight,
    /// Superseded or interrupted by a newer operation.
    Cancelled,
}

/// Error carried through `anyhow` so `main` can recover the envelope and exit code.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    envelope: Envelope,
    kind: FailureKind,
}

impl CommandFailure {
    #[must_use]
    pub fn new(envelope: Envelope, kind: FailureKind) -> Self {
        Self { envelope, kind }
    }

    #[must_use]
    pub fn runtime(envelope: Envelope) -> Self {
        Self::new(envelope, FailureKind::Runtime)
    }

    #[must_use]
    pub fn preflight(envelope: Envelope) -> Self {
        Self::new(envelope, FailureKind::Preflight)
    }

    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        self.kind
    }
}

impl Display for CommandFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.envelope.error {
            Some(error) => write!(f, "{}: {}", error.code, error.message),
            None => write!(f, "`{}` failed", self.envelope.command),
        }
    }
}

impl std::error::Error for CommandFailure {}
