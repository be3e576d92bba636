//! # Message Structures
//!
//! Request and response payloads exchanged with clients, and the records that
//! carry jobs and responses through the Durable Queue.
//!
//! ## Client payloads
//!
//! ```text
//! request   { "command": <string>, "params": { <string>: <any>, ... } }
//! success   { "code": 0, "result": <any> }
//! failure   { "code": 1, "error": { "msg": <string>, "trace": <string> } }
//! ```
//!
//! ## Queue records
//!
//! Records are JSON objects. Binary frame parts (identity, delimiter, payload) are
//! hex encoded since the queue only stores text. The delimiter is an explicit
//! optional field rather than an extra positional element.

use super::envelope::{decode_part, encode_part, ClientEnvelope};
use super::errors::MessagingResult;
use crate::constants::ResponseCode;
use crate::registry::CommandError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Named parameters of a command, in the order the client sent them
pub type CommandParams = serde_json::Map<String, serde_json::Value>;

/// Globally unique job identifier: 32 lowercase hex characters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Fresh identifier from 122 bits of OS randomness
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A command request as sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    pub params: CommandParams,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>, params: CommandParams) -> Self {
        Self {
            command: command.into(),
            params,
        }
    }

    /// Parse a raw request payload
    ///
    /// Anything that is not a JSON object with a string `command` and an object
    /// `params` is a [`CommandError::MalformedRequest`].
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| CommandError::malformed(format!("payload is not valid JSON: {e}")))?;

        let serde_json::Value::Object(mut object) = value else {
            return Err(CommandError::malformed("payload must be a JSON object"));
        };

        let command = match object.remove("command") {
            Some(serde_json::Value::String(command)) => command,
            Some(_) => return Err(CommandError::malformed("command must be a string")),
            None => return Err(CommandError::malformed("missing command")),
        };

        let params = match object.remove("params") {
            Some(serde_json::Value::Object(params)) => params,
            Some(_) => return Err(CommandError::malformed("params must be an object")),
            None => return Err(CommandError::malformed("missing params")),
        };

        Ok(Self { command, params })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

/// Failure details returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub msg: String,
    pub trace: String,
}

/// Reply payload for one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub code: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl CommandResponse {
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            code: ResponseCode::Success,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(msg: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            code: ResponseCode::Failure,
            result: None,
            error: Some(ErrorDetail {
                msg: msg.into(),
                trace: trace.into(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // serialising plain JSON values and strings cannot fail
        serde_json::to_vec(self).unwrap_or_else(|_| br#"{"code":1}"#.to_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> MessagingResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<&CommandError> for CommandResponse {
    fn from(err: &CommandError) -> Self {
        CommandResponse::failure(err.to_string(), err.trace().unwrap_or_default())
    }
}

impl From<CommandError> for CommandResponse {
    fn from(err: CommandError) -> Self {
        CommandResponse::from(&err)
    }
}

/// A job as handed to a worker
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_id: JobId,
    pub envelope: ClientEnvelope,
    pub payload: Vec<u8>,
    pub enqueued_at: DateTime<Utc>,
}

impl Job {
    /// Parse the request payload this job carries
    pub fn request(&self) -> Result<CommandRequest, CommandError> {
        CommandRequest::parse(&self.payload)
    }
}

/// Work queue record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub job_id: JobId,
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    pub payload: String,
    pub enqueued_at: DateTime<Utc>,
}

impl WorkRecord {
    pub fn new(job_id: &JobId, envelope: &ClientEnvelope, payload: &[u8]) -> Self {
        Self {
            job_id: job_id.clone(),
            client: encode_part(&envelope.identity),
            delimiter: envelope.delimiter.as_deref().map(encode_part),
            payload: encode_part(payload),
            enqueued_at: Utc::now(),
        }
    }

    pub fn to_record(&self) -> MessagingResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_record(record: &str) -> MessagingResult<Self> {
        Ok(serde_json::from_str(record)?)
    }

    /// Decode the hex fields back into a [`Job`]
    pub fn into_job(self) -> MessagingResult<Job> {
        let identity = decode_part("client", &self.client)?;
        let delimiter = self
            .delimiter
            .as_deref()
            .map(|d| decode_part("delimiter", d))
            .transpose()?;
        let payload = decode_part("payload", &self.payload)?;

        Ok(Job {
            job_id: self.job_id,
            envelope: ClientEnvelope::new(identity, delimiter),
            payload,
            enqueued_at: self.enqueued_at,
        })
    }
}

/// Response queue record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub job_id: JobId,
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    pub response: String,
    pub completed_at: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn new(job: &Job, response: &CommandResponse) -> Self {
        Self {
            job_id: job.job_id.clone(),
            client: encode_part(&job.envelope.identity),
            delimiter: job.envelope.delimiter.as_deref().map(encode_part),
            response: encode_part(&response.to_bytes()),
            completed_at: Utc::now(),
        }
    }

    pub fn to_record(&self) -> MessagingResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_record(record: &str) -> MessagingResult<Self> {
        Ok(serde_json::from_str(record)?)
    }

    /// Raw response payload bytes
    pub fn payload(&self) -> MessagingResult<Vec<u8>> {
        decode_part("response", &self.response)
    }
}
