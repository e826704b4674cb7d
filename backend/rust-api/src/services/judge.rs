//! Judge0 code runner and output grading.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::JudgeConfig;
use crate::metrics::JUDGE_REQUEST_DURATION_SECONDS;
use crate::models::submission::{ErrorKind, Verdict};

#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("Error executing the code (status {status})")]
    Status { status: u16, body: String },

    #[error("Undecodable judge response: {0}")]
    Decode(String),
}

/// Decoded fields of one run; absent or null fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
}

/// Executes submitted source code.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, source: &str) -> Result<RunResult, JudgeError>;
}

#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    source_code: String,
    language_id: u32,
    stdin: &'a str,
    cpu_time_limit: f64,
    memory_limit: u64,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    compile_output: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct Judge0Client {
    http: Client,
    config: JudgeConfig,
}

impl Judge0Client {
    pub fn new(config: JudgeConfig) -> Result<Self, JudgeError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl CodeRunner for Judge0Client {
    async fn run(&self, source: &str) -> Result<RunResult, JudgeError> {
        let url = format!(
            "{}/submissions?base64_encoded=true&wait=true",
            self.config.base_url
        );
        let body = SubmissionRequest {
            source_code: general_purpose::STANDARD.encode(source.as_bytes()),
            language_id: self.config.language_id,
            stdin: "",
            cpu_time_limit: self.config.cpu_time_limit,
            memory_limit: self.config.memory_limit,
        };

        let timer = std::time::Instant::now();
        let response = self
            .http
            .post(&url)
            .header("X-RapidAPI-Key", &self.config.api_key)
            .header("X-RapidAPI-Host", &self.config.api_host)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        JUDGE_REQUEST_DURATION_SECONDS
            .with_label_values(&[status.as_str()])
            .observe(timer.elapsed().as_secs_f64());

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Judge returned {}: {}", status, body);
            return Err(JudgeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: SubmissionResponse = response
            .json()
            .await
            .map_err(|e| JudgeError::Decode(e.to_string()))?;

        Ok(RunResult {
            stdout: decode_field(raw.stdout)?,
            stderr: decode_field(raw.stderr)?,
            compile_output: decode_field(raw.compile_output)?,
            message: decode_field(raw.message)?,
        })
    }
}

/// Base64 field to text. Judge0 wraps encoded output in newlines.
fn decode_field(field: Option<String>) -> Result<Option<String>, JudgeError> {
    let Some(encoded) = field else {
        return Ok(None);
    };
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| JudgeError::Decode(e.to_string()))?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Output panel text and correctness of one run.
///
/// stderr, then compile output, then stdout, then the judge message. Only a
/// clean run with a non-empty expectation can be correct, compared after
/// trimming both sides.
pub fn grade(result: &RunResult, expected_output: &str) -> Verdict {
    let present = |field: &Option<String>| field.clone().filter(|s| !s.is_empty());

    let (output, error) = if let Some(stderr) = present(&result.stderr) {
        (format!("Error:\n{}", stderr), Some(ErrorKind::Runtime))
    } else if let Some(compile) = present(&result.compile_output) {
        (format!("Compilation error:\n{}", compile), Some(ErrorKind::Compile))
    } else if let Some(stdout) = present(&result.stdout) {
        (stdout, None)
    } else if let Some(message) = present(&result.message) {
        (format!("Message: {}", message), None)
    } else {
        ("No output".to_string(), None)
    };

    let is_correct =
        error.is_none() && !expected_output.is_empty() && output.trim() == expected_output.trim();

    Verdict {
        output,
        error,
        is_correct,
    }
}

/// Output panel text for a failed call to the runner.
pub fn transport_output(err: &JudgeError) -> String {
    format!("Error: {}\n\nCheck your connection to the code runner", err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stdout(text: &str) -> RunResult {
        RunResult {
            stdout: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn trimmed_stdout_match_is_correct() {
        let verdict = grade(&stdout("Hola Mundo\n"), "  Hola Mundo");
        assert!(verdict.is_correct);
        assert_eq!(verdict.output, "Hola Mundo\n");
        assert_eq!(verdict.error, None);
    }

    #[test]
    fn case_differences_are_not_normalized() {
        assert!(!grade(&stdout("hola mundo"), "Hola Mundo").is_correct);
    }

    #[test]
    fn stderr_wins_and_is_never_correct() {
        let result = RunResult {
            stdout: Some("3".to_string()),
            stderr: Some("Traceback".to_string()),
            ..Default::default()
        };
        let verdict = grade(&result, "3");
        assert!(!verdict.is_correct);
        assert!(verdict.output.starts_with("Error:\n"));
        assert_eq!(verdict.error, Some(ErrorKind::Runtime));
    }

    #[test]
    fn compile_output_is_reported() {
        let result = RunResult {
            compile_output: Some("SyntaxError".to_string()),
            ..Default::default()
        };
        let verdict = grade(&result, "x");
        assert_eq!(verdict.output, "Compilation error:\nSyntaxError");
        assert_eq!(verdict.error, Some(ErrorKind::Compile));
    }

    #[test]
    fn message_and_empty_fallbacks() {
        let message = RunResult {
            message: Some("Time limit exceeded".to_string()),
            stdout: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(grade(&message, "1").output, "Message: Time limit exceeded");
        assert_eq!(grade(&RunResult::default(), "1").output, "No output");
    }

    #[test]
    fn empty_expectation_is_never_correct() {
        assert!(!grade(&stdout("   "), "").is_correct);
        assert!(!grade(&RunResult::default(), "").is_correct);
    }

    #[test]
    fn decodes_wrapped_base64() {
        let decoded = decode_field(Some("SG9sYSBN\ndW5kbwo=\n".to_string())).unwrap();
        assert_eq!(decoded.as_deref(), Some("Hola Mundo\n"));
        assert_eq!(decode_field(None).unwrap(), None);
        assert!(decode_field(Some("***".to_string())).is_err());
    }

    #[test]
    fn transport_output_mentions_connection() {
        let err = JudgeError::Decode("truncated".to_string());
        let output = transport_output(&err);
        assert!(output.starts_with("Error: "));
        assert!(output.ends_with("Check your connection to the code runner"));
    }
}
