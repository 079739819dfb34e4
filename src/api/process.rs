use crate::{
    client::{error_from_response, Client},
    error::{Error, Result},
    models::{CodeRunParams, ExecuteRequest, ExecuteResponse, ExecutionResponse},
};
use base64::{engine::general_purpose, Engine};
use reqwest::StatusCode;
use tracing::debug;

/// Runs shell commands and code inside one sandbox.
#[derive(Debug, Clone)]
pub struct ProcessApi {
    client: Client,
    sandbox_id: String,
}

impl ProcessApi {
    pub fn new(client: Client, sandbox_id: String) -> Self {
        Self { client, sandbox_id }
    }

    pub async fn exec(
        &self,
        command: &str,
        cwd: Option<&str>,
        timeout: Option<u32>,
    ) -> Result<ExecuteResponse> {
        let url = self.client.build_url(&format!(
            "/toolbox/{}/toolbox/process/execute",
            self.sandbox_id
        ));
        let request = ExecuteRequest {
            command: command.to_string(),
            cwd: cwd.map(str::to_string),
            timeout,
        };

        debug!("Executing in sandbox {}: {}", self.sandbox_id, command);
        let response = self.client.http().post(&url).json(&request).send().await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
            _ => Err(error_from_response(response, &format!("Sandbox {}", self.sandbox_id)).await),
        }
    }

    pub async fn code_run(&self, code: &str) -> Result<ExecutionResponse> {
        self.code_run_with(code, &CodeRunParams::default()).await
    }

    pub async fn code_run_with(&self, code: &str, params: &CodeRunParams) -> Result<ExecutionResponse> {
        let command = python_command(code, params)?;
        let response = self.exec(&command, None, params.timeout).await?;
        Ok(response.into())
    }
}

/// Builds a shell command that runs `code` with python3. The source travels
/// base64-encoded so quotes and newlines in it need no escaping.
pub(crate) fn python_command(code: &str, params: &CodeRunParams) -> Result<String> {
    let encoded = general_purpose::STANDARD.encode(code);
    let mut inner = String::new();

    let mut env: Vec<(&String, &String)> = params.env.iter().collect();
    env.sort();
    for (key, value) in env {
        if !is_env_name(key) {
            return Err(Error::Configuration(format!(
                "Invalid environment variable name: {:?}",
                key
            )));
        }
        inner.push_str(&format!("{}={} ", key, quote(value)));
    }

    inner.push_str(&format!(
        "python3 -c \"exec(__import__('base64').b64decode('{}').decode())\"",
        encoded
    ));
    for arg in &params.argv {
        inner.push(' ');
        inner.push_str(&quote(arg));
    }

    Ok(format!("sh -c {}", quote(&inner)))
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote(word: &str) -> String {
    shlex::try_quote(word)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| word.replace('\0', ""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn decode_payload(command: &str) -> (Vec<String>, String) {
        let outer = shlex::split(command).unwrap();
        assert_eq!(&outer[..2], ["sh", "-c"]);
        let inner = shlex::split(&outer[2]).unwrap();
        let exec = inner
            .iter()
            .find(|w| w.starts_with("exec("))
            .unwrap()
            .clone();
        let start = exec.find("b64decode('").unwrap() + "b64decode('".len();
        let end = exec[start..].find('\'').unwrap() + start;
        let code = general_purpose::STANDARD.decode(&exec[start..end]).unwrap();
        (inner, String::from_utf8(code).unwrap())
    }

    #[test]
    fn code_survives_quotes_and_newlines() {
        let code = "import sys\nprint(\"it's\", 'fine')\n";
        let command = python_command(code, &CodeRunParams::default()).unwrap();
        let (inner, decoded) = decode_payload(&command);
        assert_eq!(decoded, code);
        assert_eq!(inner[0], "python3");
        assert_eq!(inner[1], "-c");
    }

    #[test]
    fn env_and_argv_are_passed_through() {
        let params = CodeRunParams {
            argv: vec!["AAPL".into(), "1 year".into()],
            env: HashMap::from([("TICKER_DIR".to_string(), "/tmp/out dir".to_string())]),
            timeout: Some(30),
        };
        let (inner, decoded) = decode_payload(&python_command("print(1)", &params).unwrap());
        assert_eq!(decoded, "print(1)");
        assert_eq!(inner.first().map(String::as_str), Some("TICKER_DIR=/tmp/out dir"));
        assert_eq!(&inner[inner.len() - 2..], ["AAPL", "1 year"]);
    }

    #[test]
    fn shell_syntax_in_env_names_is_rejected() {
        for key in ["A;rm -rf /", "1ABC", "", "HOME PATH", "$(id)"] {
            let params = CodeRunParams {
                env: HashMap::from([(key.to_string(), "x".to_string())]),
                ..Default::default()
            };
            let err = python_command("print(1)", &params).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{key:?} accepted");
        }
    }

    #[test]
    fn ordinary_env_names_are_accepted() {
        for key in ["_PRIVATE", "TICKER", "py3_HOME"] {
            assert!(is_env_name(key));
        }
    }
}
