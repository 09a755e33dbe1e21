use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use anyhow::Context;
use blokus::Request;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::recording::Recorder;

/// How to launch an external bot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub nick: String,
    /// The program followed by its arguments.
    pub cmd: Vec<String>,
}

impl PlayerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read player config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse player config from {}", path.display()))?;
        if config.cmd.is_empty() {
            anyhow::bail!("Player config {} has an empty command", path.display());
        }
        Ok(config)
    }
}

/// A bot running as a child process, spoken to with JSON lines.
pub struct Player {
    pub name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    // A re-usable buffer for IO.
    // Should always be empty before and after perform_request().
    buf: String,
}

impl Player {
    pub fn from_config(config: &PlayerConfig) -> anyhow::Result<Self> {
        let Some((program, args)) = config.cmd.split_first() else {
            anyhow::bail!("No command given for player {}", config.nick);
        };
        Self::new(&config.nick, program, args)
    }

    pub fn new(name: &str, program: &str, args: &[String]) -> anyhow::Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start '{}'", program))?;
        let stdin = child.stdin.take().context("Could not access stdin")?;
        let stdout = child.stdout.take().context("Could not access stdout")?;

        Ok(Self {
            name: String::from(name),
            child,
            stdin,
            stdout: BufReader::new(stdout),
            buf: String::new(),
        })
    }

    pub fn perform_request<T: serde::de::DeserializeOwned + std::fmt::Debug>(
        &mut self,
        recorder: &mut Option<Recorder>,
        req: &Request,
    ) -> anyhow::Result<T> {
        let mut req_json = serde_json::to_string(req)?;
        trace!(name: "Sending request", player = &self.name, request = %req_json);
        req_json.push('\n');
        self.stdin.write_all(req_json.as_bytes())?;
        self.stdin.flush()?;
        self.buf.clear();
        if self.stdout.read_line(&mut self.buf)? == 0 {
            anyhow::bail!("Player {} closed its output", self.name);
        }
        let serialized_response = self.buf.trim_end();
        let response = serde_json::from_str::<T>(serialized_response)
            .with_context(|| format!("Invalid response from {}: {}", self.name, serialized_response))?;
        trace!(name: "Received response", player = &self.name, response = %serialized_response);

        if let Some(recorder) = recorder {
            recorder.store_request(&self.name, req, serialized_response)?;
        }
        self.buf.clear();
        Ok(response)
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        // Best effort: the bot may already be gone.
        if let Ok(mut bye) = serde_json::to_string(&Request::Bye) {
            bye.push('\n');
            let _ = self.stdin.write_all(bye.as_bytes());
            let _ = self.stdin.flush();
        }
        let _ = self.child.wait();
    }
}
