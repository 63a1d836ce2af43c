use std::fmt;

use serde::Serialize;

/// Protocol versions offered in the CONNECT frame.
pub const ACCEPT_VERSION: &str = "1.1,1.0";

/// Heart-beat proposal sent with CONNECT, in milliseconds (`send,receive`).
pub const HEARTBEAT: &str = "10000,10000";

/// A frame command.
///
/// Commands the client never needs to tell apart are kept verbatim in
/// `Other` so a frame can be parsed and re-encoded without loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Connected,
    Subscribe,
    Send,
    Message,
    Receipt,
    Error,
    Other(String),
}

impl Command {
    pub fn as_str(&self) -> &str {
        match self {
            Command::Connect => "CONNECT",
            Command::Connected => "CONNECTED",
            Command::Subscribe => "SUBSCRIBE",
            Command::Send => "SEND",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Other(name) => name,
        }
    }

    fn from_line(line: &str) -> Result<Self, FrameError> {
        if line.is_empty() || !line.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(FrameError::InvalidCommand(line.to_string()));
        }
        Ok(match line {
            "CONNECT" => Command::Connect,
            "CONNECTED" => Command::Connected,
            "SUBSCRIBE" => Command::Subscribe,
            "SEND" => Command::Send,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => Command::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a text message is not a well-formed frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("frame is not NUL-terminated")]
    MissingTerminator,
    #[error("frame has no blank line after its headers")]
    MissingHeaderTerminator,
    #[error("invalid command line `{0}`")]
    InvalidCommand(String),
    #[error("malformed header line `{0}`")]
    MalformedHeader(String),
}

/// One protocol unit: a command, ordered headers and an optional body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Appends a header, keeping insertion order on the wire.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Value of the first header called `name`.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Serializes the frame.
    ///
    /// ```text
    /// COMMAND\n
    /// name:value\n      (zero or more)
    /// \n
    /// body\n            (only when a body is present)
    /// \0
    /// ```
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(64 + self.body.as_ref().map_or(0, String::len));
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push(':');
            out.push_str(value);
            out.push('\n');
        }
        out.push('\n');
        if let Some(body) = &self.body {
            out.push_str(body);
            out.push('\n');
        }
        out.push('\0');
        out
    }

    /// Strictly parses a single frame.
    ///
    /// Leading end-of-line bytes (heart-beats) are skipped, `\r\n` line
    /// endings are accepted, and anything after the NUL terminator is
    /// ignored. The body loses its trailing end-of-line bytes; an empty body
    /// is reported as `None`.
    pub fn parse(raw: &str) -> Result<Self, FrameError> {
        let text = raw.trim_start_matches(['\r', '\n']);
        if text.is_empty() {
            return Err(FrameError::Empty);
        }
        let text = match text.find('\0') {
            Some(end) => &text[..end],
            None => return Err(FrameError::MissingTerminator),
        };

        let mut head = Vec::new();
        let mut body_start = None;
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            offset += line.len();
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                body_start = Some(offset);
                break;
            }
            head.push(line);
        }
        let body_start = body_start.ok_or(FrameError::MissingHeaderTerminator)?;

        let mut head = head.into_iter();
        let command = Command::from_line(head.next().ok_or(FrameError::Empty)?)?;
        let headers = head
            .map(|line| {
                line.split_once(':')
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .ok_or_else(|| FrameError::MalformedHeader(line.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let body = text[body_start..].trim_end_matches(['\r', '\n']);
        Ok(Self {
            command,
            headers,
            body: (!body.is_empty()).then(|| body.to_string()),
        })
    }
}

/// Builds the CONNECT frame opening a session with `host`.
pub fn encode_connect(host: &str) -> String {
    Frame::new(Command::Connect)
        .header("accept-version", ACCEPT_VERSION)
        .header("host", host)
        .header("heart-beat", HEARTBEAT)
        .encode()
}

/// Builds a SUBSCRIBE frame with an empty body.
pub fn encode_subscribe(id: &str, destination: &str) -> String {
    Frame::new(Command::Subscribe)
        .header("id", id)
        .header("destination", destination)
        .encode()
}

/// Builds a SEND frame whose body is `payload` rendered as JSON.
///
/// `headers` follow `destination` in the given order.
pub fn encode_send<T: Serialize + ?Sized>(
    destination: &str,
    headers: &[(&str, &str)],
    payload: &T,
) -> Result<String, serde_json::Error> {
    let body = serde_json::to_string(payload)?;
    let frame = headers
        .iter()
        .fold(
            Frame::new(Command::Send).header("destination", destination),
            |frame, (name, value)| frame.header(*name, *value),
        )
        .body(body);
    Ok(frame.encode())
}
