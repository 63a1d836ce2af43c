use serde::Deserialize;

use super::frame::{Command, Frame, FrameError};

/// How inbound text messages are turned into JSON payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramingMode {
    /// Parse the frame and use its body. Malformed frames are rejected.
    Strict,
    /// Scan the raw text with [`extract_json`], ignoring the framing.
    Lenient,
    /// Strict first, lenient when the frame does not parse.
    #[default]
    Auto,
}

/// What an inbound text message carries for the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// JSON text still to be decoded.
    Json(String),
    /// An ERROR frame without a JSON body; holds its human readable message.
    BrokerError(String),
    /// Control frame, heart-beat or text with no JSON in it.
    Nothing,
}

/// Finds the JSON object embedded in a raw inbound message.
///
/// The scan works line by line. On the first line that holds a `{` with a
/// `}` somewhere after it, the returned slice runs from that first `{` to the
/// *last* `}` of the line. The match is greedy: trailing text after the last
/// brace is dropped, but two objects written back to back on one line are
/// returned together and will not decode. Objects spread over several lines
/// are not matched.
pub fn extract_json(raw: &str) -> Option<&str> {
    raw.split('\n').find_map(|line| {
        let start = line.find('{')?;
        let end = line.rfind('}')?;
        (end > start).then(|| &line[start..=end])
    })
}

/// Resolves the payload of one inbound message according to `mode`.
///
/// Only `FramingMode::Strict` can fail; `Auto` falls back to the lenient scan
/// instead of reporting the parse error.
pub fn inbound_payload(raw: &str, mode: FramingMode) -> Result<Inbound, FrameError> {
    if raw.trim_matches(['\r', '\n', '\0']).is_empty() {
        return Ok(Inbound::Nothing);
    }
    match mode {
        FramingMode::Lenient => Ok(lenient(raw)),
        FramingMode::Strict => strict(raw),
        FramingMode::Auto => Ok(strict(raw).unwrap_or_else(|_| lenient(raw))),
    }
}

fn lenient(raw: &str) -> Inbound {
    extract_json(raw).map_or(Inbound::Nothing, |json| Inbound::Json(json.to_string()))
}

fn strict(raw: &str) -> Result<Inbound, FrameError> {
    let frame = Frame::parse(raw)?;
    let body = frame.body.as_deref().map(str::trim).filter(|b| !b.is_empty());

    if frame.command == Command::Error && !body.is_some_and(|b| b.starts_with('{')) {
        let message = frame
            .get_header("message")
            .or(body)
            .unwrap_or("broker reported an error");
        return Ok(Inbound::BrokerError(message.to_string()));
    }

    Ok(body.map_or(Inbound::Nothing, |b| Inbound::Json(b.to_string())))
}
