//! Frame encoding and response classification for the plate shuttle protocol.
//!
//! Every request and every response is an ASCII string terminated by a
//! single carriage return. There is no length prefix and no escaping.
//!
//! Two reply shapes are understood beyond raw text:
//!
//! | Shape          | Meaning                 | Decoded as        |
//! |----------------|-------------------------|-------------------|
//! | `ok <hex>`     | command accepted        | [`DeviceStatus`]  |
//! | `er <code>`    | device-reported fault   | [`DeviceError`]   |
//! | `<tag> <data>` | reply to `ch:<tag>`     | payload string    |
//!
//! Nothing in this module performs I/O.

use platelink_core::error::{CommunicationError, Error, Result};
use platelink_core::status::{DeviceError, DeviceStatus, ErrorCodeBase, ErrorCodeTable};

/// The carriage-return byte that terminates every frame.
pub const TERMINATOR: u8 = b'\r';

/// Prefix of a successful action reply.
pub const OK_PREFIX: &str = "ok";

/// Prefix of a device error reply.
pub const ERROR_PREFIX: &str = "er";

/// Prefix every status query command starts with.
pub const STATUS_COMMAND_PREFIX: &str = "ch:";

/// Encode a command as a wire frame: the ASCII bytes followed by `\r`.
///
/// Commands containing non-ASCII characters or an embedded carriage return
/// cannot be framed and are rejected with [`Error::InvalidCommand`].
///
/// ```
/// use platelink_text_io::protocol::encode_command;
///
/// assert_eq!(encode_command("ch:bs").unwrap(), b"ch:bs\r");
/// assert!(encode_command("ch:bs\rll:in").is_err());
/// ```
pub fn encode_command(command: &str) -> Result<Vec<u8>> {
    if !command.is_ascii() {
        return Err(Error::InvalidCommand(format!(
            "command {command:?} contains non-ASCII characters"
        )));
    }
    if command.as_bytes().contains(&TERMINATOR) {
        return Err(Error::InvalidCommand(format!(
            "command {command:?} contains an embedded carriage return"
        )));
    }

    let mut frame = Vec::with_capacity(command.len() + 1);
    frame.extend_from_slice(command.as_bytes());
    frame.push(TERMINATOR);
    Ok(frame)
}

/// Decode a raw response frame into its text.
///
/// `raw` is the bytes read up to and including the terminator; a trailing
/// terminator is removed. Non-ASCII content is a protocol violation and is
/// reported together with the command that provoked it.
pub fn decode_response(command: &str, raw: &[u8]) -> Result<String> {
    let body = raw.strip_suffix(&[TERMINATOR]).unwrap_or(raw);

    if !body.is_ascii() {
        return Err(Error::Communication(CommunicationError::NonAsciiResponse {
            command: command.to_string(),
            raw: body.to_vec(),
        }));
    }

    // ASCII is valid UTF-8.
    Ok(body.iter().map(|&b| b as char).collect())
}

/// Check that `response` starts with `expected_prefix`, then return the
/// rest with surrounding whitespace removed.
///
/// This is where "did the device answer the question we asked" is decided.
///
/// ```
/// use platelink_text_io::protocol::check_prefix_and_strip;
///
/// assert_eq!(check_prefix_and_strip("bs 01", "bs").unwrap(), "01");
/// assert!(check_prefix_and_strip("tp 01", "bs").is_err());
/// ```
pub fn check_prefix_and_strip<'a>(response: &'a str, expected_prefix: &str) -> Result<&'a str> {
    match response.strip_prefix(expected_prefix) {
        Some(rest) => Ok(rest.trim()),
        None => Err(Error::UnexpectedResponse {
            expected: format!("prefix {expected_prefix:?}"),
            response: response.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Action replies
// ---------------------------------------------------------------------------

/// Classified reply to a state-changing (action) command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionReply {
    /// `ok <hex>`: the command was accepted; carries the resulting status.
    Ok(DeviceStatus),
    /// `er <code>`: the device refused or failed the command.
    Err(DeviceError),
    /// Neither shape. Carries the response verbatim.
    Unrecognized(String),
}

impl ActionReply {
    /// Classify a response string.
    ///
    /// A recognized prefix followed by a payload that does not parse (e.g.
    /// `ok zz`) is an [`Error::UnexpectedResponse`], not an
    /// [`ActionReply::Unrecognized`].
    pub fn classify(
        response: &str,
        base: ErrorCodeBase,
        table: &dyn ErrorCodeTable,
    ) -> Result<Self> {
        if response.starts_with(OK_PREFIX) {
            let payload = check_prefix_and_strip(response, OK_PREFIX)?;
            let status = DeviceStatus::from_hex_str(payload).map_err(|e| {
                Error::UnexpectedResponse {
                    expected: format!("'ok XX' with a hex status ({e})"),
                    response: response.to_string(),
                }
            })?;
            return Ok(ActionReply::Ok(status));
        }

        if response.starts_with(ERROR_PREFIX) {
            let payload = check_prefix_and_strip(response, ERROR_PREFIX)?;
            let error = DeviceError::parse(payload, base, table).map_err(|e| {
                Error::UnexpectedResponse {
                    expected: format!("'er XX' with an error code ({e})"),
                    response: response.to_string(),
                }
            })?;
            return Ok(ActionReply::Err(error));
        }

        Ok(ActionReply::Unrecognized(response.to_string()))
    }

    /// Turn the reply into the status on success, or the matching error.
    pub fn into_status(self) -> Result<DeviceStatus> {
        match self {
            ActionReply::Ok(status) => Ok(status),
            ActionReply::Err(error) => Err(Error::Communication(CommunicationError::Device(error))),
            ActionReply::Unrecognized(response) => Err(Error::UnexpectedResponse {
                expected: "'ok XX' or 'er XX'".into(),
                response,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Status queries
// ---------------------------------------------------------------------------

/// A validated status query command: `ch:` + two lowercase letters +
/// optional trailer.
///
/// The device echoes the two-letter tag at the start of its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusQuery<'a> {
    command: &'a str,
    tag: &'a str,
}

impl<'a> StatusQuery<'a> {
    /// Validate `command` against `ch:[a-z]{2}.*`.
    ///
    /// The trailer may hold anything except a line break.
    ///
    /// ```
    /// use platelink_text_io::protocol::StatusQuery;
    ///
    /// assert_eq!(StatusQuery::parse("ch:bs").unwrap().tag(), "bs");
    /// assert_eq!(StatusQuery::parse("ch:tp 1").unwrap().tag(), "tp");
    /// assert!(StatusQuery::parse("chbs").is_err());
    /// assert!(StatusQuery::parse("ch:BS").is_err());
    /// ```
    pub fn parse(command: &'a str) -> Result<Self> {
        let invalid = || {
            Error::InvalidCommand(format!(
                "expected command like 'ch:xx' or 'ch:xx ...', got {command:?}"
            ))
        };

        let rest = command
            .strip_prefix(STATUS_COMMAND_PREFIX)
            .ok_or_else(invalid)?;
        let bytes = rest.as_bytes();
        if bytes.len() < 2 || !bytes[0].is_ascii_lowercase() || !bytes[1].is_ascii_lowercase() {
            return Err(invalid());
        }
        if rest[2..].contains('\n') {
            return Err(invalid());
        }

        Ok(StatusQuery {
            command,
            tag: &rest[..2],
        })
    }

    /// The full command as given.
    pub fn command(&self) -> &'a str {
        self.command
    }

    /// The two-letter tag the reply is expected to start with.
    pub fn tag(&self) -> &'a str {
        self.tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platelink_core::status::{NoDescriptions, StaticErrorTable};

    fn classify(response: &str) -> Result<ActionReply> {
        ActionReply::classify(response, ErrorCodeBase::Hex, &NoDescriptions)
    }

    // -----------------------------------------------------------------------
    // encode_command / decode_response
    // -----------------------------------------------------------------------

    #[test]
    fn encode_appends_single_terminator() {
        assert_eq!(encode_command("mv:st 001").unwrap(), b"mv:st 001\r");
    }

    #[test]
    fn encode_empty_command() {
        assert_eq!(encode_command("").unwrap(), b"\r");
    }

    #[test]
    fn encode_rejects_embedded_cr() {
        assert!(matches!(
            encode_command("ch:bs\r"),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn encode_rejects_non_ascii() {
        assert!(matches!(
            encode_command("ch:bß"),
            Err(Error::InvalidCommand(_))
        ));
    }

    #[test]
    fn decode_strips_terminator() {
        assert_eq!(decode_response("ch:bs", b"bs 01\r").unwrap(), "bs 01");
    }

    #[test]
    fn decode_without_terminator_keeps_body() {
        assert_eq!(decode_response("ch:bs", b"bs 01").unwrap(), "bs 01");
    }

    #[test]
    fn decode_empty_frame() {
        assert_eq!(decode_response("x", b"\r").unwrap(), "");
    }

    #[test]
    fn decode_non_ascii_is_communication_error() {
        let err = decode_response("ch:bs", &[b'b', 0xC3, 0xA9, TERMINATOR]).unwrap_err();
        match err {
            Error::Communication(CommunicationError::NonAsciiResponse { command, raw }) => {
                assert_eq!(command, "ch:bs");
                assert_eq!(raw, vec![b'b', 0xC3, 0xA9]);
            }
            other => panic!("expected NonAsciiResponse, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // check_prefix_and_strip
    // -----------------------------------------------------------------------

    #[test]
    fn prefix_strip_trims_whitespace() {
        assert_eq!(check_prefix_and_strip("ok  05 ", "ok").unwrap(), "05");
    }

    #[test]
    fn prefix_strip_whole_response() {
        assert_eq!(check_prefix_and_strip("bs", "bs").unwrap(), "");
    }

    #[test]
    fn prefix_strip_mismatch_names_both() {
        let err = check_prefix_and_strip("tp 37", "bs").unwrap_err();
        match err {
            Error::UnexpectedResponse { expected, response } => {
                assert!(expected.contains("bs"));
                assert_eq!(response, "tp 37");
            }
            other => panic!("expected UnexpectedResponse, got {other:?}"),
        }
    }

    #[test]
    fn prefix_strip_is_repeatable() {
        for _ in 0..3 {
            assert_eq!(check_prefix_and_strip("bs 01", "bs").unwrap(), "01");
            assert!(check_prefix_and_strip("xyz", "bs").is_err());
        }
    }

    // -----------------------------------------------------------------------
    // ActionReply
    // -----------------------------------------------------------------------

    #[test]
    fn classify_ok() {
        let reply = classify("ok 05").unwrap();
        assert_eq!(reply, ActionReply::Ok(DeviceStatus::from_hex_str("05").unwrap()));
        assert_eq!(reply.into_status().unwrap().bits(), 5);
    }

    #[test]
    fn classify_er_hex() {
        let reply = classify("er 1A").unwrap();
        let ActionReply::Err(ref dev) = reply else {
            panic!("expected ActionReply::Err, got {reply:?}");
        };
        assert_eq!(dev.code(), 0x1A);

        let err = reply.into_status().unwrap_err();
        assert_eq!(err.device_error().map(|d| d.code()), Some(0x1A));
    }

    #[test]
    fn classify_er_decimal_with_table() {
        static TABLE: StaticErrorTable = StaticErrorTable(&[(12, "handler blocked")]);
        let reply = ActionReply::classify("er 12", ErrorCodeBase::Decimal, &TABLE).unwrap();
        match reply {
            ActionReply::Err(dev) => {
                assert_eq!(dev.code(), 12);
                assert_eq!(dev.description(), Some("handler blocked"));
            }
            other => panic!("expected ActionReply::Err, got {other:?}"),
        }
    }

    #[test]
    fn classify_unrecognized() {
        let reply = classify("xyz").unwrap();
        assert_eq!(reply, ActionReply::Unrecognized("xyz".into()));
        assert!(matches!(
            reply.into_status(),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn classify_ok_with_bad_status_is_unexpected() {
        assert!(matches!(
            classify("ok zz"),
            Err(Error::UnexpectedResponse { .. })
        ));
        assert!(matches!(
            classify("ok"),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn classify_er_with_bad_code_is_unexpected() {
        assert!(matches!(
            classify("er ??"),
            Err(Error::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn classify_is_case_sensitive() {
        assert_eq!(classify("OK 05").unwrap(), ActionReply::Unrecognized("OK 05".into()));
    }

    // -----------------------------------------------------------------------
    // StatusQuery
    // -----------------------------------------------------------------------

    #[test]
    fn status_query_accepts_bare_and_trailer() {
        let q = StatusQuery::parse("ch:bs").unwrap();
        assert_eq!(q.tag(), "bs");
        assert_eq!(q.command(), "ch:bs");

        let q = StatusQuery::parse("ch:pc 001").unwrap();
        assert_eq!(q.tag(), "pc");
    }

    #[test]
    fn status_query_rejects_missing_colon() {
        assert!(matches!(StatusQuery::parse("chbs"), Err(Error::InvalidCommand(_))));
    }

    #[test]
    fn status_query_rejects_short_or_uppercase_tag() {
        assert!(StatusQuery::parse("ch:").is_err());
        assert!(StatusQuery::parse("ch:b").is_err());
        assert!(StatusQuery::parse("ch:Bs").is_err());
        assert!(StatusQuery::parse("ch:b1").is_err());
    }

    #[test]
    fn status_query_rejects_line_feed_in_trailer() {
        assert!(StatusQuery::parse("ch:bs\nll:in").is_err());
    }

    #[test]
    fn status_query_rejects_other_prefix() {
        assert!(StatusQuery::parse("mv:bs").is_err());
        assert!(StatusQuery::parse(" ch:bs").is_err());
    }
}
