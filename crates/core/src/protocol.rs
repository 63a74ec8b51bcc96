//! Codecs between [`StructuredMessage`] and the text exchanged with the
//! model.
//!
//! The model is few-shot prompted on the exact wire shape of the selected
//! protocol, so tag names, key names and field order are part of the
//! contract and must not drift.

mod json;
mod tagged;

use std::fmt::{self, Display};
use std::io;
use std::str::FromStr;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

use crate::message::StructuredMessage;
pub use json::JsonProtocol;
pub use tagged::TaggedProtocol;

/// The error returned when reply text cannot be turned into a message.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct ParseError {
    reason: String,
}

impl ParseError {
    #[inline]
    pub(crate) fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns why the text was rejected.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A wire format for structured messages.
pub trait ConversationProtocol: Send + Sync {
    /// Returns the format description shown to the model in the system
    /// prompt.
    fn schema_example(&self) -> &str;

    /// Parses reply text into a message.
    ///
    /// Fails only when the outer structure is unrecoverable; damaged inner
    /// fields degrade instead.
    fn parse(&self, text: &str) -> Result<StructuredMessage, ParseError>;

    /// Renders a message as wire text. `pretty` spreads the output over
    /// several lines.
    fn serialize(&self, message: &StructuredMessage, pretty: bool) -> String;
}

/// Identifies one of the built-in protocols.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProtocolKind {
    /// Tag-delimited fields, see [`TaggedProtocol`].
    Tagged,
    /// A single JSON object, see [`JsonProtocol`].
    #[default]
    Json,
}

impl ProtocolKind {
    /// Builds a protocol instance of this kind.
    pub fn build(self) -> Box<dyn ConversationProtocol> {
        match self {
            ProtocolKind::Tagged => Box::new(TaggedProtocol::new()),
            ProtocolKind::Json => Box::new(JsonProtocol::new()),
        }
    }
}

impl Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Tagged => write!(f, "tagged"),
            ProtocolKind::Json => write!(f, "json"),
        }
    }
}

/// The error returned when a protocol name is not recognized.
#[derive(Debug, thiserror::Error)]
#[error("unknown protocol `{0}`, expected `tagged` or `json`")]
pub struct UnknownProtocolError(String);

impl FromStr for ProtocolKind {
    type Err = UnknownProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tagged" | "tag" | "xml" => Ok(ProtocolKind::Tagged),
            "json" => Ok(ProtocolKind::Json),
            _ => Err(UnknownProtocolError(s.to_owned())),
        }
    }
}

/// Single-line JSON with a space after every `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    #[inline]
    fn begin_array_value<W>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            return Ok(());
        }
        writer.write_all(b", ")
    }

    #[inline]
    fn begin_object_key<W>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            return Ok(());
        }
        writer.write_all(b", ")
    }

    #[inline]
    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serializes `value` on one line, as `{"a": [1, 2], "b": null}`.
pub(crate) fn to_spaced_json<T>(value: &T) -> serde_json::Result<String>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|err| {
        serde_json::Error::io(io::Error::new(io::ErrorKind::InvalidData, err))
    })
}
