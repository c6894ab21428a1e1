use std::{fmt, io};

/// Errors produced by the message decoder and encoder.
///
/// Decoding errors ([`Error::Truncated`], [`Error::MalformedName`]) are caused by the peer and can
/// be answered or ignored. The remaining errors are raised by the encoder when the [`Response`]
/// handed to it is inconsistent, and indicate a bug in the code that built it.
///
/// [`Response`]: super::Response
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum Error {
    /// The end of the message was reached while more data was expected.
    Truncated,
    /// A domain name in the message is invalid: a label length runs past the end of the message,
    /// exceeds 63 bytes, uses the reserved or pointer bits, or the whole name exceeds 255 bytes.
    MalformedName,
    /// A header section count does not match the number of entries in that section.
    CountMismatch,
    /// An answer refers to a name that does not occur in the *Question* section, so no compression
    /// pointer can be emitted for it.
    UnknownNameReference,
    /// A name was placed at an offset that a compression pointer cannot address.
    OffsetOverflow,
    /// A numeric value does not fit into its field on the wire.
    ValueOutOfRange,
    /// An empty label was encountered where it is not allowed.
    InvalidEmptyLabel,
    /// A label exceeded the maximum allowable length of a label.
    LabelTooLong,
}

impl Error {
    fn description(&self) -> &str {
        match self {
            Error::Truncated => "unexpected end of message",
            Error::MalformedName => "malformed domain name",
            Error::CountMismatch => "section count does not match number of entries",
            Error::UnknownNameReference => "answer name does not occur in question section",
            Error::OffsetOverflow => "name offset not addressable by a compression pointer",
            Error::ValueOutOfRange => "value does not fit its wire field",
            Error::InvalidEmptyLabel => "invalid empty label",
            Error::LabelTooLong => "label too long",
        }
    }

    /// Returns whether this error was caused by the contents of a received message, as opposed to
    /// a bug in the code building an outgoing one.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Error::Truncated | Error::MalformedName)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for Error {}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Truncated => io::ErrorKind::UnexpectedEof.into(),
            Error::MalformedName => io::Error::new(
                io::ErrorKind::InvalidData,
                "malformed domain name; this may indicate a malicious request",
            ),
            Error::InvalidEmptyLabel => io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid empty label in domain name",
            ),
            Error::LabelTooLong => io::Error::new(
                io::ErrorKind::InvalidInput,
                "domain name label exceeds maximum label length",
            ),
            Error::CountMismatch
            | Error::UnknownNameReference
            | Error::OffsetOverflow
            | Error::ValueOutOfRange => io::Error::new(io::ErrorKind::InvalidInput, e),
        }
    }
}
