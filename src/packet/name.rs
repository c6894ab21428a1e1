//! Domain names and labels.

use std::{
    fmt::{self, Write},
    slice,
    str::FromStr,
    vec,
};

use super::Error;

/// A `.`-separated component of a [`Name`].
///
/// Labels consist of arbitrary bytes and have a maximum length of 63 bytes. This type can only
/// represent non-empty labels, since a zero length byte terminates a name on the wire.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    // Guaranteed to contain >0 and at most `Label::MAX_LEN` bytes.
    bytes: Box<[u8]>,
}

impl Label {
    /// The maximum length of a domain label.
    pub const MAX_LEN: usize = 0b0011_1111;

    /// Creates a [`Label`] from raw bytes or a string slice, panicking if the bytes are an invalid
    /// label.
    ///
    /// # Panics
    ///
    /// This function will panic if `bytes` is empty or contains more than [`Self::MAX_LEN`] bytes.
    pub fn new(label: impl AsRef<[u8]>) -> Self {
        Self::new_impl(label.as_ref())
    }

    fn new_impl(label: &[u8]) -> Self {
        Self::try_new(label)
            .unwrap_or_else(|_| panic!("`Label::new` called with invalid data: {:?}", label))
    }

    /// Creates a [`Label`] from raw bytes or a string slice, returning an error if the bytes are
    /// an invalid label.
    pub fn try_new(label: impl AsRef<[u8]>) -> Result<Self, Error> {
        let label = label.as_ref();
        if label.is_empty() {
            return Err(Error::InvalidEmptyLabel);
        }

        if label.len() > Self::MAX_LEN {
            return Err(Error::LabelTooLong);
        }

        Ok(Self {
            bytes: label.into(),
        })
    }

    /// Returns the raw bytes of this label.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of bytes this label occupies on the wire, including its length byte.
    #[inline]
    fn wire_len(&self) -> usize {
        1 + self.bytes.len()
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r#""{}""#, self.as_bytes().escape_ascii())
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_bytes().escape_ascii().fmt(f)
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_new(s)
    }
}

/// A domain name, represented as a list of [`Label`]s, most significant label first.
///
/// On the wire, names are terminated by an empty label; this type omits that label. Equality and
/// hashing compare the label bytes, so two names built independently from the same labels are the
/// same name.
#[derive(PartialEq, Eq, Hash, Clone)]
pub struct Name {
    // Does not include the trailing empty label.
    labels: Vec<Label>,
}

impl Name {
    /// The empty root domain `.`.
    pub const ROOT: Self = Self { labels: Vec::new() };

    /// The maximum length of an encoded name, including all length bytes and the terminator.
    pub const MAX_WIRE_LEN: usize = 255;

    /// Parses a name as a string of `.`-separated labels.
    ///
    /// A trailing `.` is allowed but not required.
    pub fn from_str(s: &str) -> Result<Self, Error> {
        s.parse()
    }

    /// Returns the labels making up this name.
    #[inline]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Appends a [`Label`] to the end of this name.
    ///
    /// Fails with [`Error::MalformedName`] if the encoded name would exceed
    /// [`Name::MAX_WIRE_LEN`] bytes.
    pub fn push_label(&mut self, label: Label) -> Result<(), Error> {
        if self.wire_len() + label.wire_len() > Self::MAX_WIRE_LEN {
            return Err(Error::MalformedName);
        }
        self.labels.push(label);
        Ok(())
    }

    /// Returns the number of bytes this name occupies when written uncompressed.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(Label::wire_len).sum::<usize>() + 1
    }
}

impl TryFrom<Vec<Label>> for Name {
    type Error = Error;

    fn try_from(labels: Vec<Label>) -> Result<Self, Error> {
        let mut name = Name::ROOT;
        for label in labels {
            name.push_label(label)?;
        }
        Ok(name)
    }
}

impl IntoIterator for Name {
    type Item = Label;
    type IntoIter = vec::IntoIter<Label>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.labels.into_iter()
    }
}

impl<'a> IntoIterator for &'a Name {
    type Item = &'a Label;
    type IntoIter = slice::Iter<'a, Label>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.labels.iter()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_char('.');
        }
        for label in &self.labels {
            label.fmt(f)?;
            f.write_char('.')?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "." {
            // `split_terminator` returns an empty label for this, so special-case it
            return Ok(Self::ROOT);
        }

        let mut name = Name::ROOT;
        for label in s.split_terminator('.') {
            name.push_label(label.parse()?)?;
        }
        Ok(name)
    }
}
