//! DNS response encoder.

use std::collections::HashMap;

use bytemuck::NoUninit;

use super::{name::Name, Answer, Error, Header, Query, Response};

/// Largest offset a compression pointer can refer to (14 bits).
const MAX_POINTER_OFFSET: usize = 0x3fff;
const POINTER_TAG: u16 = 0b1100_0000 << 8;
const POINTER_LEN: usize = 2;

/// Fixed part of an answer record after its name: type, class, TTL and RDATA length.
const RR_FIXED_LEN: usize = 2 + 2 + 4 + 2;

pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Current write position, which is also the offset of the next byte in the message.
    #[inline]
    pub(crate) fn pos(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn write_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub(crate) fn write_obj<T: NoUninit>(&mut self, obj: T) {
        self.write_slice(bytemuck::bytes_of(&obj))
    }

    pub(crate) fn write_u8(&mut self, b: u8) {
        self.buf.push(b);
    }

    pub(crate) fn write_u16(&mut self, v: u16) {
        self.write_slice(&v.to_be_bytes());
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_slice(&v.to_be_bytes());
    }

    pub(crate) fn write_name(&mut self, name: &Name) {
        for label in name.labels() {
            // `Label` guarantees at most 63 bytes.
            self.write_u8(label.as_bytes().len() as u8);
            self.write_slice(label.as_bytes());
        }
        // Implicit root label at the end.
        self.write_u8(0);
    }

    /// Writes a compression pointer to the name starting at `offset`.
    pub(crate) fn write_pointer(&mut self, offset: usize) -> Result<(), Error> {
        if offset > MAX_POINTER_OFFSET {
            return Err(Error::OffsetOverflow);
        }
        self.write_u16(POINTER_TAG | offset as u16);
        Ok(())
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Offsets of the names written so far, for compression.
///
/// Names are looked up by value, so an answer matches a question whenever their labels are equal,
/// no matter where either [`Name`] came from. Lives for a single [`encode`] call.
struct NameOffsets<'a> {
    offsets: HashMap<&'a Name, usize>,
}

impl<'a> NameOffsets<'a> {
    fn new() -> Self {
        Self {
            offsets: HashMap::new(),
        }
    }

    /// Records that `name` starts at `offset`, unless it was already written earlier.
    fn register(&mut self, name: &'a Name, offset: usize) {
        self.offsets.entry(name).or_insert(offset);
    }

    fn lookup(&self, name: &Name) -> Result<usize, Error> {
        self.offsets
            .get(name)
            .copied()
            .ok_or(Error::UnknownNameReference)
    }
}

/// Returns the exact number of bytes [`encode`] will produce for `response`.
pub fn encoded_len(response: &Response) -> usize {
    let questions: usize = response
        .queries()
        .iter()
        .map(|q| q.name().wire_len() + 4)
        .sum();
    let answers: usize = response
        .answers()
        .iter()
        .map(|a| POINTER_LEN + RR_FIXED_LEN + a.address().as_bytes().len())
        .sum();
    Header::LEN + questions + answers
}

fn check_counts(response: &Response) -> Result<(), Error> {
    let h = response.header();
    if usize::from(h.question_count()) != response.queries().len()
        || usize::from(h.answer_count()) != response.answers().len()
        || h.authority_count() != 0
        || h.additional_count() != 0
    {
        log::error!(
            "response counts {:?} do not match its sections ({} queries, {} answers)",
            h,
            response.queries().len(),
            response.answers().len(),
        );
        return Err(Error::CountMismatch);
    }
    Ok(())
}

/// Answers are address records, so the address must be exactly as long as its record type says.
fn check_address(answer: &Answer) -> Result<(), Error> {
    let len = answer.address().as_bytes().len();
    if answer.record_type().address_len() != Some(len) {
        log::error!(
            "{} record cannot hold the {}-byte address {}",
            answer.record_type(),
            len,
            answer.address(),
        );
        return Err(Error::ValueOutOfRange);
    }
    Ok(())
}

/// Encodes a response message.
///
/// Every answer's name is written as a compression pointer to the identical name in the
/// *Question* section, so each answer must be for one of the queried names. The *Authority* and
/// *Additional* sections are always empty. Only `A` and `AAAA` answers with an address of the
/// matching length can be encoded.
///
/// Errors returned here mean `response` was built inconsistently; nothing is written in that case.
pub fn encode(response: &Response) -> Result<Vec<u8>, Error> {
    check_counts(response)?;
    for answer in response.answers() {
        check_address(answer)?;
    }

    let len = encoded_len(response);
    let mut w = Writer::with_capacity(len);
    let mut names = NameOffsets::new();

    let mut header = *response.header();
    header.clear_reserved();
    w.write_obj(header);

    for query in response.queries() {
        write_query(&mut w, &mut names, query);
    }
    for answer in response.answers() {
        write_answer(&mut w, &names, answer)?;
    }

    debug_assert_eq!(w.pos(), len);
    Ok(w.finish())
}

fn write_query<'a>(w: &mut Writer, names: &mut NameOffsets<'a>, query: &'a Query) {
    names.register(query.name(), w.pos());
    w.write_name(query.name());
    w.write_u16(query.query_type().value());
    w.write_u16(query.query_class().value());
}

fn write_answer(w: &mut Writer, names: &NameOffsets<'_>, answer: &Answer) -> Result<(), Error> {
    w.write_pointer(names.lookup(answer.name())?)?;
    w.write_u16(answer.record_type().value());
    w.write_u16(answer.record_class().value());
    w.write_u32(answer.ttl());
    let rdata = answer.address().as_bytes();
    // Checked in `encode`.
    w.write_u16(rdata.len() as u16);
    w.write_slice(rdata);
    Ok(())
}
