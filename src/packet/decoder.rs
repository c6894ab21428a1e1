//! DNS query decoder.

use std::{cmp, mem::size_of};

use bytemuck::AnyBitPattern;

use crate::num::U16;

use super::{
    name::{Label, Name},
    Error, Header, Query, QueryClass, QueryType, Request,
};

/// Smallest possible *Question* entry: the root name, type and class.
const MIN_QUESTION_LEN: usize = 1 + 2 + 2;

/// Bounds-checked cursor over a received message.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns the unread rest of the message.
    pub(crate) fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub(crate) fn read_obj<T: AnyBitPattern>(&mut self) -> Result<T, Error> {
        let bytes = self.read_slice(size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(len).ok_or(Error::Truncated)?;
        match self.buf.get(self.pos..end) {
            Some(slice) => {
                self.pos = end;
                Ok(slice)
            }
            None => Err(Error::Truncated),
        }
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        self.read_obj::<u8>()
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(self.read_obj::<U16>()?.get())
    }

    /// Reads an uncompressed `<domain-name>`.
    ///
    /// Compression pointers are not followed: queries carry a single name per question, so
    /// there is nothing to point back to. A pointer is rejected like any other label length
    /// above 63.
    pub(crate) fn read_name(&mut self) -> Result<Name, Error> {
        let mut name = Name::ROOT;
        loop {
            let length = self.read_u8()?;
            if length == 0 {
                break;
            }
            if length & 0b1100_0000 != 0 {
                return Err(Error::MalformedName);
            }

            let label = self
                .read_slice(length.into())
                .map_err(|_| Error::MalformedName)?;
            let label = Label::try_new(label).map_err(|_| Error::MalformedName)?;
            name.push_label(label)?;
        }
        Ok(name)
    }

    fn read_query(&mut self) -> Result<Query, Error> {
        let name = self.read_name()?;
        let ty = QueryType(self.read_u16()?);
        let class = QueryClass(self.read_u16()?);
        Ok(Query::new(name).ty(ty).class(class))
    }
}

/// Decodes a query message.
///
/// Exactly as many questions as the header announces are read; anything after them (including
/// records in the other sections) is ignored. Every read is bounds-checked, so malformed or
/// malicious input results in an [`Error`], never in a panic.
pub fn decode(msg: &[u8]) -> Result<Request, Error> {
    let mut r = Reader::new(msg);
    let header = r.read_obj::<Header>()?;
    log::trace!("header: {:?}", header);

    // Don't let a forged count make us allocate more than the message could possibly hold.
    let qdcount = usize::from(header.question_count());
    let mut queries = Vec::with_capacity(cmp::min(
        qdcount,
        r.remaining().len() / MIN_QUESTION_LEN,
    ));
    for _ in 0..qdcount {
        let query = r.read_query()?;
        log::debug!("Q: {}", query);
        queries.push(query);
    }

    Ok(Request { header, queries })
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use crate::{
        hex,
        packet::{encode, Response},
    };

    use super::*;

    const EXAMPLE_COM: &str = "
        1234 0100 0001 0000 0000 0000
        07 6578616d706c65 03 636f6d 00
        0001 0001
    ";

    #[test]
    fn decode_name() {
        let mut r = Reader::new(&[
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0,
        ]);
        let name = r.read_name().unwrap();
        assert_eq!(name.to_string(), "example.com.");
        assert_eq!(r.read_u8(), Err(Error::Truncated), "should be at EOF");

        let mut r = Reader::new(&[0]);
        assert_eq!(r.read_name().unwrap(), Name::ROOT);
    }

    #[test]
    fn decode_example_com() {
        let msg = hex::parse(EXAMPLE_COM);
        let req = decode(&msg).unwrap();
        assert_eq!(req.id(), 0x1234);
        assert_eq!(req.raw_flags(), 0x0100);
        assert!(!req.is_truncated());
        assert!(req.is_recursion_desired());
        assert_eq!(req.header().question_count(), 1);
        assert_eq!(req.header().answer_count(), 0);
        assert_eq!(req.header().authority_count(), 0);
        assert_eq!(req.header().additional_count(), 0);
        expect![[r#"
            [
                Query {
                    name: example.com.,
                    ty: A,
                    class: IN,
                },
            ]
        "#]]
        .assert_debug_eq(&req.queries());
    }

    #[test]
    fn unknown_type_and_class_are_kept() {
        let msg = hex::parse("0001 0000 0001 0000 0000 0000 01 61 00 1234 00ff");
        let req = decode(&msg).unwrap();
        let q = req.first_query().unwrap();
        assert_eq!(q.query_type().value(), 0x1234);
        assert_eq!(q.query_class(), QueryClass::ANY);
    }

    #[test]
    fn flag_isolation() {
        let req = decode(&hex::parse("0000 0200 0000 0000 0000 0000")).unwrap();
        assert!(req.is_truncated());
        assert!(!req.is_recursion_desired());

        let req = decode(&hex::parse("0000 0100 0000 0000 0000 0000")).unwrap();
        assert!(!req.is_truncated());
        assert!(req.is_recursion_desired());
    }

    #[test]
    fn header_id_roundtrip() {
        for id in 0..=u16::MAX {
            let msg = encode(&Response::new(id)).unwrap();
            let req = decode(&msg).unwrap();
            assert_eq!(req.id(), id);
        }
    }

    #[test]
    fn every_prefix_fails() {
        let msg = hex::parse(EXAMPLE_COM);
        for len in 0..msg.len() {
            let err = decode(&msg[..len]).unwrap_err();
            assert!(err.is_decode_error(), "prefix of {} bytes: {:?}", len, err);
            if len < Header::LEN {
                assert_eq!(err, Error::Truncated);
            }
        }
        // Cut inside the "example" label.
        assert_eq!(decode(&msg[..15]), Err(Error::MalformedName));
        // Cut right before the type.
        assert_eq!(decode(&msg[..25]), Err(Error::Truncated));
    }

    #[test]
    fn label_past_end() {
        let msg = hex::parse("0000 0000 0001 0000 0000 0000 3f 6162");
        assert_eq!(decode(&msg), Err(Error::MalformedName));
    }

    #[test]
    fn pointers_and_reserved_lengths_are_rejected() {
        let msg = hex::parse("0000 0000 0001 0000 0000 0000 c00c 0001 0001");
        assert_eq!(decode(&msg), Err(Error::MalformedName));

        let msg = hex::parse("0000 0000 0001 0000 0000 0000 40");
        assert_eq!(decode(&msg), Err(Error::MalformedName));
    }

    #[test]
    fn overlong_name() {
        let mut msg = hex::parse("0000 0000 0001 0000 0000 0000");
        for _ in 0..4 {
            msg.push(63);
            msg.extend_from_slice(&[b'x'; 63]);
        }
        msg.extend_from_slice(&[0, 0, 1, 0, 1]);
        assert_eq!(decode(&msg), Err(Error::MalformedName));
    }

    #[test]
    fn forged_question_count() {
        let mut msg = hex::parse(EXAMPLE_COM);
        msg[4] = 0xff;
        msg[5] = 0xff;
        assert_eq!(decode(&msg), Err(Error::Truncated));
    }

    #[test]
    fn trailing_data_is_ignored() {
        let mut msg = hex::parse(EXAMPLE_COM);
        // Claim one additional record and append garbage for it.
        msg[11] = 1;
        msg.extend_from_slice(&[0xc0, 0x0c, 0xde, 0xad]);
        let req = decode(&msg).unwrap();
        assert_eq!(req.queries().len(), 1);
        assert_eq!(req.header().additional_count(), 1);
    }
}
