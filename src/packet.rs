//! DNS message decoder and encoder.
//!
//! Only the subset of the protocol this server speaks is supported: queries are decoded into a
//! [`Request`] (header and *Question* section), and a [`Response`] (header, *Question* and
//! *Answer* sections) is encoded back into a datagram. Both directions share [`Header`], so the
//! flag bits are laid out identically when reading and writing.

#[macro_use]
mod macros;
pub mod decoder;
pub mod encoder;
mod error;
mod message;
pub mod name;

use core::fmt;

use bitflags::bitflags;

use crate::num::U16;

pub use decoder::decode;
pub use encoder::encode;
pub use error::Error;
pub use message::{Address, Answer, Query, Request, Response};

ffi_enum! {
    /// DNS message operation codes.
    pub enum Opcode: u8 {
        /// Query (or response to a query).
        QUERY = 0,
        /// Inverse Query (obsolete).
        IQUERY = 1,
        /// Server status request.
        STATUS = 2,
        NOTIFY = 4,
        UPDATE = 5,
    }
}

ffi_enum! {
    /// Server reply codes.
    ///
    /// Only values of 15 or less can be represented in the [`Header`].
    pub enum ReplyCode: u8 {
        /// No error.
        NO_ERROR = 0,
        /// The query sent by the client was erroneous.
        FORM_ERR = 1,
        /// A server-side error prevented processing of the query.
        SERV_FAIL = 2,
        /// Signifies that the queried domain name does not exist.
        ///
        /// May only be sent by an authoritative name server.
        NX_DOMAIN = 3,
        /// The requested kind of query is not supported by the server.
        NOT_IMP = 4,
        /// The server refused to answer the query for policy reasons.
        REFUSED = 5,
        YX_DOMAIN = 6,
        YX_RR_SET = 7,
        NX_RR_SET = 8,
        NOT_AUTH = 9,
        NOT_ZONE = 10,
    }
}

ffi_enum! {
    /// Queried resource record types.
    ///
    /// Values are the ones assigned in [RFC 1035] and its successors. Unlisted values received
    /// from the wire are kept as-is.
    ///
    /// [RFC 1035]: https://datatracker.ietf.org/doc/html/rfc1035
    pub enum QueryType: u16 {
        A = 1,
        NS = 2,
        CNAME = 5,
        SOA = 6,
        PTR = 12,
        MX = 15,
        TXT = 16,
        AAAA = 28,
        SRV = 33,
        DNAME = 39,
        DS = 43,
        HTTPS = 65,
        /// Query is for all record types.
        ALL = 255,
        CAA = 257,
    }
}

impl QueryType {
    /// Returns the RDATA length of an address record of this type, or `None` if records of this
    /// type do not hold an address.
    pub fn address_len(self) -> Option<usize> {
        match self {
            Self::A => Some(4),
            Self::AAAA => Some(16),
            _ => None,
        }
    }
}

ffi_enum! {
    /// Queried resource classes.
    pub enum QueryClass: u16 {
        RESERVED = 0,
        /// The Internet.
        IN = 1,
        /// CSNET (unassigned today).
        CS = 2,
        /// Chaosnet.
        CH = 3,
        /// Hesiod.
        HS = 4,
        /// Query is for all classes of resource.
        ANY = 255,
    }
}

// Bit positions in the header flags are inverted, because RFC 1035 starts counting at the MSb.
const fn be_pos(pos: u16) -> u16 {
    15 - pos
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    struct HeaderFlags: u16 {
        /// If set, the message is a response to a query. If unset, it is a query.
        const QR = 1 << be_pos(0);
        const OPCODE = Self::OPCODE_MASK;
        /// Set if this response was sent from a name server that is the authority for the queried
        /// domain name.
        const AA = 1 << be_pos(5);
        /// Set if the message was truncated because it is longer than the maximum allowed length of
        /// the transmission channel.
        const TC = 1 << be_pos(6);
        /// Recursion Desired: set in a query to ask for recursive resolution, copied to the
        /// response.
        const RD = 1 << be_pos(7);
        /// Recursion Available: set in a response if the server supports recursion.
        const RA = 1 << be_pos(8);
        const Z = 0b111 << be_pos(11);
        const RCODE = Self::RCODE_MASK;
    }
}

impl HeaderFlags {
    const OPCODE_POS: u16 = 11;
    const OPCODE_MASK: u16 = 0b1111 << Self::OPCODE_POS;

    const RCODE_POS: u16 = 0;
    const RCODE_MASK: u16 = 0b1111 << Self::RCODE_POS;

    fn opcode(&self) -> Opcode {
        Opcode(((self.bits() & Self::OPCODE_MASK) >> Self::OPCODE_POS) as u8)
    }

    fn rcode(&self) -> ReplyCode {
        ReplyCode(((self.bits() & Self::RCODE_MASK) >> Self::RCODE_POS) as u8)
    }

    fn with_field(self, mask: HeaderFlags, pos: u16, value: u8) -> Result<Self, Error> {
        let value = u32::from(value) << pos;
        if value & !u32::from(mask.bits()) != 0 {
            return Err(Error::ValueOutOfRange);
        }
        Ok(Self::from_bits_retain((self - mask).bits() | value as u16))
    }
}

/// Message header.
///
/// This is the exact 12-byte wire layout: ID, flags word, and the four section counts, all
/// big-endian.
#[derive(Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C, packed)]
pub struct Header {
    id: U16,
    flags: U16,
    qdcount: U16,
    ancount: U16,
    nscount: U16,
    arcount: U16,
}

impl Header {
    /// Size of the header on the wire.
    pub const LEN: usize = 12;

    fn flags(&self) -> HeaderFlags {
        HeaderFlags::from_bits_retain(self.flags.get())
    }

    fn modify_flags(&mut self, with: impl FnOnce(&mut HeaderFlags)) {
        let mut flags = self.flags();
        with(&mut flags);
        self.flags = flags.bits().into();
    }

    /// Returns the 16-bit transaction ID.
    ///
    /// Servers copy this ID to the corresponding response so that the client can match responses
    /// to its queries.
    #[inline]
    pub fn id(&self) -> u16 {
        self.id.get()
    }

    #[inline]
    pub fn set_id(&mut self, id: u16) {
        self.id = id.into();
    }

    /// Returns the whole flags word as it appears on the wire.
    #[inline]
    pub fn raw_flags(&self) -> u16 {
        self.flags.get()
    }

    #[inline]
    pub fn is_query(&self) -> bool {
        !self.is_response()
    }

    #[inline]
    pub fn is_response(&self) -> bool {
        self.flags().contains(HeaderFlags::QR)
    }

    pub fn set_response(&mut self, is_response: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::QR, is_response));
    }

    /// Returns whether the truncation flag is set, indicating that the message was truncated to
    /// fit in the transport channel.
    pub fn is_truncated(&self) -> bool {
        self.flags().contains(HeaderFlags::TC)
    }

    pub fn set_truncated(&mut self, trunc: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::TC, trunc));
    }

    pub fn is_recursion_desired(&self) -> bool {
        self.flags().contains(HeaderFlags::RD)
    }

    pub fn set_recursion_desired(&mut self, rd: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::RD, rd));
    }

    pub fn is_recursion_available(&self) -> bool {
        self.flags().contains(HeaderFlags::RA)
    }

    pub fn set_recursion_available(&mut self, ra: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::RA, ra));
    }

    pub fn is_authority(&self) -> bool {
        self.flags().contains(HeaderFlags::AA)
    }

    pub fn set_authority(&mut self, aa: bool) {
        self.modify_flags(|f| f.set(HeaderFlags::AA, aa));
    }

    pub fn opcode(&self) -> Opcode {
        self.flags().opcode()
    }

    /// Sets the 4-bit opcode, failing with [`Error::ValueOutOfRange`] if it does not fit.
    pub fn set_opcode(&mut self, opcode: Opcode) -> Result<(), Error> {
        let flags = self.flags().with_field(
            HeaderFlags::OPCODE,
            HeaderFlags::OPCODE_POS,
            opcode.0,
        )?;
        self.flags = flags.bits().into();
        Ok(())
    }

    pub fn rcode(&self) -> ReplyCode {
        self.flags().rcode()
    }

    /// Sets the 4-bit reply code, failing with [`Error::ValueOutOfRange`] if it does not fit.
    pub fn set_rcode(&mut self, rcode: ReplyCode) -> Result<(), Error> {
        let flags =
            self.flags()
                .with_field(HeaderFlags::RCODE, HeaderFlags::RCODE_POS, rcode.0)?;
        self.flags = flags.bits().into();
        Ok(())
    }

    /// Clears the reserved `Z` bits, which must be zero in anything we send.
    pub(crate) fn clear_reserved(&mut self) {
        self.modify_flags(|f| f.remove(HeaderFlags::Z));
    }

    pub fn question_count(&self) -> u16 {
        self.qdcount.get()
    }

    pub fn answer_count(&self) -> u16 {
        self.ancount.get()
    }

    pub fn authority_count(&self) -> u16 {
        self.nscount.get()
    }

    pub fn additional_count(&self) -> u16 {
        self.arcount.get()
    }

    pub fn set_question_count(&mut self, qdcount: u16) {
        self.qdcount = qdcount.into();
    }

    pub fn set_answer_count(&mut self, ancount: u16) {
        self.ancount = ancount.into();
    }

    pub fn set_authority_count(&mut self, nscount: u16) {
        self.nscount = nscount.into();
    }

    pub fn set_additional_count(&mut self, arcount: u16) {
        self.arcount = arcount.into();
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("id", &self.id())
            .field("flags", &self.flags())
            .field("qdcount", &self.question_count())
            .field("ancount", &self.answer_count())
            .field("nscount", &self.authority_count())
            .field("arcount", &self.additional_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_raw_flags(raw: u16) -> Header {
        let mut h = Header::default();
        h.flags = raw.into();
        h
    }

    #[test]
    fn header() {
        let mut h = Header::default();
        assert!(h.is_query());
        assert!(!h.is_authority());
        assert!(!h.is_response());
        assert!(!h.is_recursion_available());
        assert!(!h.is_recursion_desired());

        assert_eq!(h.opcode(), Opcode::QUERY);
        h.set_opcode(Opcode::UPDATE).unwrap();
        assert_eq!(h.opcode(), Opcode::UPDATE);
        h.set_opcode(Opcode::QUERY).unwrap();
        assert_eq!(h.opcode(), Opcode::QUERY);

        assert_eq!(h.rcode(), ReplyCode::NO_ERROR);
        h.set_rcode(ReplyCode::REFUSED).unwrap();
        assert_eq!(h.rcode(), ReplyCode::REFUSED);
        h.set_rcode(ReplyCode::NO_ERROR).unwrap();
        assert_eq!(h.rcode(), ReplyCode::NO_ERROR);
        assert_eq!(h.raw_flags(), 0);
    }

    #[test]
    fn wide_fields_are_rejected() {
        let mut h = Header::default();
        h.set_rcode(ReplyCode::REFUSED).unwrap();
        assert_eq!(h.set_rcode(ReplyCode(16)), Err(Error::ValueOutOfRange));
        assert_eq!(h.set_opcode(Opcode(0x10)), Err(Error::ValueOutOfRange));
        assert_eq!(h.set_opcode(Opcode(0xff)), Err(Error::ValueOutOfRange));
        // A rejected value leaves the header untouched.
        assert_eq!(h.rcode(), ReplyCode::REFUSED);
        assert_eq!(h.opcode(), Opcode::QUERY);
    }

    #[test]
    fn flag_bit_positions() {
        let h = with_raw_flags(1 << 9);
        assert!(h.is_truncated());
        assert!(!h.is_recursion_desired());

        let h = with_raw_flags(1 << 8);
        assert!(!h.is_truncated());
        assert!(h.is_recursion_desired());

        assert!(with_raw_flags(1 << 15).is_response());
        assert!(with_raw_flags(1 << 10).is_authority());
        assert!(with_raw_flags(1 << 7).is_recursion_available());
        assert_eq!(with_raw_flags(0b1111 << 11).opcode(), Opcode(15));
        assert_eq!(with_raw_flags(0b1111).rcode(), ReplyCode(15));
    }

    #[test]
    fn setters_touch_one_bit() {
        let cases: [(fn(&mut Header), u16); 5] = [
            (|h| h.set_response(true), 1 << 15),
            (|h| h.set_authority(true), 1 << 10),
            (|h| h.set_truncated(true), 1 << 9),
            (|h| h.set_recursion_desired(true), 1 << 8),
            (|h| h.set_recursion_available(true), 1 << 7),
        ];
        for (set, bit) in cases {
            let mut h = Header::default();
            set(&mut h);
            assert_eq!(h.raw_flags(), bit);
        }
    }

    #[test]
    fn clear_reserved() {
        let mut h = with_raw_flags(0xffff);
        h.clear_reserved();
        assert_eq!(h.raw_flags(), 0xff8f);
    }

    #[test]
    fn enum_debug() {
        assert_eq!(format!("{:?}", QueryType::AAAA), "AAAA");
        assert_eq!(format!("{}", QueryClass::IN), "IN");
        assert_eq!(
            format!("{:?}", QueryType::from(999)),
            "(unknown QueryType: 0x3e7)"
        );
        assert_eq!(QueryType::from(1), QueryType::A);
        assert_eq!(ReplyCode::REFUSED.value(), 5);
    }
}
