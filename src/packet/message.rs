//! Messages exchanged by the decoder and encoder.

use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use super::{name::Name, Error, Header, QueryClass, QueryType};

/// Raw bytes of a network address, as carried in the RDATA of an address record.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Address {
    octets: Box<[u8]>,
}

impl Address {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.octets
    }

    /// Returns the address as an [`Ipv4Addr`] if it is 4 bytes long.
    pub fn to_ipv4(&self) -> Option<Ipv4Addr> {
        let octets: [u8; 4] = (*self.octets).try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }
}

impl From<Ipv4Addr> for Address {
    fn from(addr: Ipv4Addr) -> Self {
        Self {
            octets: addr.octets().into(),
        }
    }
}

impl From<Ipv6Addr> for Address {
    fn from(addr: Ipv6Addr) -> Self {
        Self {
            octets: addr.octets().into(),
        }
    }
}

impl From<IpAddr> for Address {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => v4.into(),
            IpAddr::V6(v6) => v6.into(),
        }
    }
}

impl From<Vec<u8>> for Address {
    fn from(octets: Vec<u8>) -> Self {
        Self {
            octets: octets.into(),
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_ipv4() {
            Some(v4) => v4.fmt(f),
            None => write!(f, "{:02x?}", self.as_bytes()),
        }
    }
}

/// An entry of the *Question* section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    name: Name,
    ty: QueryType,
    class: QueryClass,
}

impl Query {
    /// Creates a query for the `A` records of `name` in the Internet class.
    #[inline]
    pub fn new(name: Name) -> Self {
        Self {
            name,
            ty: QueryType::A,
            class: QueryClass::IN,
        }
    }

    /// Sets the resource type to query.
    #[inline]
    pub fn ty(self, ty: QueryType) -> Self {
        Self { ty, ..self }
    }

    /// Sets the record class to query.
    #[inline]
    pub fn class(self, class: QueryClass) -> Self {
        Self { class, ..self }
    }

    /// Returns the name that is being queried.
    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn query_type(&self) -> QueryType {
        self.ty
    }

    #[inline]
    pub fn query_class(&self) -> QueryClass {
        self.class
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.name, self.class, self.ty)
    }
}

/// An address record in the *Answer* section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    name: Name,
    ty: QueryType,
    class: QueryClass,
    ttl: u32,
    address: Address,
}

impl Answer {
    /// Creates an answer to `query`, taking over its name, type and class.
    pub fn new(query: &Query, ttl: u32, address: Address) -> Self {
        Self {
            name: query.name.clone(),
            ty: query.ty,
            class: query.class,
            ttl,
            address,
        }
    }

    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    #[inline]
    pub fn record_type(&self) -> QueryType {
        self.ty
    }

    #[inline]
    pub fn record_class(&self) -> QueryClass {
        self.class
    }

    /// Returns the entry's Time To Live, in seconds.
    #[inline]
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    #[inline]
    pub fn address(&self) -> &Address {
        &self.address
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}",
            self.name, self.ttl, self.class, self.ty, self.address
        )
    }
}

/// A decoded query message.
///
/// Only the header and the *Question* section are decoded. The counts of the other sections are
/// available through the header, but their records are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub(crate) header: Header,
    pub(crate) queries: Vec<Query>,
}

impl Request {
    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Returns the transaction ID.
    #[inline]
    pub fn id(&self) -> u16 {
        self.header.id()
    }

    /// Returns the undecoded flags word.
    #[inline]
    pub fn raw_flags(&self) -> u16 {
        self.header.raw_flags()
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.header.is_truncated()
    }

    #[inline]
    pub fn is_recursion_desired(&self) -> bool {
        self.header.is_recursion_desired()
    }

    /// Returns the entries of the *Question* section, exactly as many as the header announced.
    #[inline]
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    /// Returns the first query. Additional queries are decoded, but never answered.
    #[inline]
    pub fn first_query(&self) -> Option<&Query> {
        self.queries.first()
    }
}

/// A response message, ready to be encoded.
///
/// The header counts are kept in sync by [`Response::push_query`] and
/// [`Response::push_answer`]. If they are overwritten through [`Response::header_mut`], the
/// encoder checks them against the actual sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    header: Header,
    queries: Vec<Query>,
    answers: Vec<Answer>,
}

impl Response {
    /// Creates an empty response with the given transaction ID.
    pub fn new(id: u16) -> Self {
        let mut header = Header::default();
        header.set_id(id);
        header.set_response(true);
        Self {
            header,
            queries: Vec::new(),
            answers: Vec::new(),
        }
    }

    /// Creates a response to `request`, copying its ID, *Recursion Desired* flag and
    /// *Question* section.
    pub fn reply_to(request: &Request) -> Self {
        let mut response = Self::new(request.id());
        response
            .header
            .set_recursion_desired(request.is_recursion_desired());
        // The decoder stops after the announced number of questions, so this always fits.
        response.header.set_question_count(request.header.question_count());
        response.queries = request.queries.clone();
        response
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    #[inline]
    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    #[inline]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    /// Appends a query to the *Question* section and bumps the question count.
    pub fn push_query(&mut self, query: Query) -> Result<(), Error> {
        let count = increment(self.header.question_count())?;
        self.header.set_question_count(count);
        self.queries.push(query);
        Ok(())
    }

    /// Appends an answer to the *Answer* section and bumps the answer count.
    pub fn push_answer(&mut self, answer: Answer) -> Result<(), Error> {
        let count = increment(self.header.answer_count())?;
        self.header.set_answer_count(count);
        self.answers.push(answer);
        Ok(())
    }
}

fn increment(count: u16) -> Result<u16, Error> {
    count.checked_add(1).ok_or(Error::ValueOutOfRange)
}

#[cfg(test)]
mod tests {
    use crate::packet::Opcode;

    use super::*;

    fn query(name: &str) -> Query {
        Query::new(Name::from_str(name).unwrap())
    }

    #[test]
    fn address_conversions() {
        let addr = Address::from(Ipv4Addr::new(93, 184, 216, 34));
        assert_eq!(addr.as_bytes(), &[93, 184, 216, 34]);
        assert_eq!(addr.to_string(), "93.184.216.34");
        assert_eq!(Address::from(vec![93, 184, 216, 34]), addr);

        let v6 = Address::from(Ipv6Addr::LOCALHOST);
        assert_eq!(v6.as_bytes().len(), 16);
        assert_eq!(v6.to_ipv4(), None);
    }

    #[test]
    fn answer_copies_query() {
        let q = query("example.com").class(QueryClass::CH);
        let a = Answer::new(&q, 900, Ipv4Addr::LOCALHOST.into());
        assert_eq!(a.name(), q.name());
        assert_eq!(a.record_type(), QueryType::A);
        assert_eq!(a.record_class(), QueryClass::CH);
        assert_eq!(a.ttl(), 900);
    }

    #[test]
    fn push_keeps_counts_in_sync() {
        let mut r = Response::new(7);
        assert!(r.header().is_response());
        assert_eq!(r.header().opcode(), Opcode::QUERY);
        r.push_query(query("a.b")).unwrap();
        r.push_answer(Answer::new(&query("a.b"), 1, Ipv4Addr::LOCALHOST.into()))
            .unwrap();
        assert_eq!(r.header().question_count(), 1);
        assert_eq!(r.header().answer_count(), 1);
        assert_eq!(r.header().authority_count(), 0);
    }

    #[test]
    fn push_rejects_count_overflow() {
        let mut r = Response::new(7);
        r.header_mut().set_question_count(u16::MAX);
        assert_eq!(r.push_query(query("a")), Err(Error::ValueOutOfRange));
        assert!(r.queries().is_empty());
    }

    #[test]
    fn reply_to_copies_request() {
        let mut header = Header::default();
        header.set_id(0xbeef);
        header.set_recursion_desired(true);
        header.set_truncated(true);
        header.set_question_count(1);
        header.set_additional_count(3);
        let request = Request {
            header,
            queries: vec![query("example.com")],
        };

        let r = Response::reply_to(&request);
        assert_eq!(r.header().id(), 0xbeef);
        assert!(r.header().is_response());
        assert!(r.header().is_recursion_desired());
        assert!(!r.header().is_truncated());
        assert_eq!(r.header().question_count(), 1);
        assert_eq!(r.header().additional_count(), 0);
        assert_eq!(r.queries(), request.queries());
    }
}
