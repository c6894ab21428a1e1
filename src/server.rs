//! The UDP name server.

use std::{
    io,
    net::{SocketAddr, UdpSocket},
};

use socket2::{Domain, Protocol, Socket, Type};

use crate::{
    config::ServerConfig,
    hex::Hex,
    packet::{
        decode, decoder::Reader, encode, Answer, Error, Header, QueryClass, ReplyCode, Request,
        Response,
    },
    resolver::AddressResolver,
    DNS_BUFFER_SIZE,
};

/// Builds the response to a decoded request.
///
/// Only the first query is looked at. It is answered if it is an `IN` query of the configured
/// type and the resolver knows an address of the matching family for its name; otherwise the
/// response is `REFUSED` and has no answers. A request without questions gets `FORM_ERR`.
pub fn handle_request(
    request: &Request,
    resolver: &dyn AddressResolver,
    config: &ServerConfig,
) -> Result<Response, Error> {
    let mut response = Response::reply_to(request);
    let h = response.header_mut();
    h.set_authority(true);
    h.set_truncated(false);
    h.set_recursion_desired(true);
    h.set_recursion_available(true);

    let Some(query) = request.first_query() else {
        log::debug!("request {} has no questions", request.id());
        response.header_mut().set_rcode(ReplyCode::FORM_ERR)?;
        return Ok(response);
    };

    let ty = query.query_type();
    let address = if ty != config.answered_type() {
        log::debug!("not answering {} query", ty);
        None
    } else if query.query_class() != QueryClass::IN {
        log::debug!("not answering query in class {}", query.query_class());
        None
    } else {
        resolver.resolve(query.name()).filter(|address| {
            let fits = ty.address_len() == Some(address.as_bytes().len());
            if !fits {
                log::debug!("{} cannot be sent as an {} record", address, ty);
            }
            fits
        })
    };

    match address {
        Some(address) => {
            let answer = Answer::new(query, config.answer_ttl(), address);
            log::debug!("ANS: {}", answer);
            response.push_answer(answer)?;
            response.header_mut().set_rcode(ReplyCode::NO_ERROR)?;
        }
        None => response.header_mut().set_rcode(ReplyCode::REFUSED)?,
    }
    Ok(response)
}

/// Builds the reply to a datagram that could not be decoded.
///
/// If at least the header is intact, the client gets a `FORM_ERR` response with its transaction
/// ID. Otherwise there is nobody to reply to and `None` is returned.
fn format_error(packet: &[u8]) -> Result<Option<Response>, Error> {
    let Ok(header) = Reader::new(packet).read_obj::<Header>() else {
        return Ok(None);
    };
    if header.is_response() {
        // Never answer responses, that's how reflection loops start.
        return Ok(None);
    }
    let mut response = Response::new(header.id());
    response.header_mut().set_rcode(ReplyCode::FORM_ERR)?;
    Ok(Some(response))
}

/// Turns a received datagram into the datagram to send back, if any.
///
/// Malformed requests are answered with `FORM_ERR` or ignored. An `Err` means a response was
/// built inconsistently, which is a bug rather than a problem with the request.
pub fn handle_packet(
    packet: &[u8],
    resolver: &dyn AddressResolver,
    config: &ServerConfig,
) -> Result<Option<Vec<u8>>, Error> {
    let response = match decode(packet) {
        Ok(request) if request.header().is_response() => {
            log::debug!("ignoring response {}", request.id());
            return Ok(None);
        }
        Ok(request) => handle_request(&request, resolver, config)?,
        Err(e) => {
            log::debug!("failed to decode request: {}", e);
            match format_error(packet)? {
                Some(response) => response,
                None => return Ok(None),
            }
        }
    };
    encode(&response).map(Some)
}

/// A synchronous DNS server answering on a single UDP socket.
pub struct SyncServer<R> {
    sock: UdpSocket,
    resolver: R,
    config: ServerConfig,
}

impl<R: AddressResolver> SyncServer<R> {
    /// Binds the server socket to the configured address.
    pub fn bind(config: ServerConfig, resolver: R) -> io::Result<Self> {
        let sock = bind_socket(config.bind_address())?;
        log::info!("DNS server listening on {}", sock.local_addr()?);
        Ok(Self {
            sock,
            resolver,
            config,
        })
    }

    pub fn socket(&self) -> &UdpSocket {
        &self.sock
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Starts receiving and answering requests.
    ///
    /// This method will not return, except when an I/O error occurs on the socket or a response
    /// could not be encoded.
    pub fn listen(&self) -> io::Result<()> {
        let mut recv_buf = [0; DNS_BUFFER_SIZE];
        loop {
            let (len, addr) = self.sock.recv_from(&mut recv_buf)?;
            self.handle_datagram(addr, &recv_buf[..len])?;
        }
    }

    fn handle_datagram(&self, sender: SocketAddr, packet: &[u8]) -> io::Result<()> {
        log::trace!("raw recv from {}: {}", sender, Hex(packet));

        let Some(reply) = handle_packet(packet, &self.resolver, &self.config)? else {
            return Ok(());
        };
        log::trace!("raw send to {}: {}", sender, Hex(&reply));
        if let Err(e) = self.sock.send_to(&reply, sender) {
            // The peer might be gone already; that's no reason to stop serving others.
            log::warn!("failed to send response to {}: {}", sender, e);
        }
        Ok(())
    }
}

/// Creates a UDP socket bound to `addr`, with address reuse enabled so a restarted server can
/// bind immediately.
pub fn bind_socket(addr: SocketAddr) -> io::Result<UdpSocket> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };
    let sock = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    sock.set_reuse_address(true)?;
    sock.bind(&addr.into())?;
    Ok(UdpSocket::from(sock))
}
