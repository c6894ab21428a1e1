//! The UDP name server.

use std::{
    future::Future,
    io,
    net::{SocketAddr, UdpSocket},
};

use async_io::Async;
use futures_lite::future;
pub use roamdns::server::*;
use roamdns::{config::ServerConfig, resolver::AddressResolver, DNS_BUFFER_SIZE};

/// An async DNS server answering on a single UDP socket.
pub struct AsyncServer<R> {
    sock: Async<UdpSocket>,
    resolver: R,
    config: ServerConfig,
}

impl<R: AddressResolver> AsyncServer<R> {
    /// Binds the server socket to the configured address.
    pub fn bind(config: ServerConfig, resolver: R) -> io::Result<Self> {
        let sock = Async::new(bind_socket(config.bind_address())?)?;
        log::info!("DNS server listening on {}", sock.get_ref().local_addr()?);
        Ok(Self {
            sock,
            resolver,
            config,
        })
    }

    pub fn socket(&self) -> &Async<UdpSocket> {
        &self.sock
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Receives and answers requests forever.
    ///
    /// Only returns on socket errors, or when a response could not be encoded.
    pub async fn listen(&self) -> io::Result<()> {
        let mut recv_buf = [0; DNS_BUFFER_SIZE];
        loop {
            let (len, addr) = self.sock.recv_from(&mut recv_buf).await?;
            self.handle_datagram(addr, &recv_buf[..len]).await?;
        }
    }

    /// Like [`AsyncServer::listen`], but returns `Ok(())` as soon as `shutdown` completes.
    pub async fn listen_until(&self, shutdown: impl Future<Output = ()>) -> io::Result<()> {
        let shutdown = async {
            shutdown.await;
            log::info!("DNS server shutting down");
            Ok(())
        };
        future::or(self.listen(), shutdown).await
    }

    async fn handle_datagram(&self, sender: SocketAddr, packet: &[u8]) -> io::Result<()> {
        log::trace!("raw recv from {}: {:x?}", sender, packet);

        let Some(reply) = handle_packet(packet, &self.resolver, &self.config)? else {
            return Ok(());
        };
        if let Err(e) = self.sock.send_to(&reply, sender).await {
            log::warn!("failed to send response to {}: {}", sender, e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        net::{Ipv4Addr, SocketAddr},
        time::Duration,
    };

    use async_io::Timer;
    use roamdns::packet::{decode, name::Name, Address, ReplyCode};

    use super::*;

    const QUERY: [u8; 29] = [
        0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // header
        7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, // name
        0x00, 0x01, 0x00, 0x01, // A IN
    ];

    fn example_resolver(name: &Name) -> Option<Address> {
        (name.to_string() == "example.com.").then(|| Address::from(Ipv4Addr::new(93, 184, 216, 34)))
    }

    #[test]
    fn serve_over_udp() {
        let config = ServerConfig::default().bind_addr((Ipv4Addr::LOCALHOST, 0).into());
        let server = AsyncServer::bind(config, example_resolver).unwrap();
        let server_addr = server.socket().get_ref().local_addr().unwrap();

        let client = async {
            let sock = Async::<UdpSocket>::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))?;
            sock.send_to(&QUERY, server_addr).await?;

            let mut buf = [0; DNS_BUFFER_SIZE];
            let (len, _) = sock.recv_from(&mut buf).await?;
            let reply = decode(&buf[..len]).map_err(io::Error::from)?;
            assert_eq!(reply.id(), 0x1234);
            assert_eq!(reply.header().answer_count(), 1);
            assert_eq!(reply.header().rcode(), ReplyCode::NO_ERROR);
            assert_eq!(&buf[len - 4..len], &[93, 184, 216, 34]);
            Ok::<(), io::Error>(())
        };
        let timeout = async {
            Timer::after(Duration::from_secs(5)).await;
            Err(io::ErrorKind::TimedOut.into())
        };

        future::block_on(future::or(server.listen_until(client_done(client)), timeout))
            .unwrap();
    }

    /// Runs the client to completion, panicking on its errors, so that it can serve as the
    /// server's shutdown signal.
    async fn client_done(client: impl Future<Output = io::Result<()>>) {
        client.await.unwrap();
    }
}
