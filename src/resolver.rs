//! Mapping queried names to addresses.

use std::{
    fmt,
    net::{IpAddr, SocketAddr, ToSocketAddrs},
    str::FromStr,
};

use crate::{
    config::SystemTable,
    packet::{name::Name, Address},
};

/// Resolves a queried name to at most one address.
pub trait AddressResolver {
    fn resolve(&self, name: &Name) -> Option<Address>;
}

impl<F> AddressResolver for F
where
    F: Fn(&Name) -> Option<Address>,
{
    fn resolve(&self, name: &Name) -> Option<Address> {
        self(name)
    }
}

/// Looks names up through the operating system's resolver, returning the first IPv4 address.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl AddressResolver for SystemResolver {
    fn resolve(&self, name: &Name) -> Option<Address> {
        let host = name.to_string();
        // `ToSocketAddrs` wants a port; it is discarded again below.
        let addrs = match (host.trim_end_matches('.'), 0).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::debug!("system lookup of {} failed: {}", name, e);
                return None;
            }
        };
        addrs
            .map(|addr: SocketAddr| addr.ip())
            .find(IpAddr::is_ipv4)
            .map(Address::from)
    }
}

/// Where this machine currently is, relative to the systems in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Location {
    /// On the systems' local network: their addresses are looked up normally.
    Local,
    /// Elsewhere: the systems are reached through their VPN addresses.
    #[default]
    Remote,
}

impl FromStr for Location {
    type Err = UnknownLocation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Location::Local),
            "remote" => Ok(Location::Remote),
            _ => Err(UnknownLocation(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown [`Location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLocation(String);

impl fmt::Display for UnknownLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown location {:?}, expected `local` or `remote`", self.0)
    }
}

impl std::error::Error for UnknownLocation {}

/// Answers only for the systems listed in a [`SystemTable`].
///
/// Remotely, a system's VPN address from the table is returned. Locally, `local` (usually a
/// [`SystemResolver`]) is asked first, and the VPN address is the fallback.
pub struct TableResolver<R = SystemResolver> {
    table: SystemTable,
    location: Location,
    local: R,
}

impl TableResolver<SystemResolver> {
    pub fn new(table: SystemTable, location: Location) -> Self {
        Self::with_local_resolver(table, location, SystemResolver)
    }
}

impl<R: AddressResolver> TableResolver<R> {
    /// Creates a table resolver that uses `local` for lookups on the local network.
    pub fn with_local_resolver(table: SystemTable, location: Location, local: R) -> Self {
        Self {
            table,
            location,
            local,
        }
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Changes the location, e.g. after the machine moved to another network.
    pub fn set_location(&mut self, location: Location) {
        log::info!("location changed to {:?}", location);
        self.location = location;
    }
}

impl<R: AddressResolver> AddressResolver for TableResolver<R> {
    fn resolve(&self, name: &Name) -> Option<Address> {
        let Some(system) = self.table.get(name) else {
            log::debug!("{} is not a known system", name);
            return None;
        };

        let vpn = Address::from(system.vpn());
        match self.location {
            Location::Remote => Some(vpn),
            Location::Local => self.local.resolve(name).or_else(|| {
                log::debug!("no local address for {}, using {}", name, vpn);
                Some(vpn)
            }),
        }
    }
}
