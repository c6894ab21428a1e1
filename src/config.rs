//! Server configuration and the table of known systems.

use std::{
    collections::HashMap,
    env, fs, io,
    net::{Ipv4Addr, SocketAddr},
    path::Path,
};

use serde::Deserialize;

use crate::{
    packet::{name::Name, QueryType},
    resolver::Location,
    DNS_PORT,
};

/// Environment variable that selects the [`Location`] (`local` or `remote`).
pub const LOCATION_VAR: &str = "ROAMDNS_LOCATION";

/// Settings of the DNS server.
///
/// The defaults answer `A` queries on port 53 of all interfaces, with a TTL of 15 minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    bind_addr: SocketAddr,
    ttl: u32,
    accepted_type: QueryType,
}

impl ServerConfig {
    pub const DEFAULT_TTL: u32 = 900;

    /// Sets the address the server socket binds to.
    #[inline]
    pub fn bind_addr(self, bind_addr: SocketAddr) -> Self {
        Self { bind_addr, ..self }
    }

    /// Sets the TTL of returned answers, in seconds.
    #[inline]
    pub fn ttl(self, ttl: u32) -> Self {
        Self { ttl, ..self }
    }

    /// Sets the only query type that is answered; everything else is refused.
    ///
    /// Answers are address records, so only [`QueryType::A`] and [`QueryType::AAAA`] can ever
    /// be answered, each with addresses of its own family.
    #[inline]
    pub fn accepted_type(self, accepted_type: QueryType) -> Self {
        Self {
            accepted_type,
            ..self
        }
    }

    #[inline]
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_addr
    }

    #[inline]
    pub fn answer_ttl(&self) -> u32 {
        self.ttl
    }

    #[inline]
    pub fn answered_type(&self) -> QueryType {
        self.accepted_type
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: (Ipv4Addr::UNSPECIFIED, DNS_PORT).into(),
            ttl: Self::DEFAULT_TTL,
            accepted_type: QueryType::A,
        }
    }
}

/// Reads the [`Location`] from the [`LOCATION_VAR`] environment variable.
///
/// An unset variable means [`Location::Remote`].
pub fn location_from_env() -> io::Result<Location> {
    match env::var(LOCATION_VAR) {
        Ok(value) => value
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e)),
        Err(env::VarError::NotPresent) => Ok(Location::default()),
        Err(e) => Err(io::Error::new(io::ErrorKind::InvalidInput, e)),
    }
}

#[derive(Deserialize)]
struct SystemEntry {
    name: String,
    vpn: [u8; 4],
}

/// A system that the server answers for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct System {
    name: Name,
    vpn: Ipv4Addr,
}

impl System {
    pub fn new(name: Name, vpn: Ipv4Addr) -> Self {
        Self { name, vpn }
    }

    #[inline]
    pub fn name(&self) -> &Name {
        &self.name
    }

    /// The address the system has inside the VPN.
    #[inline]
    pub fn vpn(&self) -> Ipv4Addr {
        self.vpn
    }
}

/// The known systems, keyed by name.
///
/// Stored on disk as a JSON array:
///
/// ```json
/// [{ "name": "nas.home", "vpn": [10, 8, 0, 2] }]
/// ```
#[derive(Debug, Clone, Default)]
pub struct SystemTable {
    systems: HashMap<Name, System>,
}

impl SystemTable {
    /// Parses a systems table from its JSON representation.
    pub fn from_json(json: &str) -> io::Result<Self> {
        let entries: Vec<SystemEntry> = serde_json::from_str(json)?;
        let mut table = Self::default();
        for entry in entries {
            let name = Name::from_str(&entry.name)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            table.insert(System::new(name, entry.vpn.into()));
        }
        Ok(table)
    }

    /// Loads a systems table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let table = Self::from_json(&fs::read_to_string(path)?)?;
        log::info!("loaded {} systems from {}", table.len(), path.display());
        Ok(table)
    }

    /// Adds a system, replacing any earlier one with the same name.
    pub fn insert(&mut self, system: System) {
        if let Some(old) = self.systems.insert(system.name.clone(), system) {
            log::warn!("duplicate system {}, last entry wins", old.name);
        }
    }

    pub fn get(&self, name: &Name) -> Option<&System> {
        self.systems.get(name)
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &System> + '_ {
        self.systems.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:53".parse::<SocketAddr>().unwrap());
        assert_eq!(config.answer_ttl(), 900);
        assert_eq!(config.answered_type(), QueryType::A);

        let config = config.ttl(60).accepted_type(QueryType::AAAA);
        assert_eq!(config.answer_ttl(), 60);
        assert_eq!(config.answered_type(), QueryType::AAAA);
    }

    #[test]
    fn parse_table() {
        let table = SystemTable::from_json(
            r#"[
                {"name": "nas.home", "vpn": [10, 8, 0, 2]},
                {"name": "nas.home.", "vpn": [10, 8, 0, 9]}
            ]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        let nas = table.get(&Name::from_str("nas.home").unwrap()).unwrap();
        assert_eq!(nas.vpn(), Ipv4Addr::new(10, 8, 0, 9));
        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn bad_tables() {
        let err = SystemTable::from_json(r#"[{"name": "a..b", "vpn": [1, 2, 3, 4]}]"#).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let err = SystemTable::from_json(r#"[{"name": "a", "vpn": [1, 2, 3]}]"#).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        assert!(SystemTable::from_json("{}").is_err());
    }

    #[test]
    fn load_missing_file() {
        let err = SystemTable::load("/nonexistent/systems.json").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
