// argus is a distributed web search engine.
// Copyright (C) 2026 Argus Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! A tiny name -> address book, the stand-in for the "rmi.host/rmi.port"
//! registry that configuration points processes at. Processes never contact a
//! live registry service here: the map is built once from configuration and
//! re-resolved (re-read) whenever a reconnect pass is needed, which is
//! sufficient since the name/address binding in this deployment model is
//! static for the lifetime of a cluster.

use std::{collections::HashMap, net::SocketAddr};

#[derive(Debug, Clone)]
pub struct Registry {
    entries: HashMap<String, SocketAddr>,
    /// Preserves configuration order; index 0 is the primary storage node.
    order: Vec<String>,
}

impl Registry {
    pub fn new(named: impl IntoIterator<Item = (String, SocketAddr)>) -> Self {
        let mut entries = HashMap::new();
        let mut order = Vec::new();

        for (name, addr) in named {
            order.push(name.clone());
            entries.insert(name, addr);
        }

        Self { entries, order }
    }

    pub fn resolve(&self, name: &str) -> Option<SocketAddr> {
        self.entries.get(name).copied()
    }

    /// All configured names in their original (declaration) order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, SocketAddr)> {
        self.order
            .iter()
            .map(|name| (name.as_str(), self.entries[name]))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_by_name() {
        let reg = Registry::new([
            ("barrel0".to_string(), "127.0.0.1:7000".parse().unwrap()),
            ("barrel1".to_string(), "127.0.0.1:7001".parse().unwrap()),
        ]);

        assert_eq!(reg.resolve("barrel0"), Some("127.0.0.1:7000".parse().unwrap()));
        assert_eq!(reg.resolve("missing"), None);
        assert_eq!(reg.names(), ["barrel0", "barrel1"]);
    }
}
