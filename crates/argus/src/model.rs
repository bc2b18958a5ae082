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

//! Wire types shared by the dispatcher and storage-node RPC services.

use std::collections::BTreeSet;

/// A single search hit returned by a storage node, already carrying the
/// relevance (backlink count) the dispatcher sorts by.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct SearchResult {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub relevance: u64,
}

/// What a storage node keeps per indexed URL. `relevance_scratch` has no
/// persisted meaning; it's populated transiently while serving a search.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct PageRecord {
    pub title: String,
    pub snippet: String,
    pub relevance_scratch: u64,
}

impl PageRecord {
    pub fn new(title: String, snippet: String) -> Self {
        Self {
            title,
            snippet,
            relevance_scratch: 0,
        }
    }
}

/// A point-in-time copy of the dispatcher's crawl queue, shipped to every
/// storage node whenever `pending` or `visited` changes.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize, bincode::Encode, bincode::Decode)]
pub struct UrlQueueSnapshot {
    /// FIFO order preserved: index 0 is the next URL to crawl.
    pub pending: Vec<String>,
    pub visited: BTreeSet<String>,
}

/// Lower-cases and trims a raw term. Case folding is normative for all index
/// lookups and Bloom operations.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Joins the first `limit` tokens of `tokens` into a trimmed, space-joined
/// citation snippet.
pub fn build_snippet<'a>(tokens: impl IntoIterator<Item = &'a str>, limit: usize) -> String {
    tokens
        .into_iter()
        .take(limit)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_respects_limit() {
        let tokens = ["a", "b", "c", "d", "e"];
        assert_eq!(build_snippet(tokens, 3), "a b c");
    }

    #[test]
    fn snippet_shorter_than_limit() {
        let tokens = ["only", "two"];
        assert_eq!(build_snippet(tokens, 30), "only two");
    }

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize_term("  HeLLo \n"), "hello");
    }
}
