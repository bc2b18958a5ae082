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

//! Builds the stable, newline-terminated statistics digest (spec §4.2).

use std::fmt::Write as _;

/// One row of the "Active Replicas" section: either the replica's own
/// `getBarrelStats()` string, or a failure marker.
pub enum ReplicaStatus {
    Stats(String),
    Inaccessible,
}

pub struct DigestInput {
    /// Top searches, already sorted by count descending and truncated to 10.
    pub top_searches: Vec<(String, u64)>,
    pub replicas: Vec<(String, ReplicaStatus)>,
    /// `(name, total_100us_units, search_count)`, one row per configured name.
    pub response_times: Vec<(String, u64, u64)>,
}

pub fn build(input: &DigestInput) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== Statistics ==");
    let _ = writeln!(out);
    let _ = writeln!(out, "-- Top 10 Searches --");
    for (query, count) in &input.top_searches {
        let _ = writeln!(out, "'{query}': {count} searches");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "-- Active Replicas --");
    for (name, status) in &input.replicas {
        match status {
            ReplicaStatus::Stats(s) => {
                let _ = writeln!(out, "[{name}] {s}");
            }
            ReplicaStatus::Inaccessible => {
                let _ = writeln!(out, "[{name}] Inaccessible.");
            }
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "-- Mean Response (100-\u{b5}s units) --");
    for (name, total, count) in &input.response_times {
        let mean = if *count == 0 { 0 } else { total / count };
        let _ = writeln!(
            out,
            "[{name}] Mean: {mean} (total: {total}, searches: {count})"
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_mean_is_zero() {
        let input = DigestInput {
            top_searches: vec![("hello".to_string(), 3)],
            replicas: vec![
                ("barrel0".to_string(), ReplicaStatus::Stats("Index: 1 words, 1 URLs.".to_string())),
                ("barrel1".to_string(), ReplicaStatus::Inaccessible),
            ],
            response_times: vec![("barrel0".to_string(), 0, 0), ("barrel1".to_string(), 150, 3)],
        };

        let digest = build(&input);
        assert!(digest.contains("'hello': 3 searches"));
        assert!(digest.contains("[barrel1] Inaccessible."));
        assert!(digest.contains("[barrel0] Mean: 0 (total: 0, searches: 0)"));
        assert!(digest.contains("[barrel1] Mean: 50 (total: 150, searches: 3)"));
    }
}
