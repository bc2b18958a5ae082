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

//! Default values for optional configuration keys, following the
//! enumerated configuration surface: everything not marked required there
//! gets a named default function here rather than a bare literal in the
//! struct definition.

pub struct Bloom;

impl Bloom {
    pub fn expected_elements() -> u64 {
        100_000
    }

    pub fn false_positive_rate() -> f64 {
        0.01
    }
}

pub struct Statistics;

impl Statistics {
    /// Stats push tick, in milliseconds.
    pub fn monitor_interval_ms() -> u64 {
        3_000
    }
}

pub struct Barrel;

impl Barrel {
    /// Primary snapshot interval, in seconds.
    pub fn autosave_interval_secs() -> u64 {
        60
    }
}

pub struct Downloader;

impl Downloader {
    pub fn threads() -> usize {
        2
    }
}

pub struct Barrels;

impl Barrels {
    pub fn host() -> String {
        "127.0.0.1".to_string()
    }
}
