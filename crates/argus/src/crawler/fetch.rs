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

//! The page-fetch collaborator contract (spec §2 component A). Out of scope
//! per spec §1, but a default implementation is supplied so the crawler runs
//! end to end: a plain `reqwest` GET parsed with `kuchiki`.

use std::collections::HashSet;

use kuchiki::traits::TendrilSink;

pub struct FetchedPage {
    pub title: String,
    /// Full token stream, already lower-cased (case folding is normative,
    /// spec §3); the caller decides how much of it to keep for terms vs.
    /// snippet.
    pub tokens: Vec<String>,
    pub outgoing_links: HashSet<String>,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchedPage>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder()
                .user_agent("argus-crawler/0.1")
                .build()?,
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<FetchedPage> {
        let base = url::Url::parse(url)?;
        let body = self.client.get(url).send().await?.text().await?;

        let document = kuchiki::parse_html().one(body);

        let title = document
            .select_first("title")
            .map(|t| t.text_contents().trim().to_string())
            .unwrap_or_default();

        let text = document.text_contents();
        let tokens: Vec<String> = text
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let mut outgoing_links = HashSet::new();
        if let Ok(anchors) = document.select("a[href]") {
            for anchor in anchors {
                let attrs = anchor.attributes.borrow();
                if let Some(href) = attrs.get("href") {
                    if let Ok(absolute) = base.join(href) {
                        outgoing_links.insert(absolute.to_string());
                    }
                }
            }
        }

        Ok(FetchedPage {
            title,
            tokens,
            outgoing_links,
        })
    }
}
