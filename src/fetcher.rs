//! Cursor-paginated fetcher for OpenAlex list endpoints.
//!
//! Pages are requested strictly in cursor order: each cursor comes from the
//! previous response, so there is nothing to parallelise. Failures never
//! escape [`fetch`]; the caller gets whatever was accumulated together with
//! the error that stopped the walk.

use crate::client::OpenAlexClient;
use crate::error::{OpenAlexError, Result};
use crate::work::Record;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

/// Cursor value requesting the first page
pub const START_CURSOR: &str = "*";

/// Maximum results per page (OpenAlex limit)
pub const MAX_PER_PAGE: u32 = 200;

/// Default list endpoint
const WORKS_ENDPOINT: &str = "works";

/// An immutable description of one paginated fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    endpoint: String,
    filter: String,
    per_page: u32,
    item_cap: Option<usize>,
    sort: Option<String>,
    select: Option<String>,
}

impl Query {
    /// Query the works endpoint with `filter`, at the maximum page size.
    pub fn new(filter: impl Into<String>) -> Result<Self> {
        let filter = filter.into();
        if filter.trim().is_empty() {
            return Err(OpenAlexError::Validation("filter must not be empty".to_string()));
        }

        Ok(Self {
            endpoint: WORKS_ENDPOINT.to_string(),
            filter,
            per_page: MAX_PER_PAGE,
            item_cap: None,
            sort: None,
            select: None,
        })
    }

    /// Every work hosted at a source, in any location
    pub fn source_works(source_id: &str) -> Result<Self> {
        Self::new(format!("locations.source.id:{}", source_id.trim()))
    }

    /// Works whose primary location is the source
    pub fn primary_source_works(source_id: &str) -> Result<Self> {
        Self::new(format!("primary_location.source.id:{}", source_id.trim()))
    }

    /// Works with the author among their authorships
    pub fn author_works(author_id: &str) -> Result<Self> {
        Self::new(format!("authorships.author.id:{}", author_id.trim()))
    }

    /// Build a query from a list URL such as a work's `cited_by_api_url`.
    ///
    /// The path names the endpoint; `filter` and `sort` are carried over.
    pub fn from_list_url(list_url: &str) -> Result<Self> {
        let url = Url::parse(list_url).map_err(|e| {
            OpenAlexError::Validation(format!("Invalid list URL {}: {}", list_url, e))
        })?;

        let endpoint = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .unwrap_or(WORKS_ENDPOINT)
            .to_string();

        let mut filter = None;
        let mut sort = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "filter" => filter = Some(value.into_owned()),
                "sort" => sort = Some(value.into_owned()),
                _ => {}
            }
        }

        let filter = filter.ok_or_else(|| {
            OpenAlexError::Validation(format!("List URL has no filter: {}", list_url))
        })?;

        let mut query = Self::new(filter)?;
        query.endpoint = endpoint;
        query.sort = sort;
        Ok(query)
    }

    /// Set the page size (1..=200)
    pub fn per_page(mut self, per_page: u32) -> Result<Self> {
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(OpenAlexError::Validation(format!(
                "per-page must be between 1 and {}, got {}",
                MAX_PER_PAGE, per_page
            )));
        }
        self.per_page = per_page;
        Ok(self)
    }

    /// Stop after this many records
    pub fn item_cap(mut self, cap: usize) -> Result<Self> {
        if cap == 0 {
            return Err(OpenAlexError::Validation("item cap must be positive".to_string()));
        }
        self.item_cap = Some(cap);
        Ok(self)
    }

    /// Server-side sort, e.g. `cited_by_count:desc`
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Restrict returned fields, e.g. `id,title,cited_by_count`
    pub fn select(mut self, fields: impl Into<String>) -> Self {
        self.select = Some(fields.into());
        self
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn page_size(&self) -> u32 {
        self.per_page
    }

    fn page_params(&self, cursor: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("filter", self.filter.clone()),
            ("per-page", self.per_page.to_string()),
            ("cursor", cursor.to_string()),
        ];
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        if let Some(select) = &self.select {
            params.push(("select", select.clone()));
        }
        params
    }
}

/// Records gathered by [`fetch`] and how the walk ended
#[derive(Debug)]
pub struct FetchOutcome {
    /// Records in server order
    pub records: Vec<Record>,
    /// Pages successfully fetched
    pub pages: usize,
    /// Error that stopped the walk early, if any
    pub failure: Option<OpenAlexError>,
}

impl FetchOutcome {
    /// True when every page up to the end (or the cap) was retrieved
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Treat an incomplete walk as an error, dropping the partial records.
    pub fn into_result(self) -> Result<Vec<Record>> {
        match self.failure {
            Some(e) => Err(e),
            None => Ok(self.records),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    #[serde(default)]
    meta: PageMeta,
    results: Vec<Record>,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    count: Option<u64>,
    next_cursor: Option<String>,
}

fn parse_page(value: Value) -> Result<PageResponse> {
    serde_json::from_value(value)
        .map_err(|e| OpenAlexError::Parse(format!("Malformed OpenAlex page: {}", e)))
}

/// Walk every page of `query`, following the server's cursor.
///
/// Stops at the end of the result set, at the item cap, or at the first
/// request that fails after the client's retries.
pub async fn fetch(client: &OpenAlexClient, query: &Query) -> FetchOutcome {
    info!(
        endpoint = %query.endpoint,
        filter = %query.filter,
        per_page = query.per_page,
        cap = ?query.item_cap,
        "Starting OpenAlex fetch"
    );

    let mut records: Vec<Record> = Vec::new();
    let mut pages = 0;
    let mut cursor = START_CURSOR.to_string();

    let failure = loop {
        let page = match client
            .get_json(&query.endpoint, &query.page_params(&cursor))
            .await
            .and_then(parse_page)
        {
            Ok(page) => page,
            Err(e) => {
                warn!(
                    page = pages + 1,
                    fetched = records.len(),
                    error = %e,
                    "Fetch stopped early"
                );
                break Some(e);
            }
        };

        pages += 1;
        if pages == 1 {
            if let Some(count) = page.meta.count {
                info!(available = count, "OpenAlex result set size");
            }
        }

        let count = page.results.len();
        records.extend(page.results);
        debug!(
            page = pages,
            count = count,
            total = records.len(),
            next_cursor = ?page.meta.next_cursor,
            "Fetched page"
        );

        if let Some(cap) = query.item_cap {
            if records.len() >= cap {
                records.truncate(cap);
                break None;
            }
        }

        match page.meta.next_cursor.filter(|next| !next.is_empty()) {
            Some(next) => cursor = next,
            None => break None,
        }
    };

    info!(
        pages = pages,
        total = records.len(),
        complete = failure.is_none(),
        "OpenAlex fetch finished"
    );

    FetchOutcome {
        records,
        pages,
        failure,
    }
}
