use serde_json::Value;
use tracing::debug;

use crate::domain::{DatasetSummary, DerivedDataset, SortOrder};
use crate::error::SpotError;
use crate::session::Session;
use crate::transport::PortalTransport;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_SORT_FIELD: &str = "fs.stage_date";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub limit: usize,
    pub skip: usize,
    pub sort_field: String,
    pub sort_order: SortOrder,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_SEARCH_LIMIT,
            skip: 0,
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            sort_order: SortOrder::default(),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_field = field.into();
        self.sort_order = order;
        self
    }
}

impl<T: PortalTransport> Session<T> {
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<DatasetSummary>, SpotError> {
        let url = self.endpoints().search();
        let limit = query.limit.to_string();
        let skip = query.skip.to_string();
        let order = query.sort_order.to_string();
        let results: Option<Vec<DatasetSummary>> = self.get_json(
            &url,
            &[
                ("limitnum", limit.as_str()),
                ("skipnum", skip.as_str()),
                ("sortterm", query.sort_field.as_str()),
                ("sorttype", order.as_str()),
                ("search", query.query.as_str()),
            ],
        )?;
        let results = results.unwrap_or_default();
        debug!(query = %query.query, count = results.len(), "search finished");
        Ok(results)
    }

    pub fn derived_datasets(&self, dataset: &str) -> Result<Vec<DerivedDataset>, SpotError> {
        let path = self.resolve(dataset, None);
        let url = self.endpoints().derived_datasets();
        let derived: Option<Vec<DerivedDataset>> =
            self.get_json(&url, &[("dataset", path.filename())])?;
        Ok(derived.unwrap_or_default())
    }

    pub fn list_images(
        &self,
        dataset: &str,
        username: Option<&str>,
    ) -> Result<Vec<String>, SpotError> {
        let path = self.resolve(dataset, username);
        let url = self.endpoints().list_images(&path);
        let images: Option<Vec<String>> = self.get_json(&url, &[])?;
        Ok(images.unwrap_or_default())
    }

    pub fn attributes(
        &self,
        dataset: &str,
        username: Option<&str>,
        group: Option<&str>,
    ) -> Result<Value, SpotError> {
        let path = self.resolve(dataset, username);
        let url = self.endpoints().attributes(&path);
        self.get_json(&url, &[("group", group.unwrap_or("/"))])
    }

    pub fn tomopy_job(&self, dataset: &str) -> Result<Value, SpotError> {
        let path = self.resolve(dataset, None);
        let url = self.endpoints().tomopy_job();
        self.get_json(&url, &[("dataset", path.filename())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_defaults() {
        let query = SearchQuery::new("end_station=bl832");
        assert_eq!(query.limit, 10);
        assert_eq!(query.skip, 0);
        assert_eq!(query.sort_field, "fs.stage_date");
        assert_eq!(query.sort_order, SortOrder::Desc);

        let paged = query
            .with_limit(50)
            .with_skip(100)
            .with_sort("appmetadata.sdate", SortOrder::Asc);
        assert_eq!((paged.limit, paged.skip), (50, 100));
        assert_eq!(paged.sort_order.to_string(), "asc");
    }
}
