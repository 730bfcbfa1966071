//! List query parsing and the ListResponse envelope (§6, §4.5).

use serde::Deserialize;
use serde_json::Value;

use crate::error::AppResult;
use crate::filter::parse_filter;
use crate::model::ListResponse;
use crate::store::{SearchPage, SearchParams};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
    #[serde(rename = "startIndex")]
    pub start_index: Option<i64>,
    pub count: Option<i64>,
}

const MAX_PAGE_SIZE: i64 = 200;
const DEFAULT_PAGE_SIZE: i64 = 100;

impl ListQuery {
    pub fn into_search_params(self) -> AppResult<SearchParams> {
        let filter = match self.filter {
            Some(raw) if !raw.trim().is_empty() => Some(parse_filter(&raw)?),
            _ => None,
        };
        Ok(SearchParams {
            filter,
            start_index: self.start_index.unwrap_or(1).max(1),
            count: self.count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(0, MAX_PAGE_SIZE),
        })
    }
}

pub fn list_response_json(page: SearchPage, params: &SearchParams) -> Value {
    let count = page.resources.len() as i64;
    let response = ListResponse::new(page.resources, page.total, params.start_index, count);
    serde_json::to_value(response).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_clamped_to_max_page_size() {
        let params = ListQuery {
            filter: None,
            start_index: None,
            count: Some(10_000),
        }
        .into_search_params()
        .unwrap();
        assert_eq!(params.count, MAX_PAGE_SIZE);
    }

    #[test]
    fn start_index_below_one_is_clamped_to_one() {
        let params = ListQuery {
            filter: None,
            start_index: Some(-5),
            count: None,
        }
        .into_search_params()
        .unwrap();
        assert_eq!(params.start_index, 1);
    }

    #[test]
    fn blank_filter_is_treated_as_absent() {
        let params = ListQuery {
            filter: Some("   ".to_string()),
            start_index: None,
            count: None,
        }
        .into_search_params()
        .unwrap();
        assert!(params.filter.is_none());
    }
}
