use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use super::{Column, Criterion, DEFAULT_PAGE_SIZE, FilterOp, QueryRequest, Row};
use crate::channel::Connection;
use crate::error::{AdminError, AdminResult, RemoteError};

/// How many rows a query produced, without treating zero or many as an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cardinality<T> {
    None,
    One(T),
    Many,
}

/// Fluent builder for catalog queries
#[derive(Clone)]
pub struct QueryBuilder<'c> {
    connection: &'c dyn Connection,
    columns: Vec<Column>,
    criteria: Vec<Criterion>,
    limit: Option<usize>,
    page_size: usize,
}

impl<'c> QueryBuilder<'c> {
    pub fn new(connection: &'c dyn Connection, columns: &[Column]) -> Self {
        Self {
            connection,
            columns: columns.to_vec(),
            criteria: Vec::new(),
            limit: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Add a filter term; all terms must hold for a row to match
    pub fn filter(mut self, column: Column, op: FilterOp, value: impl Into<String>) -> Self {
        self.criteria.push(Criterion {
            column,
            op,
            value: value.into(),
        });
        self
    }

    pub fn filter_eq(self, column: Column, value: impl Into<String>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    /// Stop after `limit` rows in total
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Validate the query and return a lazy result set. No request is sent
    /// until the first row is pulled.
    pub fn execute(self) -> AdminResult<ResultSet<'c>> {
        if self.columns.is_empty() {
            return Err(AdminError::InvalidArgument(
                "query must project at least one column".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(AdminError::InvalidArgument(
                "page size must be greater than zero".to_string(),
            ));
        }
        let request = QueryRequest {
            columns: self.columns.clone(),
            criteria: self.criteria,
            limit: self.limit,
            page_size: self.page_size,
            continuation: None,
        };
        Ok(ResultSet {
            connection: self.connection,
            columns: Arc::from(self.columns),
            request,
            buffer: VecDeque::new(),
            yielded: 0,
            exhausted: false,
        })
    }

    /// Collect every matching row
    pub fn all(self) -> AdminResult<Vec<Row>> {
        self.execute()?.collect()
    }

    pub fn first(self) -> AdminResult<Option<Row>> {
        self.limit(1).execute()?.next().transpose()
    }

    /// Classify the result as none, exactly one, or many rows.
    /// Fetches at most two rows.
    pub fn cardinality(self) -> AdminResult<Cardinality<Row>> {
        let capped = match self.limit {
            Some(limit) => limit.min(2),
            None => 2,
        };
        let mut rows = self.limit(capped).execute()?;
        let Some(first) = rows.next().transpose()? else {
            return Ok(Cardinality::None);
        };
        match rows.next().transpose()? {
            None => Ok(Cardinality::One(first)),
            Some(_) => Ok(Cardinality::Many),
        }
    }

    /// The single matching row; zero or several rows are errors
    pub fn one(self) -> AdminResult<Row> {
        match self.cardinality()? {
            Cardinality::One(row) => Ok(row),
            Cardinality::None => Err(AdminError::NoResultFound),
            Cardinality::Many => Err(AdminError::MultipleResultsFound),
        }
    }
}

/// Lazily paged query results. Finite and not restartable: once a row has
/// been yielded it is gone.
pub struct ResultSet<'c> {
    connection: &'c dyn Connection,
    columns: Arc<[Column]>,
    request: QueryRequest,
    buffer: VecDeque<Vec<String>>,
    yielded: usize,
    exhausted: bool,
}

impl ResultSet<'_> {
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    fn fetch_page(&mut self) -> AdminResult<()> {
        debug!(
            "Fetching query page (continuation: {:?}, {} criteria)",
            self.request.continuation,
            self.request.criteria.len()
        );
        let page = self.connection.execute_query(&self.request)?;
        match page.continuation {
            Some(token) if page.rows.is_empty() => {
                return Err(RemoteError::Protocol(format!(
                    "empty page carried continuation token {token}"
                ))
                .into());
            }
            Some(token) => self.request.continuation = Some(token),
            None => self.exhausted = true,
        }
        self.buffer.extend(page.rows);
        Ok(())
    }
}

impl Iterator for ResultSet<'_> {
    type Item = AdminResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.request.limit.is_some_and(|limit| self.yielded >= limit) {
                return None;
            }
            if let Some(values) = self.buffer.pop_front() {
                if values.len() != self.columns.len() {
                    self.exhausted = true;
                    self.buffer.clear();
                    return Some(Err(RemoteError::Protocol(format!(
                        "row has {} values for {} columns",
                        values.len(),
                        self.columns.len()
                    ))
                    .into()));
                }
                self.yielded += 1;
                return Some(Ok(Row::new(self.columns.clone(), values)));
            }
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
    }
}
