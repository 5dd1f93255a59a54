//! One interaction context: active query, last page, selection.
//!
//! Every search or page change takes a new generation number. An outcome is
//! applied only if it still carries the current generation, so a slow
//! response to an abandoned request can never overwrite newer results.

use crate::error::{CatalogError, Result};
use crate::export::{ExportReport, SelectionExportCoordinator, SelectionSet};
use crate::federated::{PaginationController, SearchOrchestrator, SearchResultPage};
use crate::query::{CanonicalQuery, Source};
use crate::ExportSink;
use tracing::debug;

/// A pending search, detached from the session so it can be spawned.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    generation: u64,
    query: CanonicalQuery,
    sources: Vec<Source>,
}

impl SearchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> &CanonicalQuery {
        &self.query
    }

    pub async fn run(self, orchestrator: SearchOrchestrator) -> SearchOutcome {
        let result = orchestrator.run(&self.query, &self.sources).await;
        self.finish(result)
    }

    /// Wrap a result obtained elsewhere as this ticket's outcome.
    pub fn finish(self, result: Result<SearchResultPage>) -> SearchOutcome {
        SearchOutcome {
            generation: self.generation,
            query: self.query,
            result,
        }
    }
}

/// A finished search, tagged with the generation that started it.
#[derive(Debug)]
pub struct SearchOutcome {
    pub generation: u64,
    /// The query the result answers
    pub query: CanonicalQuery,
    pub result: Result<SearchResultPage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Applied,
    /// A newer request was started; this outcome was dropped
    Stale,
}

pub struct SearchSession {
    orchestrator: SearchOrchestrator,
    generation: u64,
    query: Option<CanonicalQuery>,
    sources: Vec<Source>,
    page: Option<SearchResultPage>,
    selection: SelectionSet,
}

impl SearchSession {
    pub fn new(orchestrator: SearchOrchestrator) -> Self {
        Self {
            orchestrator,
            generation: 0,
            query: None,
            sources: Vec::new(),
            page: None,
            selection: SelectionSet::new(),
        }
    }

    pub fn orchestrator(&self) -> &SearchOrchestrator {
        &self.orchestrator
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn query(&self) -> Option<&CanonicalQuery> {
        self.query.as_ref()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn current_page(&self) -> Option<&SearchResultPage> {
        self.page.as_ref()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionSet {
        &mut self.selection
    }

    /// Start a new search. Clears the selection and the previous page.
    pub fn begin_search(&mut self, query: CanonicalQuery, sources: Vec<Source>) -> SearchTicket {
        self.generation += 1;
        self.selection.clear();
        self.page = None;
        self.query = Some(query.clone());
        self.sources = sources.clone();
        debug!(generation = self.generation, "search started");
        SearchTicket {
            generation: self.generation,
            query,
            sources,
        }
    }

    /// Start a page change on the active query. The selection is kept.
    ///
    /// The active query only moves once the outcome is applied, so a failed
    /// page change leaves the query and the shown page in step.
    pub fn begin_page(&mut self, page_number: u32) -> Result<SearchTicket> {
        let query = self
            .query
            .as_ref()
            .ok_or_else(|| CatalogError::InvalidInput("no active search".into()))?;
        let next = match &self.page {
            Some(page) => PaginationController::go_to(query, page_number, &page.page),
            None => query.with_page(page_number),
        };
        self.generation += 1;
        debug!(generation = self.generation, page = next.page_number(), "page change started");
        Ok(SearchTicket {
            generation: self.generation,
            query: next,
            sources: self.sources.clone(),
        })
    }

    /// Apply an outcome if it is still current.
    ///
    /// A current failure is returned as the error; a stale one is dropped.
    pub fn complete(&mut self, outcome: SearchOutcome) -> Result<CompletionStatus> {
        if outcome.generation != self.generation {
            debug!(
                stale = outcome.generation,
                current = self.generation,
                "discarding outdated search outcome"
            );
            return Ok(CompletionStatus::Stale);
        }
        let page = outcome.result?;
        self.query = Some(outcome.query);
        self.page = Some(page);
        Ok(CompletionStatus::Applied)
    }

    /// Run a new search to completion.
    pub async fn search(&mut self, query: CanonicalQuery, sources: Vec<Source>) -> Result<&SearchResultPage> {
        let ticket = self.begin_search(query, sources);
        let outcome = ticket.run(self.orchestrator.clone()).await;
        self.complete(outcome)?;
        self.current()
    }

    /// Move the active search to another page and run it.
    pub async fn go_to_page(&mut self, page_number: u32) -> Result<&SearchResultPage> {
        let ticket = self.begin_page(page_number)?;
        let outcome = ticket.run(self.orchestrator.clone()).await;
        self.complete(outcome)?;
        self.current()
    }

    pub async fn next_page(&mut self) -> Result<Option<&SearchResultPage>> {
        let next = match (&self.query, &self.page) {
            (Some(query), Some(page)) => PaginationController::next(query, &page.page),
            _ => None,
        };
        match next {
            Some(query) => self.go_to_page(query.page_number()).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn previous_page(&mut self) -> Result<Option<&SearchResultPage>> {
        match self.query.as_ref().and_then(PaginationController::previous) {
            Some(query) => self.go_to_page(query.page_number()).await.map(Some),
            None => Ok(None),
        }
    }

    /// Export the current selection against the last fetched page.
    pub async fn export(
        &self,
        coordinator: &SelectionExportCoordinator,
        active_source: Source,
        sink: &mut ExportSink<'_>,
    ) -> Result<ExportReport> {
        let (Some(query), Some(page)) = (&self.query, &self.page) else {
            return Err(CatalogError::InvalidInput("no results to export".into()));
        };
        coordinator
            .export(&self.selection, active_source, page, query, sink)
            .await
    }

    fn current(&self) -> Result<&SearchResultPage> {
        self.page
            .as_ref()
            .ok_or_else(|| CatalogError::InvalidInput("no results".into()))
    }
}
