use std::sync::Arc;

use trustmesh::config::Config;
use trustmesh::matching::{ConnectionGraph, MatchService, MatchingEngine, MemoryConnectionGraph, MemoryOpportunitySource};
use trustmesh::privacy::PrivacyService;

/// Shared application state handed to every worker.
#[derive(Clone)]
pub struct AppState {
    pub privacy: Arc<PrivacyService>,
    pub opportunities: Arc<MemoryOpportunitySource>,
    pub graph: Arc<MemoryConnectionGraph>,
    pub matches: Arc<MatchService>,
}

impl AppState {
    pub fn new(config: &Config) -> trustmesh::Result<Self> {
        let privacy = Arc::new(PrivacyService::new());
        let opportunities = Arc::new(MemoryOpportunitySource::new());
        let graph = Arc::new(MemoryConnectionGraph::new());
        let engine = Arc::new(MatchingEngine::new(
            Arc::clone(&graph) as Arc<dyn ConnectionGraph>,
            &config.matching,
        )?);
        let matches = Arc::new(MatchService::new(engine, Arc::clone(&privacy), opportunities.clone()));
        Ok(Self { privacy, opportunities, graph, matches })
    }
}
