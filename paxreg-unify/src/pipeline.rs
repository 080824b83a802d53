//! Full registry build: optional reset, consolidation, cluster merge
//!
//! The two phases commit separately. A failure during the merge leaves the
//! consolidated but unmerged table, which a later `merge` run can finish.

use crate::cluster::{ClusterMerger, MergeReport};
use crate::consolidate::{ConsolidationReport, Consolidator};
use paxreg_common::db::RegistryStore;
use paxreg_common::{Result, SourceKind};
use serde::Serialize;
use tracing::info;

/// Options for one pipeline run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Drop the Person table before consolidating
    pub fresh: bool,
    /// Source processing order
    pub sources: Vec<SourceKind>,
    /// Run the cluster merge after consolidation
    pub merge: bool,
    /// VACUUM after a merge that deleted rows
    pub vacuum: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fresh: false,
            sources: SourceKind::DEFAULT_ORDER.to_vec(),
            merge: true,
            vacuum: true,
        }
    }
}

/// Combined report of a pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub consolidation: ConsolidationReport,
    pub merge: Option<MergeReport>,
    pub persons: i64,
}

/// Consolidate every configured source, then merge duplicate clusters
pub async fn run(store: &RegistryStore, options: &RunOptions) -> Result<RunReport> {
    let consolidator = Consolidator::new(options.sources.clone())?;

    if options.fresh {
        info!("Fresh run: clearing Person table");
        store.reset().await?;
    }

    let consolidation = consolidator.run(store).await?;

    let merge = if options.merge {
        let merger = ClusterMerger::new().with_vacuum(options.vacuum);
        Some(merger.run(store).await?)
    } else {
        info!("Cluster merge skipped");
        None
    };

    let persons = store.person_count().await?;
    info!("Registry holds {} persons", persons);

    Ok(RunReport {
        consolidation,
        merge,
        persons,
    })
}
