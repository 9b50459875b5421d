use std::{collections::HashSet, path::PathBuf};

use anyhow::{Context, anyhow};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    provider::{AuthorIdentity, Provider, PublicationStub, Section},
    record::{PublicationRecord, YearBuckets, YearGate},
    render,
};

/// Sections requested for every stub that survives the year gate.
const ENRICH_SECTIONS: &[Section] = &[Section::Bib, Section::Url];

/// What happened to the stubs of one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GroupStats {
    pub kept: usize,
    pub missing_year: usize,
    pub malformed_year: usize,
    pub too_old: usize,
    pub duplicate: usize,
}

impl GroupStats {
    pub fn skipped(&self) -> usize {
        self.missing_year + self.malformed_year + self.too_old + self.duplicate
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub identities: Vec<AuthorIdentity>,
    pub stubs: usize,
    pub stats: GroupStats,
    pub files: Vec<PathBuf>,
}

/// Take the provider's first candidate for `query`.
pub fn resolve_identity(provider: &dyn Provider, query: &str) -> anyhow::Result<AuthorIdentity> {
    provider
        .search_author(query)?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no author found for query {query:?}"))
}

/// Resolve every configured person, in configured order.
pub fn resolve_identities(
    config: &Config,
    provider: &dyn Provider,
) -> anyhow::Result<Vec<AuthorIdentity>> {
    config
        .people
        .iter()
        .map(|person| -> anyhow::Result<AuthorIdentity> {
            let identity = resolve_identity(provider, &config.query_for(person))?;
            info!(%person, id = %identity.id, matched = %identity.name, "resolved author");
            Ok(identity)
        })
        .collect()
}

/// All stubs of all identities, person by person. Shared publications appear once
/// per identity that lists them.
pub fn aggregate(
    provider: &dyn Provider,
    identities: &[AuthorIdentity],
) -> anyhow::Result<Vec<PublicationStub>> {
    let mut all = Vec::new();
    for identity in identities {
        let stubs = provider.publications(identity)?;
        info!(author = %identity.name, count = stubs.len(), "fetched publication list");
        all.extend(stubs);
    }
    Ok(all)
}

/// Gate, enrich and bucket every stub in order.
pub fn normalize_and_group(
    config: &Config,
    provider: &dyn Provider,
    stubs: &[PublicationStub],
    progress: &ProgressBar,
) -> anyhow::Result<(YearBuckets, GroupStats)> {
    let mut buckets = YearBuckets::new();
    let mut stats = GroupStats::default();
    let mut seen: HashSet<(String, i32)> = HashSet::new();

    progress.set_length(stubs.len() as u64);
    for stub in stubs {
        progress.inc(1);

        let year = match YearGate::check(stub.bib.year.as_deref(), config.min_year) {
            YearGate::Keep(year) => year,
            YearGate::Missing => {
                debug!(id = %stub.id, "no year, skipped");
                stats.missing_year += 1;
                continue;
            }
            YearGate::Malformed => {
                progress.suspend(|| {
                    warn!(id = %stub.id, year = ?stub.bib.year, "unparseable year, skipped")
                });
                stats.malformed_year += 1;
                continue;
            }
            YearGate::TooOld(year) => {
                debug!(id = %stub.id, year, "at or before cutoff, skipped");
                stats.too_old += 1;
                continue;
            }
        };

        if config.dedupe && !seen.insert((stub.bib.title.trim().to_lowercase(), year)) {
            debug!(id = %stub.id, "duplicate, skipped");
            stats.duplicate += 1;
            continue;
        }

        let filled = provider
            .enrich(stub, ENRICH_SECTIONS)
            .with_context(|| format!("enrichment failed for {:?}", stub.bib.title))?;
        debug!(id = %filled.id, filled = filled.filled, "enriched");
        buckets.insert(PublicationRecord::from_stub(year, &filled));
        stats.kept += 1;
    }
    progress.finish_and_clear();

    Ok((buckets, stats))
}

/// Run all four stages for one configuration.
pub fn run(
    config: &Config,
    provider: &dyn Provider,
    progress: &ProgressBar,
) -> anyhow::Result<RunSummary> {
    let identities = resolve_identities(config, provider)?;
    let stubs = aggregate(provider, &identities)?;
    info!(count = stubs.len(), "publications to process");

    let (buckets, stats) = normalize_and_group(config, provider, &stubs, progress)?;
    info!(
        kept = stats.kept,
        skipped = stats.skipped(),
        years = ?buckets.years(),
        "grouped publications"
    );

    let files = render::write_buckets(&config.output_dir, &buckets)?;
    Ok(RunSummary {
        identities,
        stubs: stubs.len(),
        stats,
        files,
    })
}
