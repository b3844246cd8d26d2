use crate::cache::ConstructCache;
use crate::config::ScanConfig;
use crate::context::{Evaluation, ScanContext};
use crate::error::{DetectorError, Result};
use crate::line_tracker::evaluate_lines;
use crate::matcher::evaluate_semantic;
use crate::provider::ContentProvider;
use crate::result::ScanResult;
use crate::subscription::Subscription;
use codesub_constructs::IndexerPool;
use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;

/// Diff evidence for one scan, supplied by the caller's VCS layer
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    pub base_ref: &'a str,
    /// `None` scans against the working tree
    pub target_ref: Option<&'a str>,
    /// `git diff -U0` output
    pub diff_text: &'a str,
    /// `git diff --name-status -M` output
    pub name_status_text: &'a str,
}

impl<'a> ScanRequest<'a> {
    pub fn new(base_ref: &'a str, diff_text: &'a str, name_status_text: &'a str) -> Self {
        Self {
            base_ref,
            target_ref: None,
            diff_text,
            name_status_text,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target_ref: &'a str) -> Self {
        self.target_ref = Some(target_ref);
        self
    }
}

/// Change detector: runs subscriptions against one diff
#[derive(Debug, Clone, Default)]
pub struct Detector {
    config: ScanConfig,
}

impl Detector {
    /// Create a detector with a validated config
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate().map_err(DetectorError::InvalidConfig)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Scan with a fresh per-scan cache
    pub fn scan(
        &self,
        request: &ScanRequest<'_>,
        subscriptions: &[Subscription],
        provider: &dyn ContentProvider,
    ) -> Result<ScanResult> {
        let cache = ConstructCache::new();
        self.scan_with_cache(request, subscriptions, provider, &cache)
    }

    /// Scan reusing `cache`.
    ///
    /// The cache is keyed by revision and path only, so it must not outlive the content
    /// the provider serves for those keys.
    pub fn scan_with_cache(
        &self,
        request: &ScanRequest<'_>,
        subscriptions: &[Subscription],
        provider: &dyn ContentProvider,
        cache: &ConstructCache,
    ) -> Result<ScanResult> {
        validate_all(subscriptions)?;

        let start = Instant::now();
        let ctx = ScanContext::new(
            request.diff_text,
            request.name_status_text,
            request.target_ref,
            &self.config,
            provider,
            cache,
        );

        let active: Vec<&Subscription> = subscriptions.iter().filter(|s| s.active).collect();
        let evaluations: Vec<Evaluation> = if self.config.parallel {
            active
                .par_iter()
                .map_init(IndexerPool::new, |pool, sub| evaluate(sub, &ctx, pool))
                .collect()
        } else {
            let mut pool = IndexerPool::new();
            active
                .iter()
                .map(|sub| evaluate(sub, &ctx, &mut pool))
                .collect()
        };

        let mut result = ScanResult {
            base_ref: request.base_ref.to_string(),
            target_ref: request.target_ref.map(str::to_string),
            triggers: Vec::new(),
            proposals: Vec::new(),
            unchanged: Vec::new(),
        };
        for (sub, evaluation) in active.into_iter().zip(evaluations) {
            if evaluation.is_unchanged() {
                result.unchanged.push(sub.clone());
                continue;
            }
            result.triggers.extend(evaluation.trigger);
            result.proposals.extend(evaluation.proposal);
        }

        log::info!(
            "Scanned {} subscriptions against {}..{} in {:?}: {} triggers, {} proposals, {} unchanged ({} files indexed)",
            subscriptions.len(),
            request.base_ref,
            request.target_ref.unwrap_or("working tree"),
            start.elapsed(),
            result.triggers.len(),
            result.proposals.len(),
            result.unchanged.len(),
            cache.len()
        );

        Ok(result)
    }
}

/// Scan with the default config
pub fn scan(
    request: &ScanRequest<'_>,
    subscriptions: &[Subscription],
    provider: &dyn ContentProvider,
) -> Result<ScanResult> {
    Detector::default().scan(request, subscriptions, provider)
}

fn evaluate(sub: &Subscription, ctx: &ScanContext<'_>, pool: &mut IndexerPool) -> Evaluation {
    match &sub.semantic {
        Some(target) => evaluate_semantic(sub, target, ctx, pool),
        None => evaluate_lines(sub, ctx),
    }
}

/// Reject the whole batch before any evaluation starts
fn validate_all(subscriptions: &[Subscription]) -> Result<()> {
    let mut seen = HashSet::new();
    for sub in subscriptions {
        sub.validate()?;
        if !seen.insert(sub.id.as_str()) {
            return Err(DetectorError::DuplicateSubscription(sub.id.clone()));
        }
    }
    Ok(())
}
