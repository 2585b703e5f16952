use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{GhprsError, Result};
use crate::event::Event;
use crate::forge::Forge;
use crate::render::Renderer;
use crate::stream;
use crate::types::{
    AnnotatedPullRequest, ErrorPolicy, Repository, RunStats, StalenessThreshold, Whitelist,
};

/// Walks an organization's repositories and renders each one's open pull
/// requests, one repository at a time.
pub struct Lister<R> {
    forge: Arc<dyn Forge>,
    organization: String,
    renderer: R,
    threshold: StalenessThreshold,
    policy: ErrorPolicy,
}

impl<R: Renderer> Lister<R> {
    pub fn new(
        forge: Arc<dyn Forge>,
        organization: String,
        renderer: R,
        threshold: StalenessThreshold,
    ) -> Self {
        Self {
            forge,
            organization,
            renderer,
            threshold,
            policy: ErrorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[cfg(test)]
    pub fn into_renderer(self) -> R {
        self.renderer
    }

    /// Lists every repository admitted by `whitelist`. Under
    /// [`ErrorPolicy::Abort`] the first error from any listing ends the run;
    /// dropping the open feeds cancels whatever they still had in flight.
    pub async fn run(&mut self, whitelist: &Whitelist) -> Result<RunStats> {
        let mut stats = RunStats::default();
        let mut repos = stream::repositories(Arc::clone(&self.forge), self.organization.clone());

        loop {
            match repos.next().await {
                Event::Item(repo) => {
                    stats.repositories_seen += 1;
                    if !whitelist.admits(&repo.name) {
                        debug!(repo = %repo.name, "not in whitelist, skipping");
                        continue;
                    }
                    self.list_repository(&repo, &mut stats).await?;
                }
                Event::Error(err) => self.tolerate(err, &mut stats)?,
                Event::Done => break,
            }
        }

        info!(
            seen = stats.repositories_seen,
            listed = stats.repositories_listed,
            pull_requests = stats.pull_requests,
            errors = stats.errors,
            "listing complete"
        );
        Ok(stats)
    }

    async fn list_repository(&mut self, repo: &Repository, stats: &mut RunStats) -> Result<()> {
        self.renderer
            .begin_repository(&repo.name, repo.display_language())?;
        stats.repositories_listed += 1;

        let mut prs = stream::pull_requests(
            Arc::clone(&self.forge),
            self.organization.clone(),
            repo.name.clone(),
        );

        loop {
            match prs.next().await {
                Event::Item(pr) => {
                    let annotated = AnnotatedPullRequest::new(pr, self.threshold);
                    self.renderer.pull_request(&annotated)?;
                    stats.pull_requests += 1;
                }
                Event::Error(err) => self.tolerate(err, stats)?,
                Event::Done => return Ok(()),
            }
        }
    }

    fn tolerate(&self, err: GhprsError, stats: &mut RunStats) -> Result<()> {
        match self.policy {
            ErrorPolicy::Abort => Err(err),
            ErrorPolicy::Continue => {
                warn!(error = %err, "continuing past error");
                stats.errors += 1;
                Ok(())
            }
        }
    }
}
