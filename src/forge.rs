use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Page, PrSummary, PullRequest, Repository};

/// The three remote calls the listing pipeline needs.
#[async_trait]
pub trait Forge: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn list_repos(&self, org: &str, page: u32) -> Result<Page<Repository>>;
    async fn list_prs(&self, org: &str, repo: &str, page: u32) -> Result<Page<PrSummary>>;
    async fn get_pr(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest>;
}
