use async_trait::async_trait;
use octocrab::Octocrab;

use crate::error::{GhprsError, Result};
use crate::forge::Forge;
use crate::types::{Page, PrSummary, PullRequest, Repository};

/// Largest page size the GitHub REST API accepts.
const PER_PAGE: u8 = 100;

pub struct GitHub {
    client: Octocrab,
}

impl std::fmt::Debug for GitHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHub").finish_non_exhaustive()
    }
}

impl From<octocrab::Error> for GhprsError {
    fn from(err: octocrab::Error) -> Self {
        GhprsError::Api(err.to_string())
    }
}

impl GitHub {
    pub fn new(token: String) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token)
            .build()
            .map_err(|e| GhprsError::Auth(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Forge for GitHub {
    fn name(&self) -> &str {
        "GitHub"
    }

    async fn list_repos(&self, org: &str, page: u32) -> Result<Page<Repository>> {
        let repos = self
            .client
            .orgs(org)
            .list_repos()
            .per_page(PER_PAGE)
            .page(page)
            .send()
            .await?;

        let has_next = repos.next.is_some();
        let items = repos
            .items
            .into_iter()
            .map(|repo| Repository {
                language: repo
                    .language
                    .as_ref()
                    .and_then(|lang| lang.as_str())
                    .map(str::to_string),
                name: repo.name,
            })
            .collect();

        Ok(Page { items, has_next })
    }

    async fn list_prs(&self, org: &str, repo: &str, page: u32) -> Result<Page<PrSummary>> {
        let prs = self
            .client
            .pulls(org, repo)
            .list()
            .state(octocrab::params::State::Open)
            .per_page(PER_PAGE)
            .page(page)
            .send()
            .await?;

        let has_next = prs.next.is_some();
        let items = prs
            .items
            .into_iter()
            .map(|pr| PrSummary { number: pr.number })
            .collect();

        Ok(Page { items, has_next })
    }

    async fn get_pr(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest> {
        let pr = self.client.pulls(org, repo).get(number).await?;

        Ok(PullRequest {
            number: pr.number,
            title: pr.title.unwrap_or_default(),
            mergeable: pr.mergeable,
            updated_at: pr.updated_at.unwrap_or_else(chrono::Utc::now),
        })
    }
}
