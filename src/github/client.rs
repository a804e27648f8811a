//! GitHub REST API client.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::platform::{NewPullRequest, PullRequest, ReviewPlatform};
use crate::config::RepoSlug;
use crate::error::GitHubError;

/// Media type that makes the pulls endpoint return the raw diff
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.diff";

/// Page size for list endpoints (the API maximum)
const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct Branch {
    name: String,
}

/// Asynchronous GitHub REST API client.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, GitHubError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("patch-propagator/", env!("CARGO_PKG_VERSION"))),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        debug!(api_url = %api_url, "created GitHubClient");
        Ok(Self {
            http,
            api_url,
            token: token.into(),
        })
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, GitHubError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        match status {
            // The primary rate limit answers 403 with no requests remaining
            StatusCode::FORBIDDEN if header(&resp, "x-ratelimit-remaining") == Some("0") => {
                Err(GitHubError::RateLimited {
                    reset_at: rate_limit_reset(&resp),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(GitHubError::AuthenticationFailed(format!("HTTP {}", status)))
            }
            StatusCode::NOT_FOUND => Err(GitHubError::NotFound(resp.url().path().to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(GitHubError::RateLimited {
                reset_at: rate_limit_reset(&resp),
            }),
            _ => {
                let body = resp.text().await.unwrap_or_default();
                Err(GitHubError::ApiError {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }
}

fn header<'a>(resp: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

fn rate_limit_reset(resp: &reqwest::Response) -> String {
    header(resp, "x-ratelimit-reset")
        .unwrap_or("unknown")
        .to_string()
}

#[async_trait]
impl ReviewPlatform for GitHubClient {
    #[instrument(skip(self), fields(repo = %repo))]
    async fn pull_request(&self, repo: &RepoSlug, number: u64) -> Result<PullRequest, GitHubError> {
        let url = format!("{}/repos/{}/pulls/{}", self.api_url, repo, number);
        let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let resp = Self::check_response(resp).await?;
        let pr: PullRequest = resp
            .json()
            .await
            .map_err(|e| GitHubError::ParseError(e.to_string()))?;
        debug!(number = pr.number, base = %pr.base.ref_name, "fetched pull request");
        Ok(pr)
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn pull_request_diff(&self, repo: &RepoSlug, number: u64) -> Result<String, GitHubError> {
        info!("Getting diff from PR ...");
        let url = format!("{}/repos/{}/pulls/{}", self.api_url, repo, number);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(ACCEPT, DIFF_MEDIA_TYPE)
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        let diff = resp.text().await?;
        debug!(bytes = diff.len(), "fetched diff");
        Ok(diff)
    }

    #[instrument(skip(self), fields(repo = %repo))]
    async fn list_branches(&self, repo: &RepoSlug) -> Result<Vec<String>, GitHubError> {
        let url = format!("{}/repos/{}/branches", self.api_url, repo);
        let mut names = Vec::new();
        let mut page = 1usize;

        loop {
            let resp = self
                .http
                .get(&url)
                .bearer_auth(&self.token)
                .query(&[("per_page", PER_PAGE), ("page", page)])
                .send()
                .await?;
            let resp = Self::check_response(resp).await?;
            let branches: Vec<Branch> = resp
                .json()
                .await
                .map_err(|e| GitHubError::ParseError(e.to_string()))?;
            let count = branches.len();
            names.extend(branches.into_iter().map(|b| b.name));
            if count < PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(count = names.len(), "fetched branches");
        Ok(names)
    }

    #[instrument(skip(self, request), fields(repo = %repo, head = %request.head, base = %request.base))]
    async fn create_pull_request(
        &self,
        repo: &RepoSlug,
        request: &NewPullRequest,
    ) -> Result<PullRequest, GitHubError> {
        info!("Creating PR ...");
        let url = format!("{}/repos/{}/pulls", self.api_url, repo);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        let pr: PullRequest = resp
            .json()
            .await
            .map_err(|e| GitHubError::ParseError(e.to_string()))?;
        info!("PR {} created: {}", pr.number, pr.html_url);
        Ok(pr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        let client = GitHubClient::new("https://api.github.com/", "t").unwrap();
        assert_eq!(client.api_url, "https://api.github.com");
    }

    #[test]
    fn test_debug_hides_token() {
        let client = GitHubClient::new("https://api.github.com", "ghp_secret").unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("ghp_secret"));
    }

    #[test]
    fn test_new_pull_request_payload() {
        let request = NewPullRequest {
            title: "t".to_string(),
            body: "b".to_string(),
            head: "alice:3_ch-update".to_string(),
            base: "3_ch".to_string(),
            draft: true,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["head"], "alice:3_ch-update");
        assert_eq!(json["draft"], true);
    }
}
