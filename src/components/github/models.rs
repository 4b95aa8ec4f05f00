/// One pull request touched on the report date
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PullRequest {
    pub title: String,
    pub url: String,
    pub state: String,
    pub repo: String,
}
