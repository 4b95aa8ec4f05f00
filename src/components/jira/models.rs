/// One issue currently sitting in an active board column
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct JiraIssue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub updated: String,
}

/// A status transition recorded in an issue's changelog
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatusChange {
    pub from: String,
    pub to: String,
    pub time: String,
}

/// An issue that moved between columns on the report date
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IssueMovement {
    pub key: String,
    pub summary: String,
    pub changes: Vec<StatusChange>,
}

/// Everything the Jira section reports
#[derive(Debug, Clone, Default)]
pub struct JiraStatus {
    pub current_status: Vec<JiraIssue>,
    pub movements: Vec<IssueMovement>,
}
