/// Classification of a huddle-related DM message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuddleAction {
    Joined,
    Ended,
    Activity,
}

impl HuddleAction {
    pub fn label(self) -> &'static str {
        match self {
            HuddleAction::Joined => "joined",
            HuddleAction::Ended => "ended",
            HuddleAction::Activity => "activity",
        }
    }
}

/// One huddle event detected in a DM, ordered by timestamp
#[derive(Debug, Clone)]
pub struct HuddleSession {
    pub participant: String,
    pub time: String,
    pub date: String,
    pub action: HuddleAction,
    pub timestamp: f64,
}
