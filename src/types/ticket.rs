use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a ticket key was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketSource {
    Title,
    Branch,
    Description,
    Commit,
}

impl fmt::Display for TicketSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TicketSource::Title => "title",
            TicketSource::Branch => "branch",
            TicketSource::Description => "description",
            TicketSource::Commit => "commit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketReference {
    /// Always uppercase.
    pub key: String,
    pub source: TicketSource,
    /// 0..=100
    pub confidence: u8,
}
