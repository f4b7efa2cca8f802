use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-unique identifier handed back to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryId(pub u64);

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One submitted search request. `response` is set once, by the worker that ran it.
#[derive(Debug, Clone)]
pub struct Query {
    pub id: QueryId,
    pub text: String,
    pub response: Option<LookupResult>,
}

impl Query {
    pub fn new(id: QueryId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            response: None,
        }
    }

    /// Address lines of the attached response, in item order.
    pub fn address_lines(&self) -> Option<Vec<String>> {
        self.response.as_ref().map(LookupResult::address_lines)
    }
}

/// Search response as returned by the lookup service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    #[serde(default)]
    pub start_index: u64,
    #[serde(default)]
    pub end_index: u64,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl LookupResult {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<Item> = lines.into_iter().map(Item::new).collect();
        Self {
            start_index: 0,
            end_index: items.len() as u64,
            items,
        }
    }

    pub fn address_lines(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.address.address_line.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub address: Address,
}

impl Item {
    pub fn new(address_line: impl Into<String>) -> Self {
        Self {
            address: Address {
                address_line: address_line.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "address_line_1", default)]
    pub address_line: String,
}

/// Counters describing pipeline throughput since start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub submitted: u64,
    pub dispatched: u64,
    pub completed: u64,
    pub dropped: u64,
}

impl EngineStats {
    /// Queries that were dispatched but have neither landed nor been dropped.
    pub fn in_flight(&self) -> u64 {
        self.dispatched
            .saturating_sub(self.completed)
            .saturating_sub(self.dropped)
    }
}
