//! Card search: list-line parsing and search query construction

use serde::Deserialize;

/// A card identity as written on one line of a card list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CardQuery {
    /// Card name
    pub name: String,
    /// Set code, only meaningful together with `number`
    pub set_code: Option<String>,
    /// Collector number, only meaningful together with `set_code`
    pub number: Option<String>,
}

impl CardQuery {
    /// Query constrained by name only
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            set_code: None,
            number: None,
        }
    }

    /// Query constrained by name, set and collector number
    pub fn printing(
        name: impl Into<String>,
        set_code: impl Into<String>,
        number: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            set_code: Some(set_code.into()),
            number: Some(number.into()),
        }
    }

    /// Scryfall search syntax for this query
    ///
    /// `name:"<name>" set:<code> number:<number>` when both set and number are
    /// known, `name:"<name>"` otherwise.
    pub fn to_query_string(&self) -> String {
        match (&self.set_code, &self.number) {
            (Some(set), Some(number)) => {
                format!("name:\"{}\" set:{} number:{}", self.name, set, number)
            }
            _ => format!("name:\"{}\"", self.name),
        }
    }
}

/// Parse one card-list line
///
/// Tokens are split on whitespace. With fewer than three tokens the whole line
/// is the name. Otherwise the last two tokens are the set code and collector
/// number and the rest is re-joined as the name, so a name whose last two
/// words look like a set and number ("Borrowing 100,000 Arrows") is mis-read.
/// Blank lines yield `None`.
pub fn parse_list_line(line: &str) -> Option<CardQuery> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [] => None,
        [_] | [_, _] => Some(CardQuery::by_name(tokens.join(" "))),
        [name @ .., set, number] => Some(CardQuery::printing(name.join(" "), *set, *number)),
    }
}

/// One page of `/cards/search` results
#[derive(Debug, Deserialize)]
pub(crate) struct SearchPage {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
}
