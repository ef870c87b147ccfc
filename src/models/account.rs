use serde::{Deserialize, Serialize};

/// A registered user of the browser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Lower-case handle used in mentions and links.
    pub name: String,
    pub email: String,
}

/// The account acting on a request, plus the externally decided
/// privilege flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub account_id: i64,
    pub is_admin: bool,
}

impl Requester {
    pub fn user(account_id: i64) -> Self {
        Self { account_id, is_admin: false }
    }

    pub fn admin(account_id: i64) -> Self {
        Self { account_id, is_admin: true }
    }
}
