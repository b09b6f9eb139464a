use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub company_id: i64,
}

/// One edge of the relation graph, seen from the user who asked for it.
/// `user_id` is always the *other* party.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationInfo {
    pub user_id: Uuid,
    pub user_name: String,
    pub relationship: String,
}
