use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A charger rating left by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "chargerID", default)]
    pub charger_id: String,
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub rating: i32,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
}

/// A comment on a charger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "chargerID", default)]
    pub charger_id: String,
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
}

/// A charger reservation window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Reservation {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "chargerID", default)]
    pub charger_id: String,
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub modified: String,
}

/// Everything the peer services know about one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserActivity {
    pub ratings: Vec<Rating>,
    pub comments: Vec<Comment>,
    pub reservations: Vec<Reservation>,
}
