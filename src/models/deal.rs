use serde::{Deserialize, Serialize};
use crate::models::stage::{StageCode, StageValue};

/// Client (customer company contact)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: Option<i64>,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub created_ts: i64,
}

impl Client {
    pub fn new(name: String) -> Self {
        Self {
            id: None,
            name,
            company: None,
            email: None,
            created_ts: chrono::Utc::now().timestamp(),
        }
    }

    /// Name shown in tables: company if known, otherwise the contact name
    pub fn display_name(&self) -> &str {
        self.company.as_deref().unwrap_or(&self.name)
    }
}

/// Deal model
///
/// `current_stage` is only written through the transition path
/// (`workflow::SqliteTransitionApplier`), except for the initial stage at creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: Option<i64>,
    pub uuid: String,
    pub title: String,
    pub client_id: Option<i64>,
    pub current_stage: StageValue,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Deal {
    /// Create a new deal at the given initial stage
    pub fn new(title: String, initial_stage: StageCode) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            uuid: uuid::Uuid::new_v4().to_string(),
            title,
            client_id: None,
            current_stage: StageValue::Canonical(initial_stage),
            created_ts: now,
            modified_ts: now,
        }
    }
}

/// Product specification attached to a deal
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Specification {
    pub deal_id: i64,
    pub product: Option<String>,
    pub material: Option<String>,
    pub dimensions: Option<String>,
    pub quantity: Option<i64>,
}

impl Specification {
    pub fn is_empty(&self) -> bool {
        self.product.is_none()
            && self.material.is_none()
            && self.dimensions.is_none()
            && self.quantity.is_none()
    }
}

/// Price quote for a deal (USD)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: Option<i64>,
    pub deal_id: i64,
    pub unit_price_usd: f64,
    pub quantity: i64,
    pub created_ts: i64,
}

impl Quote {
    pub fn total_usd(&self) -> f64 {
        self.unit_price_usd * self.quantity as f64
    }
}

/// Deal joined with its client, specification and latest quote for list display
#[derive(Debug, Clone, Serialize)]
pub struct DealRow {
    pub deal: Deal,
    pub client_name: Option<String>,
    pub product: Option<String>,
    pub quantity: Option<i64>,
    pub quote_total_usd: Option<f64>,
}
