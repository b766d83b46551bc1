use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggeredAlert {
    pub id: String,
    pub alert_id: String,
    pub triggered_price: f64,
    pub triggered_at: DateTime<Utc>,
}
