use chrono::{DateTime, Utc};

/// Builds an order number: `ORDER-<unix millis>-<8 random hex digits>`.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    format!(
        "ORDER-{}-{}",
        now.timestamp_millis(),
        hex::encode(rand::random::<[u8; 4]>())
    )
}
