//! The fixed inference request sent by the smoke test.

use serde::Serialize;

/// Media type of the serialized payload.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// One store transaction row, in the shape the model was trained on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreTransaction {
    pub date: &'static str,
    pub store_id: &'static str,
    pub store_name: &'static str,
    pub city: &'static str,
    pub state: &'static str,
    pub store_type: &'static str,
    pub item_id: &'static str,
    pub item_name: &'static str,
    pub category: &'static str,
    pub price: f64,
    pub quantity_sold: u32,
    pub revenue: f64,
    pub food_cost: f64,
    pub profit: f64,
    pub day_of_week: &'static str,
    pub month: u32,
    pub quarter: &'static str,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub temperature: f64,
    pub is_promotion: bool,
    pub stock_out: bool,
    pub prep_time: u32,
    pub calories: u32,
    pub is_vegetarian: bool,
}

impl StoreTransaction {
    pub fn sample() -> Self {
        Self {
            date: "2020-01-01",
            store_id: "STORE_001",
            store_name: "Dine Location 1",
            city: "East Tammymouth",
            state: "NV",
            store_type: "Mall",
            item_id: "ITEM_064",
            item_name: "Sandwich",
            category: "Appetizers",
            price: 24.92,
            quantity_sold: 58,
            revenue: 1445.36,
            food_cost: 294.64,
            profit: 1150.72,
            day_of_week: "Wednesday",
            month: 1,
            quarter: "Q1",
            is_weekend: false,
            is_holiday: true,
            temperature: 80.3,
            is_promotion: false,
            stock_out: false,
            prep_time: 16,
            calories: 919,
            is_vegetarian: false,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
