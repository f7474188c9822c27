use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{
    decimal, require_non_negative, require_text, Draft, FieldValue, Record, RecordId, RecordKind,
    SchemaError,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockLevel {
    High,
    Moderate,
    Low,
}

impl StockLevel {
    pub fn from_percentage(remaining: f64) -> Self {
        if remaining >= 75.0 {
            Self::High
        } else if remaining >= 25.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Moderate => "Moderate",
            Self::Low => "Low",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: RecordId,
    pub name: String,
    /// Shop-assigned SKU.
    #[serde(default)]
    pub product_id: Option<String>,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub price: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub initial_quantity: i64,
    #[serde(default)]
    pub total_quantity_sold: i64,
    #[serde(default, deserialize_with = "decimal::option::deserialize")]
    pub remaining_percentage: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl Product {
    pub fn stock_left(&self) -> i64 {
        self.initial_quantity - self.total_quantity_sold
    }

    pub fn remaining(&self) -> f64 {
        match self.remaining_percentage {
            Some(p) => p,
            None if self.initial_quantity > 0 => {
                self.stock_left() as f64 * 100.0 / self.initial_quantity as f64
            }
            None => 0.0,
        }
    }

    pub fn stock_level(&self) -> StockLevel {
        StockLevel::from_percentage(self.remaining())
    }
}

impl Record for Product {
    const KIND: RecordKind = RecordKind::Product;
    type Draft = ProductDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => self.id.0.into(),
            "name" => FieldValue::text(&self.name),
            "product_id" => FieldValue::opt_text(self.product_id.as_deref()),
            "price" => self.price.into(),
            "currency" => FieldValue::opt_text(self.currency.as_deref()),
            "initial_quantity" => self.initial_quantity.into(),
            "total_quantity_sold" => self.total_quantity_sold.into(),
            "stock_left" => self.stock_left().into(),
            "remaining_percentage" => self.remaining().into(),
            "stock_level" => FieldValue::text(self.stock_level().label()),
            "created_at" => self.created_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require_text(Self::KIND, "name", &self.name)?;
        require_non_negative(Self::KIND, "price", self.price)?;
        Ok(())
    }

    /// The form edits the opening stock as `quantity`.
    fn form_values(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut values = serde_json::to_value(self)?;
        if let Some(fields) = values.as_object_mut() {
            if let Some(quantity) = fields.remove("initial_quantity") {
                fields.insert("quantity".to_string(), quantity);
            }
        }
        Ok(values)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<u64>,
}

impl Draft for ProductDraft {
    fn validate(&self) -> Result<(), SchemaError> {
        require_text(RecordKind::Product, "name", &self.name)?;
        require_non_negative(RecordKind::Product, "price", self.price)?;
        if self.quantity < 0 {
            return Err(SchemaError::invalid(
                RecordKind::Product,
                "quantity",
                "stock quantity cannot be negative",
            ));
        }
        Ok(())
    }

    fn assign_user(&mut self, user: u64) {
        self.user = Some(user);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: RecordId,
    pub product: RecordId,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub user: Option<u64>,
    #[serde(default)]
    pub user_name: Option<String>,
    pub quantity_sold: i64,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub total: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub sale_date: NaiveDate,
    #[serde(default)]
    pub status: Option<String>,
}

impl Record for Sale {
    const KIND: RecordKind = RecordKind::Sale;
    type Draft = SaleDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => self.id.0.into(),
            "product" => self.product.0.into(),
            "product_name" => FieldValue::opt_text(self.product_name.as_deref()),
            "user_name" => FieldValue::opt_text(self.user_name.as_deref()),
            "quantity_sold" => self.quantity_sold.into(),
            "total" => self.total.into(),
            "currency" => FieldValue::opt_text(self.currency.as_deref()),
            "sale_date" => self.sale_date.into(),
            "status" => FieldValue::opt_text(self.status.as_deref()),
            _ => return None,
        };
        Some(value)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        if self.quantity_sold < 0 {
            return Err(SchemaError::invalid(
                Self::KIND,
                "quantity_sold",
                "cannot be negative",
            ));
        }
        require_non_negative(Self::KIND, "total", self.total)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleDraft {
    pub product: RecordId,
    pub quantity_sold: i64,
    pub sale_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<u64>,
}

impl Draft for SaleDraft {
    fn validate(&self) -> Result<(), SchemaError> {
        if self.quantity_sold < 1 {
            return Err(SchemaError::invalid(
                RecordKind::Sale,
                "quantity_sold",
                "at least one unit must be sold",
            ));
        }
        Ok(())
    }

    fn assign_user(&mut self, user: u64) {
        self.user = Some(user);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeliveryStatus {
    Pending,
    Completed,
    Cancelled,
    Other(String),
}

impl From<String> for DeliveryStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => Self::Pending,
            "Completed" => Self::Completed,
            "Cancelled" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<DeliveryStatus> for String {
    fn from(value: DeliveryStatus) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Completed => f.write_str("Completed"),
            Self::Cancelled => f.write_str("Cancelled"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub id: RecordId,
    pub location: String,
    pub product: RecordId,
    pub quantity: i64,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub delivery_fee: f64,
    #[serde(default, deserialize_with = "decimal::deserialize")]
    pub total: f64,
    #[serde(default)]
    pub contact_number: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl Record for Delivery {
    const KIND: RecordKind = RecordKind::Delivery;
    type Draft = DeliveryDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => self.id.0.into(),
            "location" => FieldValue::text(&self.location),
            "product" => self.product.0.into(),
            "quantity" => self.quantity.into(),
            "delivery_fee" => self.delivery_fee.into(),
            "total" => self.total.into(),
            "contact_number" => FieldValue::text(&self.contact_number),
            "status" => FieldValue::text(self.status.to_string()),
            "created_at" => self.created_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require_text(Self::KIND, "location", &self.location)?;
        require_non_negative(Self::KIND, "delivery_fee", self.delivery_fee)?;
        require_non_negative(Self::KIND, "total", self.total)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryDraft {
    pub location: String,
    pub product: RecordId,
    pub status: DeliveryStatus,
    pub quantity: i64,
    pub delivery_fee: f64,
    pub total: f64,
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<u64>,
}

impl DeliveryDraft {
    /// A pending delivery whose total follows quantity and the product's fee.
    pub fn new(
        location: impl Into<String>,
        product: RecordId,
        quantity: i64,
        delivery_fee: f64,
        contact_number: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            product,
            status: DeliveryStatus::Pending,
            quantity,
            delivery_fee,
            total: quantity as f64 * delivery_fee,
            contact_number: contact_number.into(),
            user: None,
        }
    }

    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
        self.total = quantity as f64 * self.delivery_fee;
    }
}

impl Draft for DeliveryDraft {
    fn validate(&self) -> Result<(), SchemaError> {
        require_text(RecordKind::Delivery, "location", &self.location)?;
        require_text(RecordKind::Delivery, "contact_number", &self.contact_number)?;
        if self.quantity < 1 {
            return Err(SchemaError::invalid(
                RecordKind::Delivery,
                "quantity",
                "at least one unit must be delivered",
            ));
        }
        require_non_negative(RecordKind::Delivery, "delivery_fee", self.delivery_fee)
    }

    fn assign_user(&mut self, user: u64) {
        self.user = Some(user);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Income,
    Expense,
    Other(String),
}

impl From<String> for TransactionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "income" => Self::Income,
            "expense" => Self::Expense,
            _ => Self::Other(value),
        }
    }
}

impl From<TransactionType> for String {
    fn from(value: TransactionType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Income => f.write_str("income"),
            Self::Expense => f.write_str("expense"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: RecordId,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub transaction_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl Record for Transaction {
    const KIND: RecordKind = RecordKind::Transaction;
    type Draft = TransactionDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => self.id.0.into(),
            "amount" => self.amount.into(),
            "currency" => FieldValue::opt_text(self.currency.as_deref()),
            "transaction_type" => FieldValue::text(self.transaction_type.to_string()),
            "description" => FieldValue::text(&self.description),
            "transaction_date" => self.transaction_date.into(),
            "user_name" => FieldValue::opt_text(self.user_name.as_deref()),
            "created_at" => self.created_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require_non_negative(Self::KIND, "amount", self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub amount: f64,
    pub transaction_type: TransactionType,
    pub description: String,
    pub transaction_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<u64>,
}

impl Draft for TransactionDraft {
    fn validate(&self) -> Result<(), SchemaError> {
        require_non_negative(RecordKind::Transaction, "amount", self.amount)?;
        require_text(RecordKind::Transaction, "description", &self.description)?;
        if let TransactionType::Other(other) = &self.transaction_type {
            return Err(SchemaError::invalid(
                RecordKind::Transaction,
                "transaction_type",
                format!("expected income or expense, got '{other}'"),
            ));
        }
        Ok(())
    }

    fn assign_user(&mut self, user: u64) {
        self.user = Some(user);
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: RecordId,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub amount: f64,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<u64>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub expense_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl Record for Expense {
    const KIND: RecordKind = RecordKind::Expense;
    type Draft = ExpenseDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        let value = match name {
            "id" => self.id.0.into(),
            "amount" => self.amount.into(),
            "currency" => FieldValue::opt_text(self.currency.as_deref()),
            "description" => FieldValue::text(&self.description),
            "category" => self.category.into(),
            "category_name" => FieldValue::opt_text(self.category_name.as_deref()),
            "expense_date" => self.expense_date.into(),
            "user_name" => FieldValue::opt_text(self.user_name.as_deref()),
            "created_at" => self.created_at.into(),
            _ => return None,
        };
        Some(value)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        require_non_negative(Self::KIND, "amount", self.amount)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDraft {
    pub amount: f64,
    pub description: String,
    pub category: u64,
    pub expense_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<u64>,
}

impl Draft for ExpenseDraft {
    fn validate(&self) -> Result<(), SchemaError> {
        require_non_negative(RecordKind::Expense, "amount", self.amount)?;
        require_text(RecordKind::Expense, "description", &self.description)
    }

    fn assign_user(&mut self, user: u64) {
        self.user = Some(user);
    }
}
