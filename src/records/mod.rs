pub mod account;
pub mod entities;

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use entities::{
    Delivery, DeliveryDraft, DeliveryStatus, Expense, ExpenseDraft, Product, ProductDraft, Sale,
    SaleDraft, StockLevel, Transaction, TransactionDraft, TransactionType,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Product,
    Sale,
    Delivery,
    Transaction,
    Expense,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Product,
        RecordKind::Sale,
        RecordKind::Delivery,
        RecordKind::Transaction,
        RecordKind::Expense,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "product" | "products" => Some(Self::Product),
            "sale" | "sales" => Some(Self::Sale),
            "delivery" | "deliveries" => Some(Self::Delivery),
            "transaction" | "transactions" => Some(Self::Transaction),
            "expense" | "expenses" => Some(Self::Expense),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Sale => "sale",
            Self::Delivery => "delivery",
            Self::Transaction => "transaction",
            Self::Expense => "expense",
        }
    }

    /// Path of the list/create endpoint, relative to the backend base URL.
    pub fn collection_path(self) -> &'static str {
        match self {
            Self::Product => "products/list/",
            Self::Sale => "sale/all/",
            Self::Delivery => "products/deliveries/",
            Self::Transaction => "sale/transactions/",
            Self::Expense => "sale/expenses/",
        }
    }

    /// Path of the update/delete endpoint for one record.
    pub fn item_path(self, id: RecordId) -> String {
        format!("{}{}/", self.collection_path(), id)
    }

    /// Field the search box narrows on.
    pub fn search_field(self) -> &'static str {
        match self {
            Self::Product => "name",
            Self::Sale => "product_name",
            Self::Delivery => "location",
            Self::Transaction | Self::Expense => "description",
        }
    }

    /// Columns shown by the table view, in order.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            Self::Product => &[
                "id",
                "name",
                "stock_left",
                "created_at",
                "stock_level",
                "price",
            ],
            Self::Sale => &[
                "id",
                "product_name",
                "user_name",
                "quantity_sold",
                "total",
                "sale_date",
                "status",
            ],
            Self::Delivery => &[
                "id",
                "location",
                "product",
                "quantity",
                "total",
                "contact_number",
                "status",
                "created_at",
            ],
            Self::Transaction => &[
                "id",
                "created_at",
                "user_name",
                "amount",
                "transaction_type",
                "description",
            ],
            Self::Expense => &[
                "id",
                "description",
                "created_at",
                "amount",
                "category_name",
                "user_name",
            ],
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum SchemaError {
    #[error("{kind} is missing required field '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("{kind} has invalid '{field}': {reason}")]
    InvalidField {
        kind: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl SchemaError {
    pub(crate) fn missing(kind: RecordKind, field: &'static str) -> Self {
        Self::MissingField {
            kind: kind.label(),
            field,
        }
    }

    pub(crate) fn invalid(kind: RecordKind, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            kind: kind.label(),
            field,
            reason: reason.into(),
        }
    }
}

/// A single field value pulled out of a record for sorting and searching.
///
/// Ordering is total: `Missing` sorts first, values of different variants
/// order by variant, values of the same variant order naturally.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Timestamp(DateTime<FixedOffset>),
}

impl FieldValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Missing => 0,
            Self::Number(_) => 1,
            Self::Date(_) => 2,
            Self::Timestamp(_) => 3,
            Self::Text(_) => 4,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map(Self::text).unwrap_or(Self::Missing)
    }

    /// Text used by the search filter and the text renderer.
    pub fn display_text(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Timestamp(t) => t.format("%a, %b %-d %Y").to_string(),
        }
    }

    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<FixedOffset>> for FieldValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Missing)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n:.2}")
    }
}

/// Create/update payload for one kind of record.
pub trait Draft: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn validate(&self) -> Result<(), SchemaError>;

    /// Stamps the owning user onto the payload before it is sent.
    fn assign_user(&mut self, user: u64);
}

/// One business entity as returned by the backend.
pub trait Record: DeserializeOwned + Serialize + Clone + Send + Sync + 'static {
    const KIND: RecordKind;
    type Draft: Draft;

    fn id(&self) -> RecordId;

    /// Returns `None` for field names this record does not have.
    fn field(&self, name: &str) -> Option<FieldValue>;

    fn validate(&self) -> Result<(), SchemaError>;

    /// Values an edit form starts from, keyed like the draft.
    fn form_values(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

pub(crate) fn require_text(
    kind: RecordKind,
    field: &'static str,
    value: &str,
) -> Result<(), SchemaError> {
    if value.trim().is_empty() {
        return Err(SchemaError::missing(kind, field));
    }
    Ok(())
}

pub(crate) fn require_non_negative(
    kind: RecordKind,
    field: &'static str,
    value: f64,
) -> Result<(), SchemaError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SchemaError::invalid(
            kind,
            field,
            format!("expected a non-negative amount, got {value}"),
        ));
    }
    Ok(())
}

/// Serde helpers for money fields the backend sends either as JSON numbers
/// or as decimal strings.
pub(crate) mod decimal {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    struct DecimalVisitor;

    impl<'de> Visitor<'de> for DecimalVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or a decimal string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            v.trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid decimal '{v}'")))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }

    pub mod option {
        use serde::Deserialize;
        use serde::Deserializer;

        #[derive(Deserialize)]
        struct Wrapped(#[serde(deserialize_with = "super::deserialize")] f64);

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<f64>, D::Error> {
            Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
        }
    }
}
