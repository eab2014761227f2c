use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A supplier that could cover a shortfall line if the caller switches it to
/// dropship sourcing. Ordered best-first when attached to a shortfall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierCandidate {
    pub supplier_id: Uuid,
    pub price: Decimal,
    pub lead_time_days: i32,
    pub is_preferred: bool,
}

/// Per-line shortfall detail carried by `ServiceError::InsufficientStock` so
/// a caller can render a corrective UI (switch the line to dropship, lower
/// the quantity, or retry in partial mode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineShortfall {
    pub line_id: Uuid,
    pub item_id: Uuid,
    pub requested: i32,
    pub available: i32,
    pub shortage: i32,
    pub candidates: Vec<SupplierCandidate>,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Insufficient stock: {message}")]
    InsufficientStock {
        message: String,
        shortfalls: Vec<LineShortfall>,
    },

    #[error("No supplier available for item {item_id}: short {shortage} unit(s)")]
    NoSupplierAvailable { item_id: Uuid, shortage: i32 },

    #[error("Concurrent stock conflict: {0}")]
    ConcurrentStockConflict(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Builds an `InsufficientStock` error from the collected shortfall set.
    pub fn insufficient_stock(shortfalls: Vec<LineShortfall>) -> Self {
        let message = shortfalls
            .iter()
            .map(|s| {
                format!(
                    "item {} requested {} but only {} on hand",
                    s.item_id, s.requested, s.available
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        ServiceError::InsufficientStock {
            message,
            shortfalls,
        }
    }

    /// True when the error is resolvable by the caller without operator
    /// intervention (retry, mode switch, or dropship conversion).
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            ServiceError::InsufficientStock { .. }
                | ServiceError::ConcurrentStockConflict(_)
                | ServiceError::ValidationError(_)
        )
    }
}

// Result extensions for easier error handling
pub trait ResultExt<T> {
    fn map_err_to_service(self) -> Result<T, ServiceError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<ServiceError>,
{
    fn map_err_to_service(self) -> Result<T, ServiceError> {
        self.map_err(|e| e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn insufficient_stock_message_lists_every_shortfall() {
        let item_a = Uuid::new_v4();
        let item_b = Uuid::new_v4();
        let err = ServiceError::insufficient_stock(vec![
            LineShortfall {
                line_id: Uuid::new_v4(),
                item_id: item_a,
                requested: 5,
                available: 2,
                shortage: 3,
                candidates: vec![],
            },
            LineShortfall {
                line_id: Uuid::new_v4(),
                item_id: item_b,
                requested: 1,
                available: 0,
                shortage: 1,
                candidates: vec![SupplierCandidate {
                    supplier_id: Uuid::new_v4(),
                    price: dec!(10.00),
                    lead_time_days: 3,
                    is_preferred: true,
                }],
            },
        ]);

        let rendered = err.to_string();
        assert!(rendered.contains(&item_a.to_string()));
        assert!(rendered.contains(&item_b.to_string()));
        match err {
            ServiceError::InsufficientStock { shortfalls, .. } => {
                assert_eq!(shortfalls.len(), 2);
                assert_eq!(shortfalls[1].candidates.len(), 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[test]
    fn caller_correctable_classification() {
        assert!(ServiceError::insufficient_stock(vec![]).is_caller_correctable());
        assert!(
            ServiceError::ConcurrentStockConflict("lost race".into()).is_caller_correctable()
        );
        assert!(!ServiceError::NotFound("missing".into()).is_caller_correctable());
        assert!(!ServiceError::InvalidStatus("posted".into()).is_caller_correctable());
    }
}
