//! Fulfillment Core Library
//!
//! Order fulfillment against warehouse stock with automatic dropship
//! fallback, transactional document posting, and stock ledger
//! reconstruction. This crate is the domain core of a warehouse
//! distribution back office; HTTP routing, auth and master-data CRUD live
//! in the embedding application.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

/// Bundle of every core service wired to one pool and event channel, for
/// embedders that want the whole subsystem in one value.
#[derive(Clone)]
pub struct AppServices {
    pub availability: services::availability::AvailabilityService,
    pub delivery_notes: services::delivery_notes::DeliveryNoteService,
    pub posting: services::posting::PostingService,
    pub stock_ledger: services::stock_ledger::StockLedgerService,
    pub receiving: services::receiving::ReceivingService,
    pub returns: services::returns::ReturnService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            availability: services::availability::AvailabilityService::new(db_pool.clone()),
            delivery_notes: services::delivery_notes::DeliveryNoteService::new(
                db_pool.clone(),
                event_sender.clone(),
            ),
            posting: services::posting::PostingService::new(
                db_pool.clone(),
                event_sender.clone(),
            ),
            stock_ledger: services::stock_ledger::StockLedgerService::new(db_pool.clone()),
            receiving: services::receiving::ReceivingService::new(
                db_pool.clone(),
                event_sender.clone(),
            ),
            returns: services::returns::ReturnService::new(db_pool, event_sender),
        }
    }
}

pub mod prelude {
    pub use crate::config::{load_config, AppConfig};
    pub use crate::db::{establish_connection, run_migrations, DbPool};
    pub use crate::errors::{LineShortfall, ServiceError, SupplierCandidate};
    pub use crate::events::{process_events, Event, EventSender};
    pub use crate::services::availability::{AvailabilityService, SourcingDecision};
    pub use crate::services::delivery_notes::{
        CreateDeliveryNoteCommand, DeliveryNoteService, NewDeliveryLine,
    };
    pub use crate::services::posting::{PostingMode, PostingResult, PostingService};
    pub use crate::services::receiving::{CreateGoodsReceiptCommand, ReceivingService};
    pub use crate::services::returns::{
        CreatePurchaseReturnCommand, CreateSalesReturnCommand, ReturnService,
    };
    pub use crate::services::stock_ledger::{
        LedgerQuery, LedgerSortKey, StockLedger, StockLedgerService,
    };
    pub use crate::AppServices;
}
