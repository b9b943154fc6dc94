//! Transaction management.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and `TransactionBuilder` for creating transactions
//! - Database functions for storing, querying, and soft deleting transactions
//! - The JSON endpoints for the transaction API

mod core;
mod endpoints;
mod query;

pub use core::{
    Transaction, TransactionBuilder, TransactionChanges, create_transaction,
    create_transaction_table, delete_transaction, get_transaction, update_transaction,
};
pub use endpoints::{
    TransactionForm, TransactionResponse, TransactionUpdateForm, create_transaction_endpoint,
    delete_transaction_endpoint, get_transaction_endpoint, list_transactions_endpoint,
    update_transaction_endpoint,
};
pub use query::{TransactionFilter, TransactionQuery, list_transactions};
