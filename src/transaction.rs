//! The transaction model and the payload it arrives in.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::user::deserialize_id;

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// Transactions are displayed exactly as the backend sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction, unique within a response.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// The amount of money spent or earned in this transaction.
    pub amount: f64,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction happened, as formatted by the backend.
    pub transaction_date: String,
}

/// The body of a successful transactions response.
#[derive(Debug, Deserialize)]
pub(crate) struct TransactionsResponse {
    pub(crate) transactions: Vec<Transaction>,
}

impl TransactionsResponse {
    /// Parse a transactions response body.
    ///
    /// Returns `None` if the body is not a `{"transactions": [...]}` object or if
    /// two transactions share an ID, since the ID is used as the rendering key.
    pub(crate) fn parse(body: &str) -> Option<Vec<Transaction>> {
        let response: Self = serde_json::from_str(body)
            .inspect_err(|error| tracing::warn!("could not parse transactions body: {error}"))
            .ok()?;

        let mut seen_ids = HashSet::with_capacity(response.transactions.len());
        if let Some(duplicate) = response
            .transactions
            .iter()
            .find(|transaction| !seen_ids.insert(transaction.id.as_str()))
        {
            tracing::warn!("transaction ID {} appears more than once", duplicate.id);
            return None;
        }

        Some(response.transactions)
    }
}
