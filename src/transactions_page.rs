//! The transactions page: loads and renders the transactions of one account.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use maud::{Markup, html};
use tracing::{Instrument, Span};

use crate::{
    Error, endpoints,
    endpoints::format_endpoint,
    http_client::{HttpClient, HttpRequest, dispatch},
    request_state::{LoadingGuard, RequestCycle, RequestState, RequestToken},
    transaction::{Transaction, TransactionsResponse},
    user::{AccountId, UserId},
};

#[derive(Debug, Default)]
struct ViewerState {
    identity: Option<(UserId, AccountId)>,
    transactions: Vec<Transaction>,
    cycle: RequestCycle,
}

impl ViewerState {
    /// Start loading the transactions for a (possibly new) identity.
    ///
    /// Transactions from an earlier load are cleared so that a list for one
    /// account is never shown under another.
    fn begin(&mut self, user_id: UserId, account_id: AccountId) -> RequestToken {
        self.identity = Some((user_id, account_id));
        self.transactions.clear();
        self.cycle.begin()
    }
}

impl AsMut<RequestCycle> for ViewerState {
    fn as_mut(&mut self) -> &mut RequestCycle {
        &mut self.cycle
    }
}

/// A point-in-time copy of the transactions page's state.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionsSnapshot {
    /// The state of the most recent load.
    pub request: RequestState,
    /// The user and account the page is showing.
    pub identity: Option<(UserId, AccountId)>,
    /// The transactions in the order the backend sent them.
    pub transactions: Vec<Transaction>,
}

impl TransactionsSnapshot {
    /// The displayed rows, one per transaction.
    pub fn rows(&self) -> Vec<TransactionRow<'_>> {
        self.transactions.iter().map(TransactionRow::from).collect()
    }
}

/// A single displayed transaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransactionRow<'a> {
    /// The key that identifies the row, i.e. the transaction ID.
    pub key: &'a str,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// What the transaction was for.
    pub description: &'a str,
    /// When the transaction happened.
    pub date: &'a str,
}

impl<'a> From<&'a Transaction> for TransactionRow<'a> {
    fn from(transaction: &'a Transaction) -> Self {
        Self {
            key: &transaction.id,
            amount: transaction.amount,
            description: &transaction.description,
            date: &transaction.transaction_date,
        }
    }
}

/// Loads the transactions of one of a user's accounts.
///
/// The handle is cheap to clone and all clones share the same state. A load for
/// a new user or account supersedes any load still in flight, and the result of
/// the superseded load is discarded.
#[derive(Clone)]
pub struct TransactionsViewer {
    state: Arc<Mutex<ViewerState>>,
    client: Arc<dyn HttpClient>,
    span: Span,
}

impl TransactionsViewer {
    /// Create an idle page that is not showing any account yet.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self::with_state(client, ViewerState::default())
    }

    /// Create a page for an account that fetches on mount.
    ///
    /// The page starts out loading, call [TransactionsViewer::retry] or
    /// [TransactionsViewer::set_identity] to perform the fetch.
    pub fn for_account(
        client: Arc<dyn HttpClient>,
        user_id: UserId,
        account_id: AccountId,
    ) -> Self {
        Self::with_state(
            client,
            ViewerState {
                identity: Some((user_id, account_id)),
                transactions: Vec::new(),
                cycle: RequestCycle::new(RequestState::loading()),
            },
        )
    }

    fn with_state(client: Arc<dyn HttpClient>, state: ViewerState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            client,
            span: tracing::info_span!("transactions_page"),
        }
    }

    /// Record this page's events under `span` instead of its own span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ViewerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get a copy of the current state.
    pub fn state(&self) -> TransactionsSnapshot {
        let state = self.lock();

        TransactionsSnapshot {
            request: state.cycle.state().clone(),
            identity: state.identity.clone(),
            transactions: state.transactions.clone(),
        }
    }

    /// Whether a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.lock().cycle.state().is_loading()
    }

    /// Show the account identified by `user_id` and `account_id`.
    ///
    /// Reloads from scratch if either ID differs from the ones currently shown
    /// or if the page has not fetched yet, otherwise does nothing.
    pub async fn set_identity(&self, user_id: UserId, account_id: AccountId) {
        let already_loaded = {
            let state = self.lock();
            let unchanged = state
                .identity
                .as_ref()
                .is_some_and(|(current_user, current_account)| {
                    *current_user == user_id && *current_account == account_id
                });

            unchanged && state.cycle.has_started()
        };

        if already_loaded {
            tracing::debug!(parent: &self.span, "identity unchanged, not reloading");
            return;
        }

        self.load(user_id, account_id).await;
    }

    /// Load the transactions for the account currently shown again.
    ///
    /// Does nothing if no account has been set.
    pub async fn retry(&self) {
        let identity = self.lock().identity.clone();

        match identity {
            Some((user_id, account_id)) => self.load(user_id, account_id).await,
            None => tracing::debug!(parent: &self.span, "no account to retry"),
        }
    }

    /// Load the transactions for `account_id` belonging to `user_id`.
    ///
    /// On success the transactions replace the current list. On failure the
    /// error message is stored in the request state. The loading state is
    /// cleared however the load ends.
    pub async fn load(&self, user_id: UserId, account_id: AccountId) {
        let token = self.lock().begin(user_id.clone(), account_id.clone());
        let _guard = LoadingGuard::new(Arc::clone(&self.state), token);
        let span = tracing::info_span!(
            parent: &self.span,
            "load_transactions",
            request = token.epoch(),
            %user_id,
            %account_id
        );

        async {
            let outcome = self.fetch_transactions(&user_id, &account_id).await;
            self.complete(token, outcome);
        }
        .instrument(span)
        .await;
    }

    async fn fetch_transactions(
        &self,
        user_id: &UserId,
        account_id: &AccountId,
    ) -> Result<Vec<Transaction>, Error> {
        let path = format_endpoint(
            endpoints::ACCOUNT_TRANSACTIONS,
            &[user_id.as_str(), account_id.as_str()],
        );
        let response = dispatch(self.client.as_ref(), HttpRequest::get(path)).await?;

        if !response.is_success() {
            tracing::error!(
                "Error fetching transactions. Status: {}, message: {}",
                response.status,
                response.body
            );
            return Err(Error::TransactionsRejected(response.body));
        }

        let transactions =
            TransactionsResponse::parse(&response.body).ok_or(Error::TransactionsMalformed)?;
        tracing::debug!(count = transactions.len(), "received transactions");

        Ok(transactions)
    }

    fn complete(&self, token: RequestToken, outcome: Result<Vec<Transaction>, Error>) {
        let mut state = self.lock();

        if !state.cycle.is_current(token) {
            tracing::debug!("discarding transactions for a superseded load");
            return;
        }

        match outcome {
            Ok(transactions) => {
                state.transactions = transactions;
                state.cycle.finish(token, Ok(()));
            }
            Err(error) => {
                tracing::warn!("could not load transactions: {error}");
                state.cycle.finish(token, Err(error.to_string()));
            }
        }
    }
}

/// Render the transactions page for `state`.
///
/// Each transaction is rendered as a row keyed by its ID.
pub fn transactions_list(state: &TransactionsSnapshot) -> Markup {
    let rows = state.rows();

    html! {
        section {
            h2 { "Transactions List" }

            @if state.request.is_loading() {
                p { "Loading transactions..." }
            }

            @if let Some(message) = state.request.error_message() {
                p role="alert" { (message) }
            }

            @if !rows.is_empty() {
                div {
                    @for row in &rows {
                        div data-key=(row.key) {
                            p { "Amount: " (row.amount) }
                            p { "Description: " (row.description) }
                            p { "Date: " (row.date) }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use reqwest::StatusCode;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::{
        AccountId, HttpResponse, Phase, RETRY_MESSAGE, RequestState, Transaction,
        TransportError, UserId,
        test_utils::{
            FakeClient, assert_valid_html, parse_html_fragment, select_all, select_text,
        },
    };

    use super::{TransactionRow, TransactionsSnapshot, TransactionsViewer, transactions_list};

    const BOB_SAVINGS: &str = "/user/bob/accounts/savings/transactions";
    const BOB_CHEQUE: &str = "/user/bob/accounts/cheque/transactions";

    fn bob() -> UserId {
        UserId::new("bob")
    }

    fn savings() -> AccountId {
        AccountId::new("savings")
    }

    fn cheque() -> AccountId {
        AccountId::new("cheque")
    }

    fn coffee() -> Transaction {
        Transaction {
            id: "1".to_owned(),
            amount: 10.5,
            description: "coffee".to_owned(),
            transaction_date: "2024-01-01".to_owned(),
        }
    }

    fn rent() -> Transaction {
        Transaction {
            id: "2".to_owned(),
            amount: -1200.0,
            description: "rent".to_owned(),
            transaction_date: "2024-01-02".to_owned(),
        }
    }

    fn transactions_body(transactions: &[Transaction]) -> HttpResponse {
        HttpResponse::json(StatusCode::OK, &json!({ "transactions": transactions }))
    }

    #[tokio::test]
    async fn load_displays_single_transaction_unchanged() {
        let client = Arc::new(FakeClient::new());
        client.reply_json(
            BOB_SAVINGS,
            StatusCode::OK,
            json!({"transactions": [
                {
                    "id": "1",
                    "amount": 10.5,
                    "description": "coffee",
                    "transaction_date": "2024-01-01"
                }
            ]}),
        );
        let viewer = TransactionsViewer::new(client.clone());

        viewer.load(bob(), savings()).await;

        let state = viewer.state();
        assert_eq!(state.request, RequestState::success());
        assert_eq!(
            state.rows(),
            vec![TransactionRow {
                key: "1",
                amount: 10.5,
                description: "coffee",
                date: "2024-01-01",
            }]
        );

        let html = parse_html_fragment(&transactions_list(&state));
        assert_valid_html(&html);
        let rows = select_all(&html, "div[data-key]");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value().attr("data-key"), Some("1"));
        let fields = select_all(&html, "div[data-key] p")
            .iter()
            .map(select_text)
            .collect::<Vec<_>>();
        assert_eq!(
            fields,
            vec!["Amount: 10.5", "Description: coffee", "Date: 2024-01-01"]
        );
    }

    #[tokio::test]
    async fn transactions_keep_received_order() {
        let client = Arc::new(FakeClient::new());
        client.reply(BOB_SAVINGS, transactions_body(&[rent(), coffee()]));
        let viewer = TransactionsViewer::new(client.clone());

        viewer.load(bob(), savings()).await;

        assert_eq!(viewer.state().transactions, vec![rent(), coffee()]);
    }

    #[tokio::test]
    async fn rejection_shows_response_text() {
        let client = Arc::new(FakeClient::new());
        client.reply(
            BOB_SAVINGS,
            HttpResponse::new(StatusCode::NOT_FOUND, "account not found"),
        );
        let viewer = TransactionsViewer::new(client.clone());

        viewer.load(bob(), savings()).await;

        let state = viewer.state();
        assert_eq!(state.request.phase(), Phase::Failure);
        assert_eq!(
            state.request.error_message(),
            Some("Error fetching transactions: account not found")
        );
        assert!(state.transactions.is_empty());
    }

    #[tokio::test]
    async fn malformed_success_body_is_reported() {
        let client = Arc::new(FakeClient::new());
        client.reply_json(BOB_SAVINGS, StatusCode::OK, json!({"items": []}));
        let viewer = TransactionsViewer::new(client.clone());

        viewer.load(bob(), savings()).await;

        assert_eq!(
            viewer.state().request.error_message(),
            Some("Error fetching transactions: malformed response.")
        );
    }

    #[tokio::test]
    async fn transport_fault_shows_retry_message() {
        let client = Arc::new(FakeClient::new());
        client.fail(BOB_SAVINGS, TransportError::Timeout);
        let viewer = TransactionsViewer::new(client.clone());

        viewer.load(bob(), savings()).await;

        assert_eq!(viewer.state().request.error_message(), Some(RETRY_MESSAGE));
        assert!(!viewer.is_loading());
    }

    #[tokio::test]
    async fn repeated_loads_give_identical_lists() {
        let client = Arc::new(FakeClient::new());
        client
            .reply(BOB_SAVINGS, transactions_body(&[coffee(), rent()]))
            .reply(BOB_SAVINGS, transactions_body(&[coffee(), rent()]));
        let viewer = TransactionsViewer::new(client.clone());

        viewer.load(bob(), savings()).await;
        let first = viewer.state().transactions;
        viewer.load(bob(), savings()).await;
        let second = viewer.state().transactions;

        assert_eq!(first, second);
        assert_eq!(client.requests().len(), 2);
    }

    #[tokio::test]
    async fn later_identity_wins_when_earlier_load_resolves_last() {
        let client = Arc::new(FakeClient::new());
        let gate = Arc::new(Notify::new());
        client
            .reply_when(BOB_SAVINGS, transactions_body(&[coffee()]), gate.clone())
            .reply(BOB_CHEQUE, transactions_body(&[rent()]));
        let viewer = TransactionsViewer::new(client.clone());

        tokio::join!(viewer.load(bob(), savings()), async {
            viewer.load(bob(), cheque()).await;
            gate.notify_one();
        });

        let state = viewer.state();
        assert_eq!(state.request, RequestState::success());
        assert_eq!(state.identity, Some((bob(), cheque())));
        assert_eq!(state.transactions, vec![rent()]);
    }

    #[tokio::test]
    async fn later_identity_wins_when_earlier_load_resolves_first() {
        let client = Arc::new(FakeClient::new());
        let savings_gate = Arc::new(Notify::new());
        let cheque_gate = Arc::new(Notify::new());
        client
            .reply_when(
                BOB_SAVINGS,
                HttpResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "stale"),
                savings_gate.clone(),
            )
            .reply_when(BOB_CHEQUE, transactions_body(&[rent()]), cheque_gate.clone());
        let viewer = TransactionsViewer::new(client.clone());

        tokio::join!(
            viewer.load(bob(), savings()),
            viewer.load(bob(), cheque()),
            async {
                savings_gate.notify_one();
                tokio::task::yield_now().await;
                cheque_gate.notify_one();
            }
        );

        let state = viewer.state();
        assert_eq!(state.request, RequestState::success());
        assert_eq!(state.transactions, vec![rent()]);
    }

    #[tokio::test]
    async fn unchanged_identity_does_not_reload() {
        let client = Arc::new(FakeClient::new());
        client.reply(BOB_SAVINGS, transactions_body(&[coffee()]));
        let viewer = TransactionsViewer::new(client.clone());

        viewer.set_identity(bob(), savings()).await;
        viewer.set_identity(bob(), savings()).await;

        assert_eq!(client.request_paths(), vec![BOB_SAVINGS]);
        assert_eq!(viewer.state().transactions, vec![coffee()]);
    }

    #[tokio::test]
    async fn changed_identity_reloads_from_scratch() {
        let client = Arc::new(FakeClient::new());
        client
            .reply(BOB_SAVINGS, transactions_body(&[coffee()]))
            .reply(BOB_CHEQUE, HttpResponse::new(StatusCode::NOT_FOUND, "gone"));
        let viewer = TransactionsViewer::new(client.clone());

        viewer.set_identity(bob(), savings()).await;
        viewer.set_identity(bob(), cheque()).await;

        let state = viewer.state();
        assert_eq!(client.request_paths(), vec![BOB_SAVINGS, BOB_CHEQUE]);
        assert!(state.transactions.is_empty());
        assert_eq!(
            state.request.error_message(),
            Some("Error fetching transactions: gone")
        );
    }

    #[tokio::test]
    async fn mounted_page_starts_loading_until_retried() {
        let client = Arc::new(FakeClient::new());
        client.reply(BOB_SAVINGS, transactions_body(&[coffee()]));
        let viewer = TransactionsViewer::for_account(client.clone(), bob(), savings());

        assert!(viewer.is_loading());

        viewer.retry().await;

        assert_eq!(viewer.state().request, RequestState::success());
        assert_eq!(viewer.state().transactions, vec![coffee()]);
    }

    #[tokio::test]
    async fn mounted_page_loads_when_given_same_identity() {
        let client = Arc::new(FakeClient::new());
        client.reply(BOB_SAVINGS, transactions_body(&[coffee()]));
        let viewer = TransactionsViewer::for_account(client.clone(), bob(), savings());

        viewer.set_identity(bob(), savings()).await;

        assert_eq!(viewer.state().request, RequestState::success());
        assert_eq!(viewer.state().transactions, vec![coffee()]);
        assert_eq!(client.request_paths(), vec![BOB_SAVINGS]);
    }

    #[tokio::test]
    async fn retry_reloads_after_failure() {
        let client = Arc::new(FakeClient::new());
        client
            .fail(BOB_SAVINGS, TransportError::Timeout)
            .reply(BOB_SAVINGS, transactions_body(&[coffee()]));
        let viewer = TransactionsViewer::new(client.clone());

        viewer.load(bob(), savings()).await;
        viewer.retry().await;

        assert_eq!(viewer.state().request, RequestState::success());
    }

    #[tokio::test]
    async fn retry_without_account_does_nothing() {
        let client = Arc::new(FakeClient::new());
        let viewer = TransactionsViewer::new(client.clone());

        viewer.retry().await;

        assert_eq!(viewer.state().request, RequestState::idle());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn ids_are_encoded_into_path() {
        let client = Arc::new(FakeClient::new());
        client.reply(
            "/user/a%20b/accounts/c%2Fd/transactions",
            transactions_body(&[]),
        );
        let viewer = TransactionsViewer::new(client.clone());

        viewer.load(UserId::new("a b"), AccountId::new("c/d")).await;

        assert_eq!(viewer.state().request, RequestState::success());
    }

    #[tokio::test]
    async fn abandoned_load_clears_loading() {
        let client = Arc::new(FakeClient::new());
        client.reply_when(
            BOB_SAVINGS,
            transactions_body(&[coffee()]),
            Arc::new(Notify::new()),
        );
        let viewer = TransactionsViewer::new(client.clone());

        let result =
            tokio::time::timeout(Duration::from_millis(10), viewer.load(bob(), savings())).await;

        assert!(result.is_err());
        assert_eq!(viewer.state().request.phase(), Phase::Idle);
    }

    #[test]
    fn list_shows_loading_message() {
        let state = TransactionsSnapshot {
            request: RequestState::loading(),
            identity: Some((bob(), savings())),
            transactions: Vec::new(),
        };

        let html = parse_html_fragment(&transactions_list(&state));

        let paragraphs = select_all(&html, "p")
            .iter()
            .map(select_text)
            .collect::<Vec<_>>();
        assert_eq!(paragraphs, vec!["Loading transactions..."]);
        assert!(select_all(&html, "div[data-key]").is_empty());
    }

    #[test]
    fn list_shows_error_message() {
        let state = TransactionsSnapshot {
            request: RequestState::failure("Error fetching transactions: account not found"),
            identity: Some((bob(), savings())),
            transactions: Vec::new(),
        };

        let html = parse_html_fragment(&transactions_list(&state));

        let alerts = select_all(&html, "p[role=alert]");
        assert_eq!(alerts.len(), 1);
        assert_eq!(
            select_text(&alerts[0]),
            "Error fetching transactions: account not found"
        );
    }

    #[test]
    fn list_renders_one_row_per_transaction() {
        let state = TransactionsSnapshot {
            request: RequestState::success(),
            identity: Some((bob(), savings())),
            transactions: vec![coffee(), rent()],
        };

        let html = parse_html_fragment(&transactions_list(&state));

        let keys = select_all(&html, "div[data-key]")
            .iter()
            .filter_map(|row| row.value().attr("data-key"))
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["1", "2"]);
    }
}
