// Client flows against in-memory account and wallet fakes
// Run with: cargo test -p confidential-client --test client_flow

use async_trait::async_trait;
use confidential_client::preflight::PreflightOutcome;
use confidential_client::{
    BalanceSnapshot, BuiltOperation, Call, ClientError, ConfidentialAccount, ConfidentialClient,
    DownstreamError, ErrorCode, Network, OperationKind, OperationRequest, RecipientKey,
    TransactionSubmitter, ValidationError,
};
use num_bigint::BigUint;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SENDER: &str = "0x0123456789abcdef";

/// Shared ledger the fakes read and tests inspect
#[derive(Default)]
struct Ledger {
    snapshot: Mutex<BalanceSnapshot>,
    rate: Mutex<u128>,
    fail_reads: Mutex<Option<String>>,
    build_error: Mutex<Option<DownstreamError>>,
    execute_error: Mutex<Option<DownstreamError>>,
    inclusion_error: Mutex<Option<DownstreamError>>,
    /// Armed into `fail_reads` once a transaction is included
    fail_reads_after_inclusion: Mutex<Option<String>>,
    approve_on_fund: Mutex<bool>,
    build_delay: Mutex<Option<Duration>>,
    state_reads: AtomicUsize,
    built: Mutex<Vec<OperationRequest>>,
    submitted: Mutex<Vec<Vec<Call>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Ledger {
    fn new(balance: u128, pending: u128, rate: u128) -> Arc<Self> {
        let ledger = Ledger::default();
        *ledger.snapshot.lock().unwrap() = BalanceSnapshot {
            balance,
            pending,
            nonce: 1,
        };
        *ledger.rate.lock().unwrap() = rate;
        Arc::new(ledger)
    }

    fn external_calls(&self) -> usize {
        self.state_reads.load(Ordering::SeqCst)
            + self.built.lock().unwrap().len()
            + self.submitted.lock().unwrap().len()
    }
}

fn call(entrypoint: &str, calldata: Vec<String>) -> Call {
    Call {
        contract_address: "0xc0ffee".to_string(),
        entrypoint: entrypoint.to_string(),
        calldata,
    }
}

fn generator() -> RecipientKey {
    RecipientKey {
        x: BigUint::parse_bytes(
            b"1ef15c18599971b7beced415a40f0c7deacfd9b0d1819e03d723d8bc943cfca",
            16,
        )
        .unwrap(),
        y: BigUint::parse_bytes(
            b"5668060aa49730b7be4801df46ec62de53ecd11abe43a32873000c36e8dc1f",
            16,
        )
        .unwrap(),
    }
}

struct FakeAccount(Arc<Ledger>);

#[async_trait]
impl ConfidentialAccount for FakeAccount {
    fn public_key(&self) -> RecipientKey {
        generator()
    }

    async fn state(&self) -> Result<BalanceSnapshot, DownstreamError> {
        self.0.state_reads.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.0.fail_reads.lock().unwrap().clone() {
            return Err(DownstreamError::new(msg));
        }
        Ok(*self.0.snapshot.lock().unwrap())
    }

    async fn rate(&self) -> Result<u128, DownstreamError> {
        Ok(*self.0.rate.lock().unwrap())
    }

    async fn bit_size(&self) -> Result<u32, DownstreamError> {
        Ok(32)
    }

    async fn build(&self, request: &OperationRequest) -> Result<BuiltOperation, DownstreamError> {
        let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.0.build_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.0.built.lock().unwrap().push(request.clone());
        if let Some(err) = self.0.build_error.lock().unwrap().clone() {
            return Err(err);
        }

        let snapshot = *self.0.snapshot.lock().unwrap();
        if request.kind == OperationKind::Rollover && snapshot.pending == 0 {
            return Err(DownstreamError::new("Tongo: no pending balance"));
        }

        let amount = request.amount.map(|a| a.to_string()).unwrap_or_default();
        let approve = (request.kind == OperationKind::Fund && *self.0.approve_on_fund.lock().unwrap())
            .then(|| call("approve", vec![amount.clone()]));

        Ok(BuiltOperation {
            approve,
            call: call(request.kind.as_str(), vec![amount]),
        })
    }
}

struct FakeWallet(Arc<Ledger>);

#[async_trait]
impl TransactionSubmitter for FakeWallet {
    fn address(&self) -> &str {
        SENDER
    }

    async fn execute(&self, calls: Vec<Call>) -> Result<String, DownstreamError> {
        if let Some(err) = self.0.execute_error.lock().unwrap().clone() {
            return Err(err);
        }
        let mut submitted = self.0.submitted.lock().unwrap();
        submitted.push(calls);
        Ok(format!("0x{:x}", submitted.len()))
    }

    async fn wait_for_inclusion(&self, _tx_hash: &str) -> Result<(), DownstreamError> {
        if let Some(msg) = self.0.fail_reads_after_inclusion.lock().unwrap().take() {
            *self.0.fail_reads.lock().unwrap() = Some(msg);
        }
        match self.0.inclusion_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn client(ledger: &Arc<Ledger>) -> ConfidentialClient<FakeAccount, FakeWallet> {
    ConfidentialClient::new(
        Network::Mainnet,
        FakeAccount(ledger.clone()),
        FakeWallet(ledger.clone()),
    )
}

// ==================== VALIDATION ====================

#[tokio::test]
async fn test_zero_amount_rejected_before_any_external_call() {
    let ledger = Ledger::new(1_000, 0, 1);
    let client = client(&ledger);

    for result in [
        client.fund(0).await,
        client.withdraw(0).await,
        client.transfer(&generator().to_hex(), 0).await,
    ] {
        assert_eq!(result, Err(ClientError::Invalid(ValidationError::ZeroAmount)));
    }
    assert_eq!(ledger.external_calls(), 0);
}

#[tokio::test]
async fn test_invalid_recipient_rejected_locally() {
    let ledger = Ledger::new(1_000, 0, 1);
    let client = client(&ledger);

    let err = client.transfer("0x1234", 10).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(err.code(), Some(ErrorCode::InvalidKey));
    assert_eq!(ledger.external_calls(), 0);
}

#[tokio::test]
async fn test_ragequit_requires_opt_in() {
    let ledger = Ledger::new(1_000, 0, 1);
    let client = client(&ledger);

    assert_eq!(
        client.ragequit().await,
        Err(ClientError::Invalid(ValidationError::RagequitDisabled))
    );
    assert_eq!(ledger.external_calls(), 0);
}

#[tokio::test]
async fn test_amount_below_rate_rejected() {
    let ledger = Ledger::new(1_000, 0, 10_000);
    let client = client(&ledger);

    let err = client.fund(9_999).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Invalid(ValidationError::BelowRate {
            amount: 9_999,
            rate: 10_000
        })
    );
    assert!(ledger.built.lock().unwrap().is_empty());
}

// ==================== HAPPY PATHS ====================

#[tokio::test]
async fn test_fund_submits_approval_and_fund_together() {
    let ledger = Ledger::new(0, 0, 10_000);
    *ledger.approve_on_fund.lock().unwrap() = true;
    let client = client(&ledger);

    let tx = client.fund(50_000).await.unwrap();
    assert_eq!(tx, "0x1");

    let built = ledger.built.lock().unwrap();
    assert_eq!(built.len(), 1);
    assert_eq!(built[0].kind, OperationKind::Fund);
    assert_eq!(built[0].amount, Some(5));
    assert_eq!(built[0].sender, SENDER);

    let submitted = ledger.submitted.lock().unwrap();
    let entrypoints: Vec<_> = submitted[0].iter().map(|c| c.entrypoint.as_str()).collect();
    assert_eq!(entrypoints, vec!["approve", "fund"]);
}

#[tokio::test]
async fn test_withdraw_pays_out_to_wallet_and_refreshes() {
    let ledger = Ledger::new(1_000, 0, 1);
    let client = client(&ledger);
    client.refresh().await.unwrap();

    // Chain moves on while the withdrawal is processed
    *ledger.snapshot.lock().unwrap() = BalanceSnapshot {
        balance: 600,
        pending: 0,
        nonce: 2,
    };

    client.withdraw(400).await.unwrap();

    let built = ledger.built.lock().unwrap();
    assert_eq!(built[0].kind, OperationKind::Withdraw);
    assert_eq!(built[0].to.as_deref(), Some(SENDER));

    let state = client.state().unwrap();
    assert_eq!(state.snapshot.balance, 600);
    assert_eq!(state.snapshot.nonce, 2);
}

#[tokio::test]
async fn test_ragequit_when_enabled() {
    let ledger = Ledger::new(1_000, 0, 1);
    let client = client(&ledger).with_ragequit(true);

    client.ragequit().await.unwrap();
    assert_eq!(ledger.built.lock().unwrap()[0].kind, OperationKind::Ragequit);
}

#[tokio::test]
async fn test_ragequit_with_empty_balance() {
    let ledger = Ledger::new(0, 50, 1);
    let client = client(&ledger).with_ragequit(true);

    let err = client.ragequit().await.unwrap_err();
    assert_eq!(err, ClientError::Invalid(ValidationError::NothingToWithdraw));
    assert!(ledger.built.lock().unwrap().is_empty());
}

// ==================== FAILURE CLASSIFICATION ====================

#[tokio::test]
async fn test_transfer_over_cached_balance_rejected_locally() {
    let ledger = Ledger::new(500, 0, 1);
    let client = client(&ledger);

    let err = client.transfer(&generator().to_hex(), 1_000).await.unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InsufficientBalance));
    assert!(err.is_validation());
    assert!(ledger.built.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_with_stale_cache_classified_from_chain() {
    let ledger = Ledger::new(2_000, 0, 1);
    let client = client(&ledger);
    client.refresh().await.unwrap();

    *ledger.build_error.lock().unwrap() =
        Some(DownstreamError::new("execution reverted: Insufficient balance for range proof"));

    let err = client
        .transfer(&generator().to_base58(), 1_000)
        .await
        .unwrap_err();
    assert!(!err.is_validation());
    assert_eq!(err.code(), Some(ErrorCode::InsufficientBalance));
    assert_eq!(err.hint(), Some("Fund your account or lower the amount."));
}

#[tokio::test]
async fn test_rollover_without_pending_surfaces_error() {
    let ledger = Ledger::new(100, 0, 1);
    let client = client(&ledger);

    let err = client.rollover().await.unwrap_err();
    assert!(matches!(err, ClientError::Classified(_)));
    assert_eq!(err.code(), Some(ErrorCode::Unknown));
    assert!(ledger.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_wallet_failures_are_classified() {
    let ledger = Ledger::new(1_000, 0, 1);
    let client = client(&ledger);

    *ledger.execute_error.lock().unwrap() = Some(DownstreamError::new("ERC20: NotOwner"));
    assert_eq!(
        client.fund(10).await.unwrap_err().code(),
        Some(ErrorCode::ApprovalFailed)
    );

    *ledger.execute_error.lock().unwrap() = None;
    *ledger.inclusion_error.lock().unwrap() =
        Some(DownstreamError::with_code(ErrorCode::ProofError, "reverted"));
    assert_eq!(
        client.withdraw(10).await.unwrap_err().code(),
        Some(ErrorCode::ProofError)
    );
}

#[tokio::test]
async fn test_refresh_failure_keeps_last_snapshot() {
    let ledger = Ledger::new(750, 25, 1);
    let client = client(&ledger);
    client.refresh().await.unwrap();
    let before = client.state();

    *ledger.fail_reads.lock().unwrap() = Some("RPC: invalid key in response".to_string());
    let err = client.refresh().await.unwrap_err();

    assert_eq!(err.code(), Some(ErrorCode::Unknown));
    assert_eq!(client.state(), before);
}

#[tokio::test]
async fn test_included_operation_succeeds_when_refresh_fails() {
    let ledger = Ledger::new(1_000, 0, 1);
    let client = client(&ledger);
    client.refresh().await.unwrap();
    let before = client.state();

    *ledger.fail_reads_after_inclusion.lock().unwrap() = Some("RPC: timeout".to_string());
    let tx_hash = client.withdraw(400).await.unwrap();

    assert_eq!(tx_hash, "0x1");
    assert!(ledger.fail_reads.lock().unwrap().is_some());
    assert_eq!(client.state(), before);
}

// ==================== SERIALIZATION ====================

#[tokio::test]
async fn test_mutating_operations_never_overlap() {
    let ledger = Ledger::new(10_000, 10, 1);
    *ledger.build_delay.lock().unwrap() = Some(Duration::from_millis(20));
    let client = client(&ledger);

    let (a, b, c) = tokio::join!(client.fund(100), client.withdraw(100), client.rollover());
    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(ledger.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(ledger.submitted.lock().unwrap().len(), 3);
}

// ==================== ACCESSORS & PREFLIGHT ====================

#[tokio::test]
async fn test_accessors() {
    let ledger = Ledger::new(0, 0, 10_000);
    let client = client(&ledger);

    assert!(client.state().is_none());
    assert_eq!(client.rate_display().await.unwrap(), "1 unit = 0.01 USDC");
    assert!(client.validate_recipient_key(&client.public_key()).valid);
    assert!(!client.validate_recipient_key("0xabc").valid);
}

#[tokio::test]
async fn test_preflight_builds_without_submitting() {
    let ledger = Ledger::new(100, 0, 1);
    let client = client(&ledger);

    let report = client.preflight(50, None).await.unwrap();

    assert!(matches!(
        report.outcome(OperationKind::Fund),
        Some(PreflightOutcome::Built { call_count: 1, .. })
    ));
    assert!(matches!(
        report.outcome(OperationKind::Transfer),
        Some(PreflightOutcome::Skipped { .. })
    ));
    assert!(matches!(
        report.outcome(OperationKind::Rollover),
        Some(PreflightOutcome::Skipped { .. })
    ));
    assert!(matches!(
        report.outcome(OperationKind::Withdraw),
        Some(PreflightOutcome::Built { .. })
    ));
    assert!(matches!(
        report.outcome(OperationKind::Ragequit),
        Some(PreflightOutcome::Skipped { .. })
    ));
    assert!(report.all_passed());
    assert!(ledger.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_preflight_reports_build_failures() {
    let ledger = Ledger::new(100, 5, 1);
    *ledger.build_error.lock().unwrap() = Some(DownstreamError::new("proof of balance failed"));
    let client = client(&ledger).with_ragequit(true);

    let report = client
        .preflight(50, Some(&generator().to_hex()))
        .await
        .unwrap();

    assert!(!report.all_passed());
    match report.outcome(OperationKind::Transfer) {
        Some(PreflightOutcome::Failed { error }) => assert_eq!(error.code, ErrorCode::ProofError),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(ledger.built.lock().unwrap().len(), 5);
}
