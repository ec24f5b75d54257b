//! Confidential Balance Client
//!
//! Orchestrates the five mutating operations over one confidential
//! account. Every operation follows the same two phases:
//!
//! 1. build calldata through [`ConfidentialAccount::build`] (may generate
//!    proofs and block for seconds)
//! 2. submit through [`TransactionSubmitter`] and wait for inclusion
//!
//! Failures in either phase are classified before reaching the caller.
//! Local balance checks are fast-fail guards against the cached snapshot;
//! the chain remains the authority and may still reject a submission.

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::amount::{format_units, to_confidential_units};
use crate::config::{ClientSettings, Network, NetworkConfig};
use crate::error::{ClassifiedError, ClientError, DownstreamError, ErrorCode, ValidationError};
use crate::keys::{validate_recipient_key, KeyValidation, RecipientKey};
use crate::operation::{ConfidentialAccount, OperationRequest, TransactionSubmitter};
use crate::state::{AccountState, BalanceCache};

/// Client bound to one account on one network
pub struct ConfidentialClient<A, S> {
    pub(crate) network: Network,
    pub(crate) account: A,
    pub(crate) submitter: S,
    pub(crate) cache: BalanceCache,
    /// Serializes refresh and all mutating operations
    pub(crate) op_lock: Mutex<()>,
    pub(crate) ragequit_enabled: bool,
}

impl<A, S> ConfidentialClient<A, S>
where
    A: ConfidentialAccount,
    S: TransactionSubmitter,
{
    /// Create a client with ragequit disabled
    pub fn new(network: Network, account: A, submitter: S) -> Self {
        Self {
            network,
            account,
            submitter,
            cache: BalanceCache::new(),
            op_lock: Mutex::new(()),
            ragequit_enabled: false,
        }
    }

    pub fn from_settings(settings: &ClientSettings, account: A, submitter: S) -> Self {
        Self::new(settings.network, account, submitter).with_ragequit(settings.enable_ragequit)
    }

    /// Opt in to (or out of) the irreversible full exit
    pub fn with_ragequit(mut self, enabled: bool) -> Self {
        self.ragequit_enabled = enabled;
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn network_config(&self) -> &'static NetworkConfig {
        self.network.config()
    }

    // ==================== ACCESSORS ====================

    /// Display form of the confidential public key
    pub fn public_key(&self) -> String {
        self.account.public_key().to_base58()
    }

    /// Last synchronized state; `None` before the first successful refresh
    pub fn state(&self) -> Option<AccountState> {
        self.cache.get()
    }

    /// Human-readable conversion rate, e.g. `1 unit = 0.01 USDC`.
    ///
    /// Reads the rate from the contract, so two calls may disagree if the
    /// rate changes in between.
    pub async fn rate_display(&self) -> Result<String, ClientError> {
        let rate = self.account.rate().await?;
        let config = self.network_config();
        Ok(format!(
            "1 unit = {} {}",
            format_units(rate, config.token_decimals),
            config.token_symbol
        ))
    }

    pub fn validate_recipient_key(&self, key: &str) -> KeyValidation {
        validate_recipient_key(key)
    }

    // ==================== STATE ====================

    /// Re-read balance, pending, nonce, rate and bit size and replace the
    /// cached state. On failure the previous state is kept.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn refresh(&self) -> Result<AccountState, ClientError> {
        let _guard = self.op_lock.lock().await;
        self.refresh_locked().await
    }

    pub(crate) async fn refresh_locked(&self) -> Result<AccountState, ClientError> {
        let read = async {
            let snapshot = self.account.state().await?;
            let rate = self.account.rate().await?;
            let bit_size = self.account.bit_size().await?;
            Ok::<_, DownstreamError>(AccountState {
                snapshot,
                rate,
                bit_size,
            })
        };

        match read.await {
            Ok(state) => {
                self.cache.replace(state);
                debug!(
                    balance = %state.snapshot.balance,
                    pending = %state.snapshot.pending,
                    nonce = state.snapshot.nonce,
                    "State refreshed"
                );
                Ok(state)
            }
            Err(e) => {
                warn!(error = %e, "State refresh failed, keeping last snapshot");
                Err(ClassifiedError {
                    code: ErrorCode::Unknown,
                    message: e.message,
                    hint: None,
                }
                .into())
            }
        }
    }

    /// Cached state, reading from chain first if nothing is cached yet
    pub(crate) async fn ensure_state_locked(&self) -> Result<AccountState, ClientError> {
        match self.cache.get() {
            Some(state) => Ok(state),
            None => self.refresh_locked().await,
        }
    }

    pub(crate) fn to_units(&self, amount: u128, rate: u128) -> Result<u128, ClientError> {
        let units = to_confidential_units(amount, rate);
        if units == 0 {
            return Err(ValidationError::BelowRate { amount, rate }.into());
        }
        Ok(units)
    }

    pub(crate) fn check_balance(state: &AccountState, requested: u128) -> Result<(), ClientError> {
        let available = state.current_balance();
        if available < requested {
            return Err(ValidationError::InsufficientBalance {
                requested,
                available,
            }
            .into());
        }
        Ok(())
    }

    // ==================== OPERATIONS ====================

    /// Move `amount` token base units from the wallet into the confidential
    /// balance. Adds an ERC-20 approval when the allowance is short.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn fund(&self, amount: u128) -> Result<String, ClientError> {
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }

        let _guard = self.op_lock.lock().await;
        let state = self.ensure_state_locked().await?;
        let units = self.to_units(amount, state.rate)?;

        self.submit(OperationRequest::fund(units, self.submitter.address()))
            .await
    }

    /// Send `amount` token base units worth of confidential balance to
    /// another account.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn transfer(&self, recipient: &str, amount: u128) -> Result<String, ClientError> {
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        let recipient = RecipientKey::parse(recipient)
            .map_err(|e| ValidationError::InvalidRecipient(e.to_string()))?;

        let _guard = self.op_lock.lock().await;
        let state = self.ensure_state_locked().await?;
        let units = self.to_units(amount, state.rate)?;
        Self::check_balance(&state, units)?;

        self.submit(OperationRequest::transfer(
            recipient,
            units,
            self.submitter.address(),
        ))
        .await
    }

    /// Move pending balance into the spendable balance.
    ///
    /// Not guarded locally: with nothing pending the contract rejects it and
    /// the rejection is classified like any other failure.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn rollover(&self) -> Result<String, ClientError> {
        let _guard = self.op_lock.lock().await;
        self.submit(OperationRequest::rollover(self.submitter.address()))
            .await
    }

    /// Withdraw `amount` token base units to the wallet address.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn withdraw(&self, amount: u128) -> Result<String, ClientError> {
        if amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }

        let _guard = self.op_lock.lock().await;
        let state = self.ensure_state_locked().await?;
        let units = self.to_units(amount, state.rate)?;
        Self::check_balance(&state, units)?;

        self.submit(OperationRequest::withdraw(units, self.submitter.address()))
            .await
    }

    /// Withdraw everything and close out confidential state. Requires the
    /// ragequit opt-in.
    #[instrument(skip(self), fields(network = %self.network))]
    pub async fn ragequit(&self) -> Result<String, ClientError> {
        if !self.ragequit_enabled {
            return Err(ValidationError::RagequitDisabled.into());
        }

        let _guard = self.op_lock.lock().await;
        let state = self.ensure_state_locked().await?;
        if state.current_balance() == 0 {
            return Err(ValidationError::NothingToWithdraw.into());
        }

        self.submit(OperationRequest::ragequit(self.submitter.address()))
            .await
    }

    /// Build, submit, wait. Caller holds `op_lock`.
    async fn submit(&self, request: OperationRequest) -> Result<String, ClientError> {
        let kind = request.kind;

        let built = self.account.build(&request).await.map_err(|e| {
            warn!(operation = %kind, error = %e, "Failed to build operation");
            ClientError::from(e)
        })?;
        debug!(
            operation = %kind,
            has_approval = built.has_approval(),
            "Calldata built"
        );

        let tx_hash = self.submitter.execute(built.into_calls()).await.map_err(|e| {
            warn!(operation = %kind, error = %e, "Transaction submission failed");
            ClientError::from(e)
        })?;
        info!(operation = %kind, %tx_hash, "Transaction submitted");

        self.submitter
            .wait_for_inclusion(&tx_hash)
            .await
            .map_err(|e| {
                warn!(operation = %kind, %tx_hash, error = %e, "Transaction failed on-chain");
                ClientError::from(e)
            })?;
        info!(operation = %kind, %tx_hash, "Transaction included");

        // The operation already succeeded; a failed re-read only leaves the
        // cache stale
        if let Err(e) = self.refresh_locked().await {
            warn!(operation = %kind, error = %e, "Post-operation refresh failed");
        }

        Ok(tx_hash)
    }
}
