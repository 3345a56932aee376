//! Account service: first-contact provisioning, referral linking, and the
//! operator controls that act on whole accounts.

use chrono::Utc;

use crate::auth::AdminGate;
use crate::domain::{short_token, Account, AccountId, Amount, ExternalId, SeedProfile, Tier};
use crate::error::{WalletError, WalletResult};
use crate::notify::NotificationBus;
use crate::store::{is_unique_violation, WalletStore};

/// Attempts at minting a unique referral code before giving up.
const MAX_CODE_ATTEMPTS: u32 = 16;

/// Fan-out result of [`AccountService::broadcast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Notices the bus accepted.
    pub sent: usize,
    /// Notices the bus refused.
    pub failed: usize,
}

/// Orchestrates account lifecycle: idempotent creation with referral
/// attachment, profile reads, and the ban/broadcast operator controls.
#[derive(Debug, Clone)]
pub struct AccountService {
    store: WalletStore,
    notifier: NotificationBus,
    gate: AdminGate,
}

impl AccountService {
    /// Creates a new `AccountService`.
    #[must_use]
    pub fn new(store: WalletStore, notifier: NotificationBus, gate: AdminGate) -> Self {
        Self {
            store,
            notifier,
            gate,
        }
    }

    /// Returns the account for `external_id`, creating it on first contact.
    ///
    /// An existing account comes back unchanged apart from a last-active
    /// touch and a display-name refresh when the seed carries a new one. A
    /// new account starts at balance zero with a freshly minted referral
    /// code; a referring code in the seed is resolved now, and a resolved
    /// referrer is linked and its referral count bumped in the same unit.
    /// Codes that resolve to nothing (or to the caller) are ignored.
    ///
    /// # Errors
    ///
    /// [`WalletError::Internal`] when no unique referral code could be
    /// allocated; persistence errors otherwise.
    pub async fn get_or_create(
        &self,
        external_id: &ExternalId,
        profile: SeedProfile,
    ) -> WalletResult<Account> {
        if let Some(row) = self
            .store
            .account_by_external(self.store.pool(), external_id)
            .await?
        {
            let mut account = Account::try_from(row)?;
            let now = Utc::now();
            self.store
                .touch_last_active(self.store.pool(), account.id, now)
                .await?;
            account.last_active_at = now;
            if let Some(name) = &profile.display_name {
                if account.display_name.as_deref() != Some(name.as_str()) {
                    self.store
                        .update_display_name(self.store.pool(), account.id, name)
                        .await?;
                    account.display_name = Some(name.clone());
                }
            }
            return Ok(account);
        }

        let referrer = self.resolve_referrer(external_id, &profile).await?;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let now = Utc::now();
            let account = Account {
                id: AccountId::new(),
                external_id: external_id.clone(),
                display_name: profile.display_name.clone(),
                balance: Amount::ZERO,
                referral_code: short_token(),
                referred_by: referrer.as_ref().map(|r| r.referral_code.clone()),
                referral_count: 0,
                referral_earnings: Amount::ZERO,
                total_wagered: Amount::ZERO,
                total_won: Amount::ZERO,
                tier: Tier::Beginner,
                banned: false,
                created_at: now,
                last_active_at: now,
            };
            let mut unit = self.store.begin().await?;
            match self.store.insert_account(&mut *unit, &account).await {
                Ok(()) => {
                    if let Some(referrer) = &referrer {
                        self.store
                            .increment_referral_count(&mut *unit, referrer.id)
                            .await?;
                    }
                    unit.commit().await?;
                    tracing::info!(
                        account = %account.id,
                        external = %account.external_id,
                        referred = referrer.is_some(),
                        "account created"
                    );
                    if let Some(referrer) = &referrer {
                        self.notifier.notify(
                            &referrer.external_id,
                            format!(
                                "New referral joined through your code: {}",
                                account.display_label()
                            ),
                        );
                    }
                    return Ok(account);
                }
                Err(WalletError::Persistence(ref err)) if is_unique_violation(err) => {
                    drop(unit);
                    // Either we lost a first-contact race, or the minted
                    // referral code collided.
                    if let Some(row) = self
                        .store
                        .account_by_external(self.store.pool(), external_id)
                        .await?
                    {
                        return Ok(Account::try_from(row)?);
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Err(WalletError::Internal(
            "could not allocate a unique referral code".to_owned(),
        ))
    }

    /// Resolves the seed's referring code to a linkable account.
    async fn resolve_referrer(
        &self,
        external_id: &ExternalId,
        profile: &SeedProfile,
    ) -> WalletResult<Option<Account>> {
        let Some(raw) = &profile.referred_by_code else {
            return Ok(None);
        };
        let code = raw.trim().to_uppercase();
        let Some(row) = self
            .store
            .account_by_referral_code(self.store.pool(), &code)
            .await?
        else {
            tracing::debug!(code, "referring code resolves to no account");
            return Ok(None);
        };
        let candidate = Account::try_from(row)?;
        if candidate.external_id == *external_id {
            return Ok(None);
        }
        Ok(Some(candidate))
    }

    /// Fetches the account and stats behind an external reference.
    ///
    /// # Errors
    ///
    /// [`WalletError::AccountNotFound`] when no account matches.
    pub async fn by_external(&self, external_id: &ExternalId) -> WalletResult<Account> {
        let Some(row) = self
            .store
            .account_by_external(self.store.pool(), external_id)
            .await?
        else {
            return Err(WalletError::AccountNotFound(external_id.to_string()));
        };
        Ok(Account::try_from(row)?)
    }

    /// Fetches an account by internal id.
    ///
    /// # Errors
    ///
    /// [`WalletError::AccountNotFound`] when no account matches.
    pub async fn by_id(&self, account_id: AccountId) -> WalletResult<Account> {
        let Some(row) = self
            .store
            .account_by_id(self.store.pool(), account_id)
            .await?
        else {
            return Err(WalletError::AccountNotFound(account_id.to_string()));
        };
        Ok(Account::try_from(row)?)
    }

    /// Sets or clears an account's ban flag. Banned accounts are refused
    /// every balance-touching workflow until unbanned.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator;
    /// [`WalletError::AccountNotFound`] for an unknown account.
    pub async fn set_banned(
        &self,
        acting: &ExternalId,
        account_id: AccountId,
        banned: bool,
    ) -> WalletResult<()> {
        self.gate.ensure(acting)?;
        self.store
            .set_banned(self.store.pool(), account_id, banned)
            .await?;
        tracing::info!(account = %account_id, banned, "ban flag updated");
        Ok(())
    }

    /// Sends `text` to every known account, best-effort, and reports how
    /// many notices the bus took.
    ///
    /// # Errors
    ///
    /// [`WalletError::Unauthorized`] when `acting` is not an operator;
    /// persistence errors otherwise.
    pub async fn broadcast(
        &self,
        acting: &ExternalId,
        text: &str,
    ) -> WalletResult<BroadcastReport> {
        self.gate.ensure(acting)?;
        let recipients = self.store.list_external_ids(self.store.pool()).await?;
        let mut report = BroadcastReport { sent: 0, failed: 0 };
        for to in recipients {
            match self.notifier.send(to, text) {
                Ok(_) => report.sent = report.sent.saturating_add(1),
                Err(err) => {
                    tracing::warn!(error = %err, "broadcast notice dropped");
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }
        tracing::info!(sent = report.sent, failed = report.failed, "broadcast complete");
        Ok(report)
    }
}
