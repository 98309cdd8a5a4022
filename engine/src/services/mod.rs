//! Remote account, data and messaging services used by the handlers.
//!
//! Calls are cancelled by dropping their futures; the session loop does so
//! when the shutdown token fires.

pub mod rest;
pub mod types;

use async_trait::async_trait;

use crate::error::ServiceError;

pub use rest::HttpAccountService;
pub use types::*;

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

#[async_trait]
pub trait AccountService: Send + Sync {
    // ---- accounts ----

    async fn create_account(&self) -> ServiceResult<AccountResult>;

    async fn track_account_status(&self, public_key: &str) -> ServiceResult<TrackStatusResult>;

    // ---- holdings and history ----

    async fn fetch_vouchers(&self, public_key: &str) -> ServiceResult<Vec<TokenHoldings>>;

    async fn voucher_data(&self, address: &str) -> ServiceResult<VoucherDataResult>;

    /// The most recent transfers, newest first (at most ten).
    async fn fetch_transactions(&self, public_key: &str) -> ServiceResult<Vec<Transfer>>;

    // ---- transfers ----

    /// Transfer `amount` minor units of `token_address` from `from` to `to`.
    async fn token_transfer(
        &self,
        amount: &str,
        from: &str,
        to: &str,
        token_address: &str,
    ) -> ServiceResult<TokenTransferResult>;

    // ---- aliases ----

    async fn check_alias_address(&self, alias: &str) -> ServiceResult<AliasAddress>;

    async fn request_alias(&self, public_key: &str, hint: &str) -> ServiceResult<RequestAliasResult>;

    async fn update_alias(&self, hint: &str, public_key: &str) -> ServiceResult<RequestAliasResult>;

    // ---- pools ----

    async fn fetch_top_pools(&self) -> ServiceResult<Vec<Pool>>;

    async fn retrieve_pool_details(&self, sym_or_address: &str) -> ServiceResult<Pool>;

    async fn check_token_in_pool(&self, pool: &str, token: &str) -> ServiceResult<TokenInPool>;

    async fn get_pool_swappable_vouchers(&self, pool: &str) -> ServiceResult<Vec<TokenHoldings>>;

    async fn get_swap_from_token_max_limit(
        &self,
        pool: &str,
        from: &str,
        to: &str,
        public_key: &str,
    ) -> ServiceResult<MaxLimitResult>;

    async fn get_pool_swap_quote(
        &self,
        amount: &str,
        public_key: &str,
        from: &str,
        pool: &str,
        to: &str,
    ) -> ServiceResult<SwapQuote>;

    /// How much of `from` must be swapped to obtain `out_amount` of `to`.
    async fn get_credit_send_reverse_quote(
        &self,
        pool: &str,
        from: &str,
        to: &str,
        out_amount: &str,
    ) -> ServiceResult<ReverseQuote>;

    async fn pool_swap(
        &self,
        amount: &str,
        public_key: &str,
        from: &str,
        pool: &str,
        to: &str,
    ) -> ServiceResult<PoolSwapResult>;

    // ---- messaging ----

    async fn send_upsell_sms(&self, from: &str, to: &str) -> ServiceResult<()>;

    async fn send_pin_reset_sms(&self, admin: &str, blocked: &str) -> ServiceResult<()>;

    async fn send_address_sms(&self, public_key: &str, phone: &str) -> ServiceResult<()>;
}
