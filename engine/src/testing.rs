//! Recording fake of [`AccountService`] for tests and offline runs.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ServiceError;
use crate::services::types::*;
use crate::services::{AccountService, ServiceResult};

/// One recorded service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct Script {
    account: Option<AccountResult>,
    active: bool,
    vouchers: Vec<TokenHoldings>,
    voucher_data: HashMap<String, VoucherDataResult>,
    transfers: Vec<Transfer>,
    tracking_id: String,
    aliases: HashMap<String, String>,
    alias_result: Option<String>,
    pools: Vec<Pool>,
    pool_details: HashMap<String, Pool>,
    swappable_from: HashSet<String>,
    swappable: Vec<TokenHoldings>,
    max_limit: String,
    quote: String,
    reverse_quote: Option<ReverseQuote>,
    failing: HashSet<&'static str>,
}

/// Returns scripted results and records every call.
///
/// Unscripted single-value calls fail with `ServiceError::Unavailable`;
/// unscripted list calls return empty lists.
#[derive(Debug, Default)]
pub struct FakeAccountService {
    script: Mutex<Script>,
    calls: Mutex<Vec<Call>>,
}

/// Shorthand for a holdings row.
pub fn holding(symbol: &str, balance: &str, decimals: &str, address: &str) -> TokenHoldings {
    TokenHoldings {
        token_address: address.to_string(),
        token_symbol: symbol.to_string(),
        token_decimals: decimals.to_string(),
        balance: balance.to_string(),
    }
}

impl FakeAccountService {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- scripting ----

    pub fn set_account(&self, tracking_id: &str, public_key: &str) {
        self.script.lock().account = Some(AccountResult {
            tracking_id: tracking_id.to_string(),
            public_key: public_key.to_string(),
        });
    }

    pub fn set_active(&self, active: bool) {
        self.script.lock().active = active;
    }

    pub fn set_vouchers(&self, vouchers: Vec<TokenHoldings>) {
        self.script.lock().vouchers = vouchers;
    }

    pub fn set_voucher_data(&self, address: &str, data: VoucherDataResult) {
        self.script
            .lock()
            .voucher_data
            .insert(address.to_string(), data);
    }

    pub fn set_transfers(&self, transfers: Vec<Transfer>) {
        self.script.lock().transfers = transfers;
    }

    /// Tracking id returned by transfers and swaps.
    pub fn set_tracking_id(&self, tracking_id: &str) {
        self.script.lock().tracking_id = tracking_id.to_string();
    }

    pub fn set_alias(&self, alias: &str, address: &str) {
        self.script
            .lock()
            .aliases
            .insert(alias.to_string(), address.to_string());
    }

    /// Alias returned by alias registration and update.
    pub fn set_alias_result(&self, alias: &str) {
        self.script.lock().alias_result = Some(alias.to_string());
    }

    pub fn set_pools(&self, pools: Vec<Pool>) {
        self.script.lock().pools = pools;
    }

    pub fn set_pool_details(&self, key: &str, pool: Pool) {
        self.script
            .lock()
            .pool_details
            .insert(key.to_string(), pool);
    }

    /// Mark `token` as swappable from in every pool.
    pub fn set_swappable_from(&self, token: &str) {
        self.script
            .lock()
            .swappable_from
            .insert(token.to_string());
    }

    pub fn set_swappable(&self, vouchers: Vec<TokenHoldings>) {
        self.script.lock().swappable = vouchers;
    }

    pub fn set_max_limit(&self, max: &str) {
        self.script.lock().max_limit = max.to_string();
    }

    pub fn set_quote(&self, out_value: &str) {
        self.script.lock().quote = out_value.to_string();
    }

    pub fn set_reverse_quote(&self, input_amount: &str, output_amount: &str) {
        self.script.lock().reverse_quote = Some(ReverseQuote {
            input_amount: input_amount.to_string(),
            output_amount: output_amount.to_string(),
        });
    }

    /// Make every call to `method` fail.
    pub fn fail(&self, method: &'static str) {
        self.script.lock().failing.insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.script.lock().failing.remove(method);
    }

    // ---- inspection ----

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, method: &'static str, args: &[&str]) -> ServiceResult<()> {
        self.calls.lock().push(Call {
            method,
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        if self.script.lock().failing.contains(method) {
            return Err(ServiceError::Unavailable(format!("{method} failed")));
        }
        Ok(())
    }

    fn unscripted(method: &str) -> ServiceError {
        ServiceError::Unavailable(format!("{method} not scripted"))
    }

    fn tracking_id(&self) -> String {
        let id = self.script.lock().tracking_id.clone();
        if id.is_empty() {
            "TRACK-1".to_string()
        } else {
            id
        }
    }
}

#[async_trait]
impl AccountService for FakeAccountService {
    async fn create_account(&self) -> ServiceResult<AccountResult> {
        self.record("create_account", &[])?;
        self.script
            .lock()
            .account
            .clone()
            .ok_or_else(|| Self::unscripted("create_account"))
    }

    async fn track_account_status(&self, public_key: &str) -> ServiceResult<TrackStatusResult> {
        self.record("track_account_status", &[public_key])?;
        Ok(TrackStatusResult {
            active: self.script.lock().active,
        })
    }

    async fn fetch_vouchers(&self, public_key: &str) -> ServiceResult<Vec<TokenHoldings>> {
        self.record("fetch_vouchers", &[public_key])?;
        Ok(self.script.lock().vouchers.clone())
    }

    async fn voucher_data(&self, address: &str) -> ServiceResult<VoucherDataResult> {
        self.record("voucher_data", &[address])?;
        self.script
            .lock()
            .voucher_data
            .get(address)
            .cloned()
            .ok_or_else(|| Self::unscripted("voucher_data"))
    }

    async fn fetch_transactions(&self, public_key: &str) -> ServiceResult<Vec<Transfer>> {
        self.record("fetch_transactions", &[public_key])?;
        Ok(self.script.lock().transfers.clone())
    }

    async fn token_transfer(
        &self,
        amount: &str,
        from: &str,
        to: &str,
        token_address: &str,
    ) -> ServiceResult<TokenTransferResult> {
        self.record("token_transfer", &[amount, from, to, token_address])?;
        Ok(TokenTransferResult {
            tracking_id: self.tracking_id(),
        })
    }

    async fn check_alias_address(&self, alias: &str) -> ServiceResult<AliasAddress> {
        self.record("check_alias_address", &[alias])?;
        self.script
            .lock()
            .aliases
            .get(alias)
            .map(|a| AliasAddress { address: a.clone() })
            .ok_or_else(|| ServiceError::Api {
                description: format!("alias {alias} not found"),
            })
    }

    async fn request_alias(&self, public_key: &str, hint: &str) -> ServiceResult<RequestAliasResult> {
        self.record("request_alias", &[public_key, hint])?;
        self.script
            .lock()
            .alias_result
            .clone()
            .map(|alias| RequestAliasResult { alias })
            .ok_or_else(|| Self::unscripted("request_alias"))
    }

    async fn update_alias(&self, hint: &str, public_key: &str) -> ServiceResult<RequestAliasResult> {
        self.record("update_alias", &[hint, public_key])?;
        self.script
            .lock()
            .alias_result
            .clone()
            .map(|alias| RequestAliasResult { alias })
            .ok_or_else(|| Self::unscripted("update_alias"))
    }

    async fn fetch_top_pools(&self) -> ServiceResult<Vec<Pool>> {
        self.record("fetch_top_pools", &[])?;
        Ok(self.script.lock().pools.clone())
    }

    async fn retrieve_pool_details(&self, sym_or_address: &str) -> ServiceResult<Pool> {
        self.record("retrieve_pool_details", &[sym_or_address])?;
        self.script
            .lock()
            .pool_details
            .get(sym_or_address)
            .cloned()
            .ok_or_else(|| ServiceError::Api {
                description: format!("pool {sym_or_address} not found"),
            })
    }

    async fn check_token_in_pool(&self, pool: &str, token: &str) -> ServiceResult<TokenInPool> {
        self.record("check_token_in_pool", &[pool, token])?;
        Ok(TokenInPool {
            can_swap_from: self.script.lock().swappable_from.contains(token),
        })
    }

    async fn get_pool_swappable_vouchers(&self, pool: &str) -> ServiceResult<Vec<TokenHoldings>> {
        self.record("get_pool_swappable_vouchers", &[pool])?;
        Ok(self.script.lock().swappable.clone())
    }

    async fn get_swap_from_token_max_limit(
        &self,
        pool: &str,
        from: &str,
        to: &str,
        public_key: &str,
    ) -> ServiceResult<MaxLimitResult> {
        self.record("get_swap_from_token_max_limit", &[pool, from, to, public_key])?;
        let max = self.script.lock().max_limit.clone();
        if max.is_empty() {
            return Err(Self::unscripted("get_swap_from_token_max_limit"));
        }
        Ok(MaxLimitResult { max })
    }

    async fn get_pool_swap_quote(
        &self,
        amount: &str,
        public_key: &str,
        from: &str,
        pool: &str,
        to: &str,
    ) -> ServiceResult<SwapQuote> {
        self.record("get_pool_swap_quote", &[amount, public_key, from, pool, to])?;
        let out_value = self.script.lock().quote.clone();
        if out_value.is_empty() {
            return Err(Self::unscripted("get_pool_swap_quote"));
        }
        Ok(SwapQuote { out_value })
    }

    async fn get_credit_send_reverse_quote(
        &self,
        pool: &str,
        from: &str,
        to: &str,
        out_amount: &str,
    ) -> ServiceResult<ReverseQuote> {
        self.record("get_credit_send_reverse_quote", &[pool, from, to, out_amount])?;
        self.script
            .lock()
            .reverse_quote
            .clone()
            .ok_or_else(|| Self::unscripted("get_credit_send_reverse_quote"))
    }

    async fn pool_swap(
        &self,
        amount: &str,
        public_key: &str,
        from: &str,
        pool: &str,
        to: &str,
    ) -> ServiceResult<PoolSwapResult> {
        self.record("pool_swap", &[amount, public_key, from, pool, to])?;
        Ok(PoolSwapResult {
            tracking_id: self.tracking_id(),
        })
    }

    async fn send_upsell_sms(&self, from: &str, to: &str) -> ServiceResult<()> {
        self.record("send_upsell_sms", &[from, to])
    }

    async fn send_pin_reset_sms(&self, admin: &str, blocked: &str) -> ServiceResult<()> {
        self.record("send_pin_reset_sms", &[admin, blocked])
    }

    async fn send_address_sms(&self, public_key: &str, phone: &str) -> ServiceResult<()> {
        self.record("send_address_sms", &[public_key, phone])
    }
}
