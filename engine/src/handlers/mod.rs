//! Application handlers of the financial self-service menu.
//!
//! Every handler is a method on [`MenuHandlers`] and is registered under its
//! method name. Handlers look flags up by name on each call, recover input
//! and remote failures by raising flags, and return `Err` only for missing
//! required data and store failures.

mod account;
mod admin;
mod alias;
mod history;
mod misc;
mod mpesa;
mod pin;
mod pools;
mod profile;
mod transfer;
mod vouchers;

use std::sync::Arc;

use tracing::warn;

use crate::config::AppConfig;
use crate::error::{EngineError, Result, ServiceError};
use crate::flags::FlagManager;
use crate::l10n::Text;
use crate::registry::HandlerRegistry;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::decimal::{parse_decimals, scale_down_display};
use crate::services::{AccountService, TokenHoldings};
use crate::store::list::{Selection, TokenColumns};
use crate::store::{DataType, UserDataStore};

/// Shared context of every application handler.
pub struct MenuHandlers {
    store: UserDataStore,
    flags: Arc<FlagManager>,
    service: Arc<dyn AccountService>,
    config: AppConfig,
    separator: String,
}

impl MenuHandlers {
    pub fn new(
        store: UserDataStore,
        flags: Arc<FlagManager>,
        service: Arc<dyn AccountService>,
        config: AppConfig,
        separator: &str,
    ) -> Self {
        Self {
            store,
            flags,
            service,
            config,
            separator: separator.to_string(),
        }
    }

    pub fn store(&self) -> &UserDataStore {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn flag(&self, name: &str) -> Result<u32> {
        self.flags.get(name)
    }

    /// A field that may legitimately be unset. Empty values read as unset.
    async fn read_optional(&self, session_id: &str, dt: DataType) -> Result<Option<String>> {
        match self.store.read_string(session_id, dt).await {
            Ok(v) if v.is_empty() => Ok(None),
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// A field the current step depends on.
    async fn read_required(&self, session_id: &str, dt: DataType) -> Result<String> {
        self.read_optional(session_id, dt)
            .await?
            .ok_or_else(|| EngineError::Data(format!("{dt} missing for {session_id}")))
    }

    async fn write(&self, session_id: &str, dt: DataType, value: &str) -> Result<()> {
        self.store.write(session_id, dt, value).await?;
        Ok(())
    }

    /// Write an empty value, which reads back as unset.
    async fn clear(&self, session_id: &str, dt: DataType) -> Result<()> {
        self.write(session_id, dt, "").await
    }

    /// Record a remote failure on `res`: raise `flag_api_call_error` and show
    /// the localized failure message.
    fn service_failed(
        &self,
        req: &Request,
        res: &mut HandlerResult,
        api_error: u32,
        what: &str,
        err: &ServiceError,
    ) {
        warn!(session_id = req.session_id().unwrap_or_default(), call = what, error = %err, "service call failed");
        res.set_flag(api_error);
        res.content = Text::RequestFailed.get(req.language()).to_string();
    }

    /// Numbered list lines, `1<sep>item`, one per line.
    fn render_list<S: AsRef<str>>(&self, items: &[S]) -> String {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}{}{}", i + 1, self.separator, item.as_ref()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Read the four parallel columns of a token list.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Data` if the columns disagree in length.
    async fn read_columns(&self, session_id: &str, dts: [DataType; 4]) -> Result<TokenColumns> {
        let family = self.store.list_family(dts[0]);
        let mut cols = Vec::with_capacity(4);
        for dt in dts {
            cols.push(family.read_list(session_id, dt).await?);
        }
        let len = cols[0].len();
        if cols.iter().any(|c| c.len() != len) {
            return Err(EngineError::Data(format!(
                "list columns out of step for {session_id} ({})",
                dts[0]
            )));
        }
        let addresses = cols.pop().unwrap_or_default();
        let decimals = cols.pop().unwrap_or_default();
        let balances = cols.pop().unwrap_or_default();
        let symbols = cols.pop().unwrap_or_default();
        Ok(TokenColumns {
            symbols,
            balances,
            decimals,
            addresses,
        })
    }

    /// Write the four parallel columns of a token list, symbols last.
    async fn write_columns(
        &self,
        session_id: &str,
        dts: [DataType; 4],
        cols: &TokenColumns,
    ) -> Result<()> {
        let family = self.store.list_family(dts[0]);
        family.write_list(session_id, dts[1], &cols.balances).await?;
        family.write_list(session_id, dts[2], &cols.decimals).await?;
        family.write_list(session_id, dts[3], &cols.addresses).await?;
        family.write_list(session_id, dts[0], &cols.symbols).await?;
        Ok(())
    }
}

pub(crate) const VOUCHER_COLUMNS: [DataType; 4] = [
    DataType::VOUCHER_SYMBOLS,
    DataType::VOUCHER_BALANCES,
    DataType::VOUCHER_DECIMALS,
    DataType::VOUCHER_ADDRESSES,
];

pub(crate) const SWAP_TO_COLUMNS: [DataType; 4] = [
    DataType::SWAP_TO_SYMBOLS,
    DataType::SWAP_TO_BALANCES,
    DataType::SWAP_TO_DECIMALS,
    DataType::SWAP_TO_ADDRESSES,
];

/// Register `(request, input)` handlers under their method names.
macro_rules! register_handlers {
    ($registry:expr, $handlers:expr, [$($name:ident),* $(,)?]) => {
        $(
            let h = Arc::clone(&$handlers);
            $registry.register(stringify!($name), move |req: Request, _sym: String, input: String| {
                let h = Arc::clone(&h);
                async move { h.$name(&req, &input).await }
            });
        )*
    };
}

/// Register `(request, symbol, input)` handlers under their method names.
macro_rules! register_symbol_handlers {
    ($registry:expr, $handlers:expr, [$($name:ident),* $(,)?]) => {
        $(
            let h = Arc::clone(&$handlers);
            $registry.register(stringify!($name), move |req: Request, sym: String, input: String| {
                let h = Arc::clone(&h);
                async move { h.$name(&req, &sym, &input).await }
            });
        )*
    };
}

/// A value in a service response that does not parse fails the call.
fn malformed(err: EngineError) -> ServiceError {
    ServiceError::Malformed(err.to_string())
}

/// Token list columns of service holdings, balances scaled for display.
fn holding_columns<'a>(
    holdings: impl IntoIterator<Item = &'a TokenHoldings>,
) -> std::result::Result<TokenColumns, ServiceError> {
    let mut cols = TokenColumns::default();
    for h in holdings {
        let decimals = parse_decimals(&h.token_decimals).map_err(malformed)?;
        cols.push(Selection {
            symbol: h.token_symbol.clone(),
            balance: scale_down_display(&h.balance, decimals).map_err(malformed)?,
            decimal: h.token_decimals.clone(),
            address: h.token_address.clone(),
        });
    }
    Ok(cols)
}

/// Register every application handler.
pub fn register_all(handlers: Arc<MenuHandlers>, registry: &mut HandlerRegistry) {
    register_handlers!(registry, handlers, [
        // account
        set_language,
        create_account,
        check_account_created,
        check_account_status,
        check_identifier,
        send_address_sms,
        // pin
        save_temporary_pin,
        verify_create_pin,
        confirm_pin_change,
        check_pin_mismatch,
        authorize_account,
        reset_incorrect_pin,
        check_blocked_status,
        show_blocked_account,
        reset_account_authorized,
        reset_allow_update,
        reset_valid_pin,
        // admin
        check_admin,
        validate_blocked_number,
        retrieve_blocked_number,
        reset_others_pin,
        reset_unregistered_number,
        // profile
        save_firstname,
        save_familyname,
        save_yob,
        save_gender,
        save_location,
        save_offerings,
        verify_yob,
        reset_incorrect_date_format,
        update_all_profile_items,
        get_profile_info,
        // vouchers
        check_balance,
        manage_vouchers,
        get_vouchers,
        view_voucher,
        set_voucher,
        get_voucher_details,
        // history
        check_transactions,
        get_transactions,
        view_statement,
        // transfer
        validate_recipient,
        invite_valid_recipient,
        max_amount,
        validate_amount,
        get_recipient,
        get_sender,
        get_amount,
        transaction_swap_preview,
        initiate_transaction,
        transaction_reset,
        reset_transaction_amount,
        // pools and swaps
        get_pools,
        view_pool,
        set_default_pool,
        get_default_pool,
        load_swap_to_list,
        swap_max_limit,
        swap_preview,
        initiate_swap,
        // mpesa
        get_mpesa_max_limit,
        get_mpesa_preview,
        initiate_get_mpesa,
        // alias
        request_custom_alias,
        get_suggested_alias,
        confirm_new_alias,
        get_current_alias,
        // misc
        set_back,
        clear_temporary_value,
        reset_api_call_failure,
        quit,
        quit_with_balance,
        quit_with_help,
    ]);
    register_symbol_handlers!(registry, handlers, [get_current_profile_info]);
}
