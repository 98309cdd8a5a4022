use rust_decimal::Decimal;
use tracing::info;

use super::{holding_columns, malformed, MenuHandlers, SWAP_TO_COLUMNS};
use crate::decimal::{
    parse_decimal, parse_decimals, scale_down, scale_down_display, scale_up, truncate,
    DISPLAY_PLACES,
};
use crate::error::{Result, ServiceError};
use crate::l10n::Text;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::services::Pool;
use crate::store::list::Selection;
use crate::store::DataType;

/// Pools listed on the pool menu.
const MAX_POOLS: usize = 5;

impl MenuHandlers {
    /// The pool list cached by `get_pools`.
    async fn read_pools(&self, session_id: &str) -> Result<Vec<Pool>> {
        let family = self.store.list_family(DataType::POOL_NAMES);
        let mut cols = Vec::with_capacity(3);
        for dt in [
            DataType::POOL_NAMES,
            DataType::POOL_SYMBOLS,
            DataType::POOL_ADDRESSES,
        ] {
            cols.push(family.read_list(session_id, dt).await?);
        }
        Ok(cols[0]
            .iter()
            .zip(&cols[1])
            .zip(&cols[2])
            .map(|((name, symbol), address)| Pool {
                pool_name: name.clone(),
                pool_symbol: symbol.clone(),
                pool_contract_address: address.clone(),
            })
            .collect())
    }

    /// Refresh the top pools and list them by name.
    pub async fn get_pools(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let api_error = self.flag("flag_api_call_error")?;

        let mut res = HandlerResult::new();
        let pools = match self.service.fetch_top_pools().await {
            Ok(mut p) => {
                p.truncate(MAX_POOLS);
                res.reset_flag(api_error);
                p
            }
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "fetch_top_pools", &e);
                return Ok(res);
            }
        };

        let names: Vec<&str> = pools.iter().map(|p| p.pool_name.as_str()).collect();
        let symbols: Vec<&str> = pools.iter().map(|p| p.pool_symbol.as_str()).collect();
        let addresses: Vec<&str> = pools
            .iter()
            .map(|p| p.pool_contract_address.as_str())
            .collect();
        let family = self.store.list_family(DataType::POOL_NAMES);
        family
            .write_list(session_id, DataType::POOL_SYMBOLS, &symbols)
            .await?;
        family
            .write_list(session_id, DataType::POOL_ADDRESSES, &addresses)
            .await?;
        family
            .write_list(session_id, DataType::POOL_NAMES, &names)
            .await?;

        res.content = self.render_list(&names);
        Ok(res)
    }

    /// Stage a pool picked from the list, or looked up remotely by symbol or
    /// address.
    pub async fn view_pool(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let incorrect_pool = self.flag("flag_incorrect_pool")?;
        let api_error = self.flag("flag_api_call_error")?;

        let input = input.trim();
        let pools = self.read_pools(session_id).await?;
        let listed = match input.parse::<usize>() {
            Ok(i) => i.checked_sub(1).and_then(|i| pools.get(i)).cloned(),
            Err(_) => pools
                .iter()
                .find(|p| p.pool_symbol.eq_ignore_ascii_case(input))
                .cloned(),
        };

        let mut res = HandlerResult::new();
        let pool = match listed {
            Some(p) => p,
            None if input.is_empty() => {
                return Ok(res.set(incorrect_pool));
            }
            None => match self.service.retrieve_pool_details(input).await {
                Ok(p) => p,
                Err(ServiceError::Api { .. }) => {
                    return Ok(HandlerResult::with_content(input).set(incorrect_pool));
                }
                Err(e) => {
                    self.service_failed(req, &mut res, api_error, "retrieve_pool_details", &e);
                    return Ok(res);
                }
            },
        };

        let staged = Selection {
            symbol: pool.pool_symbol.clone(),
            balance: String::new(),
            decimal: String::new(),
            address: pool.pool_contract_address.clone(),
        };
        self.write(session_id, DataType::TEMPORARY_VALUE, &staged.encode())
            .await?;
        res.content = format!("{}\n{}", pool.pool_name, pool.pool_symbol);
        res.reset_flag(incorrect_pool);
        Ok(res)
    }

    /// Make the staged pool the active pool.
    pub async fn set_default_pool(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let staged = Selection::decode(
            &self
                .read_required(session_id, DataType::TEMPORARY_VALUE)
                .await?,
        )?;
        let name = self
            .read_pools(session_id)
            .await?
            .into_iter()
            .find(|p| p.pool_contract_address.eq_ignore_ascii_case(&staged.address))
            .map(|p| p.pool_name)
            .unwrap_or_else(|| staged.symbol.clone());

        self.write(session_id, DataType::ACTIVE_POOL_ADDRESS, &staged.address)
            .await?;
        self.write(session_id, DataType::ACTIVE_POOL_SYM, &staged.symbol)
            .await?;
        self.write(session_id, DataType::ACTIVE_POOL_NAME, &name)
            .await?;
        self.clear(session_id, DataType::TEMPORARY_VALUE).await?;
        Ok(HandlerResult::with_content(name))
    }

    pub async fn get_default_pool(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let symbol = self
            .read_optional(session_id, DataType::ACTIVE_POOL_SYM)
            .await?
            .unwrap_or_else(|| self.config.default_pool_symbol.clone());
        Ok(HandlerResult::with_content(symbol))
    }

    /// List the vouchers the active voucher can be swapped into.
    pub async fn load_swap_to_list(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let no_active = self.flag("flag_no_active_voucher")?;
        let incorrect_voucher = self.flag("flag_incorrect_voucher")?;
        let api_error = self.flag("flag_api_call_error")?;

        let Some(from_symbol) = self.read_optional(session_id, DataType::ACTIVE_SYM).await? else {
            return Ok(HandlerResult::new().set(no_active));
        };
        let from = self
            .read_required(session_id, DataType::ACTIVE_ADDRESS)
            .await?;
        let from_decimal = self
            .read_required(session_id, DataType::ACTIVE_DECIMAL)
            .await?;
        let pool = self.active_pool(session_id).await?;

        let mut res = HandlerResult::new();
        match self.service.check_token_in_pool(&pool, &from).await {
            Ok(r) if r.can_swap_from => {}
            Ok(_) => {
                return Ok(HandlerResult::with_content(from_symbol)
                    .set(incorrect_voucher)
                    .reset(no_active)
                    .reset(api_error));
            }
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "check_token_in_pool", &e);
                return Ok(res);
            }
        }

        self.write(session_id, DataType::ACTIVE_SWAP_FROM_SYM, &from_symbol)
            .await?;
        self.write(session_id, DataType::ACTIVE_SWAP_FROM_DECIMAL, &from_decimal)
            .await?;
        self.write(session_id, DataType::ACTIVE_SWAP_FROM_ADDRESS, &from)
            .await?;

        let fetched = self
            .service
            .get_pool_swappable_vouchers(&pool)
            .await
            .and_then(|candidates| {
                holding_columns(
                    candidates
                        .iter()
                        .filter(|c| !c.token_address.eq_ignore_ascii_case(&from)),
                )
            });
        let cols = match fetched {
            Ok(c) => c,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "get_pool_swappable_vouchers", &e);
                return Ok(res);
            }
        };
        self.write_columns(session_id, SWAP_TO_COLUMNS, &cols).await?;

        res.content = self.render_list(&cols.symbols);
        res.reset_flag(no_active);
        res.reset_flag(incorrect_voucher);
        res.reset_flag(api_error);
        Ok(res)
    }

    /// Pick the voucher to swap into and compute the largest swap.
    ///
    /// Limits below the minimum swap amount raise `flag_low_swap_amount`.
    pub async fn swap_max_limit(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let incorrect_voucher = self.flag("flag_incorrect_voucher")?;
        let low_swap = self.flag("flag_low_swap_amount")?;
        let api_error = self.flag("flag_api_call_error")?;

        let cols = self.read_columns(session_id, SWAP_TO_COLUMNS).await?;
        let Some(to) = cols.select(input) else {
            return Ok(HandlerResult::with_content(input.trim()).set(incorrect_voucher));
        };
        self.write(session_id, DataType::ACTIVE_SWAP_TO_SYM, &to.symbol)
            .await?;
        self.write(session_id, DataType::ACTIVE_SWAP_TO_DECIMAL, &to.decimal)
            .await?;
        self.write(session_id, DataType::ACTIVE_SWAP_TO_ADDRESS, &to.address)
            .await?;

        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let from = self
            .read_required(session_id, DataType::ACTIVE_SWAP_FROM_ADDRESS)
            .await?;
        let from_decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::ACTIVE_SWAP_FROM_DECIMAL)
                .await?,
        )?;
        let pool = self.active_pool(session_id).await?;

        let mut res = HandlerResult::new();
        res.reset_flag(incorrect_voucher);
        let max = match self
            .service
            .get_swap_from_token_max_limit(&pool, &from, &to.address, &public_key)
            .await
            .and_then(|l| scale_down(&l.max, from_decimals).map_err(malformed))
        {
            Ok(m) => m,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "get_swap_from_token_max_limit", &e);
                return Ok(res);
            }
        };
        let display = truncate(max, DISPLAY_PLACES).to_string();
        res.content = display.clone();
        res.reset_flag(api_error);
        if max < self.config.min_swap_amount {
            res.set_flag(low_swap);
            return Ok(res);
        }
        self.write(session_id, DataType::ACTIVE_SWAP_MAX_AMOUNT, &display)
            .await?;
        res.reset_flag(low_swap);
        Ok(res)
    }

    /// Validate the swap amount and quote the output.
    pub async fn swap_preview(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let invalid_amount = self.flag("flag_invalid_amount")?;
        let api_error = self.flag("flag_api_call_error")?;

        let max = parse_decimal(
            &self
                .read_required(session_id, DataType::ACTIVE_SWAP_MAX_AMOUNT)
                .await?,
        )?;
        let amount = match parse_decimal(input) {
            Ok(a) if a <= max => truncate(a, DISPLAY_PLACES),
            _ => return Ok(HandlerResult::with_content(input.trim()).set(invalid_amount)),
        };
        if amount <= Decimal::ZERO {
            return Ok(HandlerResult::with_content(input.trim()).set(invalid_amount));
        }
        let amount = amount.to_string();

        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let from = self
            .read_required(session_id, DataType::ACTIVE_SWAP_FROM_ADDRESS)
            .await?;
        let from_symbol = self
            .read_required(session_id, DataType::ACTIVE_SWAP_FROM_SYM)
            .await?;
        let from_decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::ACTIVE_SWAP_FROM_DECIMAL)
                .await?,
        )?;
        let to = self
            .read_required(session_id, DataType::ACTIVE_SWAP_TO_ADDRESS)
            .await?;
        let to_symbol = self
            .read_required(session_id, DataType::ACTIVE_SWAP_TO_SYM)
            .await?;
        let to_decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::ACTIVE_SWAP_TO_DECIMAL)
                .await?,
        )?;
        let pool = self.active_pool(session_id).await?;

        self.write(session_id, DataType::ACTIVE_SWAP_AMOUNT, &amount)
            .await?;
        let mut res = HandlerResult::new();
        res.reset_flag(invalid_amount);
        let quote = match self
            .service
            .get_pool_swap_quote(
                &scale_up(&amount, from_decimals)?,
                &public_key,
                &from,
                &pool,
                &to,
            )
            .await
        {
            Ok(q) => q,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "get_pool_swap_quote", &e);
                return Ok(res);
            }
        };
        let out = match scale_down_display(&quote.out_value, to_decimals) {
            Ok(o) => o,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "get_pool_swap_quote", &malformed(e));
                return Ok(res);
            }
        };
        self.write(session_id, DataType::SWAP_QUOTE, &quote.out_value)
            .await?;
        res.content = Text::SwapPreview.render(
            req.language(),
            &[
                ("amount", amount.as_str()),
                ("from", from_symbol.as_str()),
                ("out", out.as_str()),
                ("to", to_symbol.as_str()),
            ],
        );
        res.reset_flag(api_error);
        Ok(res)
    }

    pub async fn initiate_swap(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let authorized = self.flag("flag_account_authorized")?;
        let api_error = self.flag("flag_api_call_error")?;

        if !req.is_set(authorized) {
            return Ok(HandlerResult::new());
        }
        let amount = self
            .read_required(session_id, DataType::ACTIVE_SWAP_AMOUNT)
            .await?;
        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let from = self
            .read_required(session_id, DataType::ACTIVE_SWAP_FROM_ADDRESS)
            .await?;
        let from_decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::ACTIVE_SWAP_FROM_DECIMAL)
                .await?,
        )?;
        let to = self
            .read_required(session_id, DataType::ACTIVE_SWAP_TO_ADDRESS)
            .await?;
        let to_symbol = self
            .read_required(session_id, DataType::ACTIVE_SWAP_TO_SYM)
            .await?;
        let to_decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::ACTIVE_SWAP_TO_DECIMAL)
                .await?,
        )?;
        let quote = self.read_required(session_id, DataType::SWAP_QUOTE).await?;
        let pool = self.active_pool(session_id).await?;

        let mut res = HandlerResult::new();
        res.reset_flag(authorized);
        match self
            .service
            .pool_swap(
                &scale_up(&amount, from_decimals)?,
                &public_key,
                &from,
                &pool,
                &to,
            )
            .await
        {
            Ok(swap) => {
                info!(session_id, tracking_id = %swap.tracking_id, "swap initiated");
                let out = scale_down_display(&quote, to_decimals)?;
                res.content = Text::SwapSent.render(
                    req.language(),
                    &[("amount", out.as_str()), ("symbol", to_symbol.as_str())],
                );
                res.reset_flag(api_error);
            }
            Err(e) => self.service_failed(req, &mut res, api_error, "pool_swap", &e),
        }
        Ok(res)
    }
}
