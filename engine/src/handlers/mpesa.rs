use rust_decimal::Decimal;
use tracing::info;

use super::{malformed, MenuHandlers};
use crate::decimal::{
    parse_decimal, parse_decimals, scale_down, scale_down_display, to_scaled_u128, truncate,
    DISPLAY_PLACES,
};
use crate::error::{EngineError, Result};
use crate::l10n::Text;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::DataType;

/// The voucher being cashed out.
struct Source {
    symbol: String,
    address: String,
    decimals: u32,
    balance: Decimal,
}

impl MenuHandlers {
    async fn mpesa_source(&self, session_id: &str) -> Result<Option<Source>> {
        let Some(symbol) = self.read_optional(session_id, DataType::ACTIVE_SYM).await? else {
            return Ok(None);
        };
        Ok(Some(Source {
            symbol,
            address: self
                .read_required(session_id, DataType::ACTIVE_ADDRESS)
                .await?,
            decimals: parse_decimals(
                &self
                    .read_required(session_id, DataType::ACTIVE_DECIMAL)
                    .await?,
            )?,
            balance: parse_decimal(&self.read_required(session_id, DataType::ACTIVE_BAL).await?)?,
        }))
    }

    fn is_mpesa_asset(&self, address: &str) -> bool {
        address.eq_ignore_ascii_case(&self.config.mpesa_asset_address)
    }

    /// Minor units of the mpesa asset paying out `kes`.
    fn mpesa_out_amount(&self, kes: Decimal) -> Result<String> {
        let tokens = kes
            .checked_div(self.config.mpesa_rate)
            .ok_or_else(|| EngineError::Decimal(format!("kes {kes} at rate {}", self.config.mpesa_rate)))?;
        Ok(to_scaled_u128(tokens, self.config.mpesa_asset_decimals)?.to_string())
    }

    /// Largest KES amount the active voucher can be cashed out for.
    pub async fn get_mpesa_max_limit(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let no_active = self.flag("flag_no_active_voucher")?;
        let incorrect_voucher = self.flag("flag_incorrect_voucher")?;
        let low_swap = self.flag("flag_low_swap_amount")?;
        let api_error = self.flag("flag_api_call_error")?;

        let Some(source) = self.mpesa_source(session_id).await? else {
            return Ok(HandlerResult::new().set(no_active));
        };
        let mut res = HandlerResult::new();
        res.reset_flag(no_active);

        let max = if self.is_mpesa_asset(&source.address) {
            source.balance
        } else {
            let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
            let pool = self.active_pool(session_id).await?;
            match self.service.check_token_in_pool(&pool, &source.address).await {
                Ok(r) if r.can_swap_from => {}
                Ok(_) => {
                    return Ok(HandlerResult::with_content(source.symbol)
                        .set(incorrect_voucher)
                        .reset(no_active));
                }
                Err(e) => {
                    self.service_failed(req, &mut res, api_error, "check_token_in_pool", &e);
                    return Ok(res);
                }
            }
            let limit = match self
                .service
                .get_swap_from_token_max_limit(
                    &pool,
                    &source.address,
                    &self.config.mpesa_asset_address,
                    &public_key,
                )
                .await
                .and_then(|l| scale_down(&l.max, source.decimals).map_err(malformed))
            {
                Ok(l) => l,
                Err(e) => {
                    self.service_failed(req, &mut res, api_error, "get_swap_from_token_max_limit", &e);
                    return Ok(res);
                }
            };
            limit.min(source.balance)
        };
        res.reset_flag(incorrect_voucher);
        res.reset_flag(api_error);

        let kes = truncate(max * self.config.mpesa_rate, DISPLAY_PLACES).to_string();
        res.content = kes.clone();
        if max < self.config.min_swap_amount {
            res.set_flag(low_swap);
            return Ok(res);
        }
        res.reset_flag(low_swap);
        self.write(session_id, DataType::ACTIVE_SWAP_MAX_AMOUNT, &kes)
            .await?;
        Ok(res)
    }

    /// Validate the KES amount and show what it costs in the active voucher.
    pub async fn get_mpesa_preview(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let invalid_amount = self.flag("flag_invalid_amount")?;
        let api_error = self.flag("flag_api_call_error")?;

        let max = parse_decimal(
            &self
                .read_required(session_id, DataType::ACTIVE_SWAP_MAX_AMOUNT)
                .await?,
        )?;
        let kes = match parse_decimal(input) {
            Ok(k) if k <= max => truncate(k, DISPLAY_PLACES),
            _ => return Ok(HandlerResult::with_content(input.trim()).set(invalid_amount)),
        };
        if kes <= Decimal::ZERO {
            return Ok(HandlerResult::with_content(input.trim()).set(invalid_amount));
        }
        let Some(source) = self.mpesa_source(session_id).await? else {
            return Err(EngineError::Data(format!(
                "{} missing for {session_id}",
                DataType::ACTIVE_SYM
            )));
        };
        let kes = kes.to_string();
        self.write(session_id, DataType::MPESA_KES_AMOUNT, &kes).await?;
        let out = self.mpesa_out_amount(parse_decimal(&kes)?)?;

        let mut res = HandlerResult::new();
        res.reset_flag(invalid_amount);
        let amount = if self.is_mpesa_asset(&source.address) {
            scale_down_display(&out, self.config.mpesa_asset_decimals)?
        } else {
            let pool = self.active_pool(session_id).await?;
            match self
                .service
                .get_credit_send_reverse_quote(
                    &pool,
                    &source.address,
                    &self.config.mpesa_asset_address,
                    &out,
                )
                .await
                .and_then(|q| scale_down_display(&q.input_amount, source.decimals).map_err(malformed))
            {
                Ok(amount) => amount,
                Err(e) => {
                    self.service_failed(req, &mut res, api_error, "get_credit_send_reverse_quote", &e);
                    return Ok(res);
                }
            }
        };
        self.write(session_id, DataType::ACTIVE_SWAP_AMOUNT, &amount)
            .await?;
        res.content = Text::MpesaPreview.render(
            req.language(),
            &[
                ("amount", amount.as_str()),
                ("symbol", source.symbol.as_str()),
                ("kes", kes.as_str()),
            ],
        );
        res.reset_flag(api_error);
        Ok(res)
    }

    /// Swap into the mpesa asset if needed, then send it to the settlement
    /// address.
    pub async fn initiate_get_mpesa(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let authorized = self.flag("flag_account_authorized")?;
        let api_error = self.flag("flag_api_call_error")?;

        if !req.is_set(authorized) {
            return Ok(HandlerResult::new());
        }
        let kes = self
            .read_required(session_id, DataType::MPESA_KES_AMOUNT)
            .await?;
        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let Some(source) = self.mpesa_source(session_id).await? else {
            return Err(EngineError::Data(format!(
                "{} missing for {session_id}",
                DataType::ACTIVE_SYM
            )));
        };
        let out = self.mpesa_out_amount(parse_decimal(&kes)?)?;
        let asset = &self.config.mpesa_asset_address;

        let mut res = HandlerResult::new();
        res.reset_flag(authorized);
        if !self.is_mpesa_asset(&source.address) {
            let pool = self.active_pool(session_id).await?;
            let swap = async {
                let quote = self
                    .service
                    .get_credit_send_reverse_quote(&pool, &source.address, asset, &out)
                    .await?;
                self.service
                    .pool_swap(&quote.input_amount, &public_key, &source.address, &pool, asset)
                    .await
            };
            match swap.await {
                Ok(s) => info!(session_id, tracking_id = %s.tracking_id, "mpesa swap initiated"),
                Err(e) => {
                    self.service_failed(req, &mut res, api_error, "pool_swap", &e);
                    return Ok(res);
                }
            }
        }
        match self
            .service
            .token_transfer(&out, &public_key, &self.config.default_mpesa_address, asset)
            .await
        {
            Ok(t) => {
                info!(session_id, tracking_id = %t.tracking_id, %kes, "mpesa transfer initiated");
                res.content =
                    Text::MpesaSent.render(req.language(), &[("kes", kes.as_str())]);
                res.reset_flag(api_error);
            }
            Err(e) => self.service_failed(req, &mut res, api_error, "token_transfer", &e),
        }
        Ok(res)
    }
}
