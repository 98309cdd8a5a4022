use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{malformed, MenuHandlers};
use crate::decimal::{
    parse_decimal, parse_decimals, scale_down, scale_down_display, scale_up, truncate,
    DISPLAY_PLACES,
};
use crate::error::{Result, ServiceError};
use crate::l10n::Text;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::DataType;
use crate::validate::{
    checksum_address, classify_recipient, format_phone_number, normalize_whitespace,
    RecipientKind,
};

pub(crate) const TX_NORMAL: &str = "normal";
pub(crate) const TX_SWAP: &str = "swap";

/// Outcome of resolving a recipient entry.
enum Resolved {
    Address { address: String, swap: bool },
    Unregistered,
    Invalid,
    Failed(ServiceError),
}

impl MenuHandlers {
    async fn transaction_type(&self, session_id: &str) -> Result<String> {
        Ok(self
            .read_optional(session_id, DataType::SEND_TRANSACTION_TYPE)
            .await?
            .unwrap_or_else(|| TX_NORMAL.to_string()))
    }

    /// The pool used for swaps, recording the default pool if none is set.
    pub(crate) async fn active_pool(&self, session_id: &str) -> Result<String> {
        if let Some(pool) = self
            .read_optional(session_id, DataType::ACTIVE_POOL_ADDRESS)
            .await?
        {
            return Ok(pool);
        }
        self.write(
            session_id,
            DataType::ACTIVE_POOL_ADDRESS,
            &self.config.default_pool_address,
        )
        .await?;
        self.write(
            session_id,
            DataType::ACTIVE_POOL_SYM,
            &self.config.default_pool_symbol,
        )
        .await?;
        self.write(
            session_id,
            DataType::ACTIVE_POOL_NAME,
            &self.config.default_pool_name,
        )
        .await?;
        Ok(self.config.default_pool_address.clone())
    }

    /// Resolve a registered phone number. Sending to a member whose active
    /// voucher differs from ours is a swap.
    async fn resolve_phone(&self, session_id: &str, phone: &str) -> Result<Resolved> {
        let member = format_phone_number(phone)?;
        let Some(public_key) = self.read_optional(&member, DataType::PUBLIC_KEY).await? else {
            return Ok(Resolved::Unregistered);
        };

        let theirs = self
            .read_optional(&member, DataType::ACTIVE_ADDRESS)
            .await?;
        let ours = self
            .read_optional(session_id, DataType::ACTIVE_ADDRESS)
            .await?;
        let swap = match (&theirs, &ours) {
            (Some(t), Some(o)) => !t.eq_ignore_ascii_case(o),
            _ => false,
        };
        if swap {
            let symbol = self
                .read_optional(&member, DataType::ACTIVE_SYM)
                .await?
                .unwrap_or_default();
            let decimal = self
                .read_optional(&member, DataType::ACTIVE_DECIMAL)
                .await?
                .unwrap_or_default();
            self.write(session_id, DataType::RECIPIENT_ACTIVE_TOKEN, &symbol)
                .await?;
            self.write(
                session_id,
                DataType::RECIPIENT_ACTIVE_ADDRESS,
                theirs.as_deref().unwrap_or_default(),
            )
            .await?;
            self.write(session_id, DataType::RECIPIENT_ACTIVE_DECIMAL, &decimal)
                .await?;
            self.active_pool(session_id).await?;
        }
        Ok(Resolved::Address {
            address: public_key,
            swap,
        })
    }

    /// Resolve an alias: dotted aliases as given, bare ones under each
    /// search domain until one resolves.
    async fn resolve_alias(&self, alias: &str) -> Result<Resolved> {
        let candidates: Vec<String> = if alias.contains('.') {
            vec![alias.to_string()]
        } else {
            self.config
                .search_domains
                .iter()
                .map(|d| format!("{alias}.{d}"))
                .collect()
        };
        let mut last_error = None;
        for candidate in &candidates {
            match self.service.check_alias_address(candidate).await {
                Ok(found) => {
                    return Ok(Resolved::Address {
                        address: checksum_address(&found.address)?,
                        swap: false,
                    })
                }
                Err(e) => {
                    debug!(alias = %candidate, error = %e, "alias lookup missed");
                    last_error = Some(e);
                }
            }
        }
        Ok(match last_error {
            Some(ServiceError::Api { .. }) | None => Resolved::Invalid,
            Some(e) => Resolved::Failed(e),
        })
    }

    /// Resolve a phone number, address or alias to a recipient address and
    /// decide the transaction type.
    pub async fn validate_recipient(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let invalid = self.flag("flag_invalid_recipient")?;
        let invite = self.flag("flag_invalid_recipient_with_invite")?;
        let api_error = self.flag("flag_api_call_error")?;
        let swap_transaction = self.flag("flag_swap_transaction")?;

        let recipient = normalize_whitespace(input);
        let Some(kind) = classify_recipient(&recipient) else {
            return Ok(HandlerResult::with_content(input).set(invalid).reset(invite));
        };
        self.write(session_id, DataType::TEMPORARY_VALUE, &recipient)
            .await?;

        let resolved = match kind {
            RecipientKind::Phone => self.resolve_phone(session_id, &recipient).await?,
            RecipientKind::Address => Resolved::Address {
                address: checksum_address(&recipient)?,
                swap: false,
            },
            RecipientKind::Alias => self.resolve_alias(&recipient).await?,
        };

        let mut res = HandlerResult::with_content(recipient.as_str());
        match resolved {
            Resolved::Address { address, swap } => {
                let tx_type = if swap { TX_SWAP } else { TX_NORMAL };
                self.write(session_id, DataType::RECIPIENT, &address).await?;
                self.write(session_id, DataType::SEND_TRANSACTION_TYPE, tx_type)
                    .await?;
                debug!(session_id, %address, tx_type, "recipient resolved");
                res.reset_flag(invalid);
                res.reset_flag(invite);
                res.reset_flag(api_error);
                if swap {
                    res.set_flag(swap_transaction);
                } else {
                    res.reset_flag(swap_transaction);
                }
            }
            Resolved::Unregistered => {
                res.set_flag(invite);
                res.reset_flag(invalid);
            }
            Resolved::Invalid => {
                res.set_flag(invalid);
                res.reset_flag(invite);
            }
            Resolved::Failed(e) => {
                self.service_failed(req, &mut res, api_error, "check_alias_address", &e);
            }
        }
        Ok(res)
    }

    /// Invite the unregistered number entered as recipient.
    pub async fn invite_valid_recipient(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let api_error = self.flag("flag_api_call_error")?;

        let recipient = self
            .read_required(session_id, DataType::TEMPORARY_VALUE)
            .await?;
        let mut res = HandlerResult::new();
        match self.service.send_upsell_sms(session_id, &recipient).await {
            Ok(()) => {
                res.content = Text::InviteSent
                    .render(req.language(), &[("recipient", recipient.as_str())]);
                res.reset_flag(api_error);
            }
            Err(e) => self.service_failed(req, &mut res, api_error, "send_upsell_sms", &e),
        }
        Ok(res)
    }

    /// Largest amount the pending transfer may carry.
    ///
    /// For swap transfers this is also bounded by the pool's swap limit.
    pub async fn max_amount(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let api_error = self.flag("flag_api_call_error")?;

        let balance = self.read_required(session_id, DataType::ACTIVE_BAL).await?;
        if self.transaction_type(session_id).await? != TX_SWAP {
            return Ok(HandlerResult::with_content(balance).reset(api_error));
        }

        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let from = self
            .read_required(session_id, DataType::ACTIVE_ADDRESS)
            .await?;
        let decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::ACTIVE_DECIMAL)
                .await?,
        )?;
        let to = self
            .read_required(session_id, DataType::RECIPIENT_ACTIVE_ADDRESS)
            .await?;
        let pool = self.active_pool(session_id).await?;

        let mut res = HandlerResult::new();
        let limit = match self
            .service
            .get_swap_from_token_max_limit(&pool, &from, &to, &public_key)
            .await
            .and_then(|l| scale_down(&l.max, decimals).map_err(malformed))
        {
            Ok(l) => l,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "get_swap_from_token_max_limit", &e);
                return Ok(res);
            }
        };
        let max = truncate(
            limit.min(parse_decimal(&balance)?),
            DISPLAY_PLACES,
        )
        .to_string();
        self.write(session_id, DataType::ACTIVE_SWAP_MAX_AMOUNT, &max)
            .await?;
        res.content = max;
        res.reset_flag(api_error);
        Ok(res)
    }

    /// Accept an amount within the active balance (or swap limit). The
    /// limit applies to the amount as entered; only accepted amounts are
    /// truncated to two decimals.
    pub async fn validate_amount(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let invalid_amount = self.flag("flag_invalid_amount")?;

        let limit = match self.transaction_type(session_id).await?.as_str() {
            TX_SWAP => match self
                .read_optional(session_id, DataType::ACTIVE_SWAP_MAX_AMOUNT)
                .await?
            {
                Some(max) => max,
                None => self.read_required(session_id, DataType::ACTIVE_BAL).await?,
            },
            _ => self.read_required(session_id, DataType::ACTIVE_BAL).await?,
        };
        let limit = parse_decimal(&limit)?;

        let rejected = || -> Result<HandlerResult> {
            Ok(HandlerResult::with_content(input.trim()).set(invalid_amount))
        };
        let Ok(amount) = parse_decimal(input) else {
            return rejected();
        };
        if amount > limit {
            return rejected();
        }
        let amount = truncate(amount, DISPLAY_PLACES);
        if amount <= Decimal::ZERO {
            return rejected();
        }

        let amount = amount.to_string();
        self.write(session_id, DataType::AMOUNT, &amount).await?;
        Ok(HandlerResult::with_content(amount).reset(invalid_amount))
    }

    /// The recipient as the user entered it.
    pub async fn get_recipient(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let recipient = self
            .read_required(session_id, DataType::TEMPORARY_VALUE)
            .await?;
        Ok(HandlerResult::with_content(recipient))
    }

    pub async fn get_sender(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        Ok(HandlerResult::with_content(req.session_id()?))
    }

    pub async fn get_amount(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let amount = self.read_required(session_id, DataType::AMOUNT).await?;
        let symbol = self
            .read_optional(session_id, DataType::ACTIVE_SYM)
            .await?
            .unwrap_or_default();
        Ok(HandlerResult::with_content(format!("{amount} {symbol}")))
    }

    /// Quote what the recipient of a swap transfer will receive.
    pub async fn transaction_swap_preview(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let api_error = self.flag("flag_api_call_error")?;

        let amount = self.read_required(session_id, DataType::AMOUNT).await?;
        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let from = self
            .read_required(session_id, DataType::ACTIVE_ADDRESS)
            .await?;
        let from_symbol = self.read_required(session_id, DataType::ACTIVE_SYM).await?;
        let from_decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::ACTIVE_DECIMAL)
                .await?,
        )?;
        let to = self
            .read_required(session_id, DataType::RECIPIENT_ACTIVE_ADDRESS)
            .await?;
        let to_symbol = self
            .read_required(session_id, DataType::RECIPIENT_ACTIVE_TOKEN)
            .await?;
        let to_decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::RECIPIENT_ACTIVE_DECIMAL)
                .await?,
        )?;
        let recipient = self
            .read_required(session_id, DataType::TEMPORARY_VALUE)
            .await?;
        let pool = self.active_pool(session_id).await?;

        let mut res = HandlerResult::new();
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
        res.content = Text::TransferSwapPreview.render(
            req.language(),
            &[
                ("recipient", recipient.as_str()),
                ("out", out.as_str()),
                ("to", to_symbol.as_str()),
                ("amount", amount.as_str()),
                ("from", from_symbol.as_str()),
            ],
        );
        res.reset_flag(api_error);
        Ok(res)
    }

    /// Send the pending transfer. Swap transfers first swap into the
    /// recipient's voucher, then transfer the quoted amount.
    pub async fn initiate_transaction(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let authorized = self.flag("flag_account_authorized")?;
        let api_error = self.flag("flag_api_call_error")?;

        if !req.is_set(authorized) {
            return Ok(HandlerResult::new());
        }
        let recipient_hint = self
            .read_required(session_id, DataType::TEMPORARY_VALUE)
            .await?;
        let recipient = self.read_required(session_id, DataType::RECIPIENT).await?;
        let amount = self.read_required(session_id, DataType::AMOUNT).await?;
        let symbol = self.read_required(session_id, DataType::ACTIVE_SYM).await?;
        let decimals = parse_decimals(
            &self
                .read_required(session_id, DataType::ACTIVE_DECIMAL)
                .await?,
        )?;
        let token = self
            .read_required(session_id, DataType::ACTIVE_ADDRESS)
            .await?;
        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let raw_amount = scale_up(&amount, decimals)?;

        let mut res = HandlerResult::new();
        res.reset_flag(authorized);

        let sent = if self.transaction_type(session_id).await? == TX_SWAP {
            let to = self
                .read_required(session_id, DataType::RECIPIENT_ACTIVE_ADDRESS)
                .await?;
            let quote = self.read_required(session_id, DataType::SWAP_QUOTE).await?;
            let pool = self.active_pool(session_id).await?;
            match self
                .service
                .pool_swap(&raw_amount, &public_key, &token, &pool, &to)
                .await
            {
                Ok(swap) => {
                    info!(session_id, tracking_id = %swap.tracking_id, "transfer swap initiated");
                    self.service
                        .token_transfer(&quote, &public_key, &recipient, &to)
                        .await
                        .map_err(|e| ("token_transfer", e))
                }
                Err(e) => Err(("pool_swap", e)),
            }
        } else {
            self.service
                .token_transfer(&raw_amount, &public_key, &recipient, &token)
                .await
                .map_err(|e| ("token_transfer", e))
        };

        match sent {
            Ok(transfer) => {
                info!(session_id, tracking_id = %transfer.tracking_id, "transfer initiated");
                res.content = Text::TransferSent.render(
                    req.language(),
                    &[
                        ("recipient", recipient_hint.as_str()),
                        ("amount", amount.as_str()),
                        ("symbol", symbol.as_str()),
                        ("sender", session_id),
                    ],
                );
                res.reset_flag(api_error);
            }
            Err((call, e)) => self.service_failed(req, &mut res, api_error, call, &e),
        }
        Ok(res)
    }

    /// Forget the pending transfer.
    pub async fn transaction_reset(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let invalid = self.flag("flag_invalid_recipient")?;
        let invite = self.flag("flag_invalid_recipient_with_invite")?;
        let swap_transaction = self.flag("flag_swap_transaction")?;

        for dt in [
            DataType::TEMPORARY_VALUE,
            DataType::RECIPIENT,
            DataType::AMOUNT,
            DataType::SEND_TRANSACTION_TYPE,
        ] {
            self.clear(session_id, dt).await?;
        }
        Ok(HandlerResult::new()
            .reset(invalid)
            .reset(invite)
            .reset(swap_transaction))
    }

    pub async fn reset_transaction_amount(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let invalid_amount = self.flag("flag_invalid_amount")?;
        self.clear(session_id, DataType::AMOUNT).await?;
        Ok(HandlerResult::new().reset(invalid_amount))
    }
}
