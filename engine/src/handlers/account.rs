use tracing::{info, warn};

use super::MenuHandlers;
use crate::error::Result;
use crate::flags::FLAG_LANG;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::services::types::AccountResult;
use crate::store::DataType;
use crate::validate::{checksum_address, normalize_hex};

/// Language codes offered by the language menu, by selector.
const LANGUAGES: [(&str, &str); 2] = [("1", "eng"), ("2", "swa")];

impl MenuHandlers {
    /// Persist the chosen language and switch rendering to it.
    ///
    /// The first choice ever made is also kept as the initial language.
    pub async fn set_language(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let language_set = self.flag("flag_language_set")?;

        let code = LANGUAGES
            .iter()
            .find(|(sel, code)| *sel == input.trim() || *code == input.trim())
            .map(|(_, code)| *code)
            .unwrap_or(self.config.default_language.as_str());

        self.write(session_id, DataType::SELECTED_LANGUAGE_CODE, code)
            .await?;
        if self
            .read_optional(session_id, DataType::INITIAL_LANGUAGE_CODE)
            .await?
            .is_none()
        {
            self.write(session_id, DataType::INITIAL_LANGUAGE_CODE, code)
                .await?;
        }
        Ok(HandlerResult::with_content(code)
            .set(FLAG_LANG)
            .set(language_set))
    }

    /// Create a custodial account for the session, once.
    pub async fn create_account(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let created = self.flag("flag_account_created")?;
        let creation_failed = self.flag("flag_account_creation_failed")?;
        let api_error = self.flag("flag_api_call_error")?;

        let mut res = HandlerResult::new();
        if req.is_set(created)
            || self
                .read_optional(session_id, DataType::PUBLIC_KEY)
                .await?
                .is_some()
        {
            res.set_flag(created);
            return Ok(res);
        }

        let account = match self.service.create_account().await {
            Ok(a) => a,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "create_account", &e);
                res.set_flag(creation_failed);
                return Ok(res);
            }
        };

        let address = normalize_hex(&account.public_key);
        if let Err(e) = self.save_account(session_id, &address, &account).await {
            self.discard_account(session_id, &address).await;
            return Err(e);
        }
        info!(
            session_id,
            tracking_id = %account.tracking_id,
            "account created"
        );

        res.set_flag(created);
        res.reset_flag(creation_failed);
        res.reset_flag(api_error);
        Ok(res)
    }

    /// PUBLIC_KEY goes last: its presence is what marks the account created.
    async fn save_account(
        &self,
        session_id: &str,
        address: &str,
        account: &AccountResult,
    ) -> Result<()> {
        self.write(session_id, DataType::TRACKING_ID, &account.tracking_id)
            .await?;
        self.store.write_reverse(address, session_id).await?;
        self.write(session_id, DataType::PUBLIC_KEY, &account.public_key)
            .await
    }

    async fn discard_account(&self, session_id: &str, address: &str) {
        let removed = [
            self.store.delete(session_id, DataType::PUBLIC_KEY).await,
            self.store.delete_reverse(address).await,
            self.store.delete(session_id, DataType::TRACKING_ID).await,
        ];
        for e in removed.into_iter().filter_map(|r| r.err()) {
            warn!(session_id, error = %e, "failed to discard partial account");
        }
    }

    /// Raise `flag_account_created` if the session already owns an account.
    pub async fn check_account_created(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let created = self.flag("flag_account_created")?;

        let exists = self
            .read_optional(session_id, DataType::PUBLIC_KEY)
            .await?
            .is_some();
        let res = HandlerResult::new();
        Ok(if exists { res.set(created) } else { res.reset(created) })
    }

    pub async fn check_account_status(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let pending = self.flag("flag_account_pending")?;
        let success = self.flag("flag_account_success")?;
        let api_error = self.flag("flag_api_call_error")?;

        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let mut res = HandlerResult::new();
        match self.service.track_account_status(&public_key).await {
            Ok(status) if status.active => {
                self.write(session_id, DataType::ACCOUNT_STATUS, "active")
                    .await?;
                res.set_flag(success);
                res.reset_flag(pending);
                res.reset_flag(api_error);
            }
            Ok(_) => {
                self.write(session_id, DataType::ACCOUNT_STATUS, "pending")
                    .await?;
                res.set_flag(pending);
                res.reset_flag(success);
                res.reset_flag(api_error);
            }
            Err(e) => self.service_failed(req, &mut res, api_error, "track_account_status", &e),
        }
        Ok(res)
    }

    /// The account address in checksum form.
    pub async fn check_identifier(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let Some(public_key) = self.read_optional(session_id, DataType::PUBLIC_KEY).await? else {
            return Ok(HandlerResult::new());
        };
        let content = match checksum_address(&public_key) {
            Ok(a) => a,
            Err(e) => {
                warn!(session_id, error = %e, "stored public key is not an address");
                public_key
            }
        };
        Ok(HandlerResult::with_content(content))
    }

    /// Text the account address to the session's phone.
    pub async fn send_address_sms(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let api_error = self.flag("flag_api_call_error")?;

        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let mut res = HandlerResult::new();
        match self.service.send_address_sms(&public_key, session_id).await {
            Ok(()) => res.reset_flag(api_error),
            Err(e) => self.service_failed(req, &mut res, api_error, "send_address_sms", &e),
        }
        Ok(res)
    }
}
