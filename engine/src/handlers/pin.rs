use tracing::{info, warn};

use super::MenuHandlers;
use crate::error::Result;
use crate::l10n::Text;
use crate::pin::{hash_pin, is_valid_pin, verify_pin};
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::DataType;

impl MenuHandlers {
    async fn pin_attempts(&self, session_id: &str) -> Result<u32> {
        Ok(self
            .read_optional(session_id, DataType::INCORRECT_PIN_ATTEMPTS)
            .await?
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0))
    }

    /// Stage a new PIN (hashed) until it is confirmed.
    pub async fn save_temporary_pin(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let invalid_pin = self.flag("flag_invalid_pin")?;

        if !is_valid_pin(input) {
            return Ok(HandlerResult::new().set(invalid_pin));
        }
        self.write(session_id, DataType::TEMPORARY_VALUE, &hash_pin(input)?)
            .await?;
        Ok(HandlerResult::new().reset(invalid_pin))
    }

    /// Confirm the staged PIN at account setup and make it the account PIN.
    pub async fn verify_create_pin(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let valid_pin = self.flag("flag_valid_pin")?;
        let pin_mismatch = self.flag("flag_pin_mismatch")?;
        let pin_set = self.flag("flag_pin_set")?;

        let staged = self
            .read_required(session_id, DataType::TEMPORARY_VALUE)
            .await?;
        if !verify_pin(input, &staged)? {
            return Ok(HandlerResult::new().set(pin_mismatch).reset(valid_pin));
        }
        self.write(session_id, DataType::ACCOUNT_PIN, &staged).await?;
        self.clear(session_id, DataType::TEMPORARY_VALUE).await?;
        Ok(HandlerResult::new()
            .set(valid_pin)
            .set(pin_set)
            .reset(pin_mismatch))
    }

    /// Confirm a changed PIN. Any pending self-service reset is consumed.
    pub async fn confirm_pin_change(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let pin_mismatch = self.flag("flag_pin_mismatch")?;
        let pin_reset = self.flag("flag_account_pin_reset")?;

        self.write(session_id, DataType::SELF_PIN_RESET, "0").await?;

        let staged = self
            .read_required(session_id, DataType::TEMPORARY_VALUE)
            .await?;
        if !verify_pin(input, &staged)? {
            return Ok(HandlerResult::new().set(pin_mismatch));
        }
        self.write(session_id, DataType::ACCOUNT_PIN, &staged).await?;
        self.clear(session_id, DataType::TEMPORARY_VALUE).await?;
        info!(session_id, "pin changed");
        Ok(HandlerResult::new().reset(pin_mismatch).reset(pin_reset))
    }

    pub async fn check_pin_mismatch(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let pin_mismatch = self.flag("flag_pin_mismatch")?;

        let staged = self
            .read_required(session_id, DataType::TEMPORARY_VALUE)
            .await?;
        let res = HandlerResult::new();
        Ok(if verify_pin(input, &staged)? {
            res.reset(pin_mismatch)
        } else {
            res.set(pin_mismatch)
        })
    }

    /// Check the entered PIN against the account PIN.
    ///
    /// Wrong PINs count up `INCORRECT_PIN_ATTEMPTS`; a correct PIN clears it.
    /// Once the count reaches the allowed attempts the account is blocked and
    /// the count is left as is.
    pub async fn authorize_account(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let incorrect_pin = self.flag("flag_incorrect_pin")?;
        let authorized = self.flag("flag_account_authorized")?;
        let allow_update = self.flag("flag_allow_update")?;
        let blocked = self.flag("flag_account_blocked")?;
        let invalid_pin = self.flag("flag_invalid_pin")?;

        let attempts = self.pin_attempts(session_id).await?;
        if attempts >= self.config.allowed_pin_attempts {
            return Ok(HandlerResult::new()
                .set(blocked)
                .reset(authorized)
                .reset(allow_update));
        }
        if !is_valid_pin(input) {
            return Ok(HandlerResult::new().set(invalid_pin).reset(authorized));
        }

        let stored = self.read_required(session_id, DataType::ACCOUNT_PIN).await?;
        if verify_pin(input, &stored)? {
            self.write(session_id, DataType::INCORRECT_PIN_ATTEMPTS, "0")
                .await?;
            return Ok(HandlerResult::new()
                .set(authorized)
                .set(allow_update)
                .reset(incorrect_pin)
                .reset(invalid_pin));
        }

        let attempts = attempts + 1;
        warn!(session_id, attempts, "incorrect pin");
        self.write(
            session_id,
            DataType::INCORRECT_PIN_ATTEMPTS,
            &attempts.to_string(),
        )
        .await?;
        Ok(HandlerResult::new()
            .set(incorrect_pin)
            .reset(authorized)
            .reset(allow_update)
            .reset(invalid_pin))
    }

    /// Show the attempts left after a wrong PIN, blocking at zero.
    pub async fn reset_incorrect_pin(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let incorrect_pin = self.flag("flag_incorrect_pin")?;
        let blocked = self.flag("flag_account_blocked")?;

        let attempts = self.pin_attempts(session_id).await?;
        let remaining = self.config.allowed_pin_attempts.saturating_sub(attempts);
        let mut res = HandlerResult::with_content(remaining.to_string());
        if remaining == 0 {
            info!(session_id, "account blocked");
            res.set_flag(blocked);
        }
        res.reset_flag(incorrect_pin);
        Ok(res)
    }

    /// Sync the blocked and pending-reset flags with stored data.
    ///
    /// Only a zero or missing attempt count clears `flag_account_blocked`;
    /// any other count leaves the flag as it is.
    pub async fn check_blocked_status(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let blocked = self.flag("flag_account_blocked")?;
        let pin_reset = self.flag("flag_account_pin_reset")?;

        let mut res = HandlerResult::new();

        match self
            .store
            .read_string(session_id, DataType::SELF_PIN_RESET)
            .await
        {
            Ok(v) if v == "1" => res.set_flag(pin_reset),
            Ok(_) => res.reset_flag(pin_reset),
            Err(e) if e.is_not_found() => res.reset_flag(pin_reset),
            Err(e) => {
                warn!(session_id, error = %e, "reading pin reset marker");
                return Ok(res);
            }
        }

        let attempts = match self
            .store
            .read_string(session_id, DataType::INCORRECT_PIN_ATTEMPTS)
            .await
        {
            Ok(v) => v.trim().parse::<u32>().unwrap_or(0),
            Err(e) if e.is_not_found() => 0,
            Err(e) => {
                warn!(session_id, error = %e, "reading pin attempts");
                return Ok(res);
            }
        };
        if attempts == 0 {
            res.reset_flag(blocked);
        }
        Ok(res)
    }

    pub async fn show_blocked_account(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        Ok(HandlerResult::with_content(
            Text::AccountBlocked.get(req.language()),
        ))
    }

    pub async fn reset_account_authorized(&self, _req: &Request, _input: &str) -> Result<HandlerResult> {
        Ok(HandlerResult::new().reset(self.flag("flag_account_authorized")?))
    }

    pub async fn reset_allow_update(&self, _req: &Request, _input: &str) -> Result<HandlerResult> {
        Ok(HandlerResult::new().reset(self.flag("flag_allow_update")?))
    }

    pub async fn reset_valid_pin(&self, _req: &Request, _input: &str) -> Result<HandlerResult> {
        Ok(HandlerResult::new().reset(self.flag("flag_valid_pin")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{handlers, request, SESSION};

    #[tokio::test]
    async fn test_authorize_counts_and_clears() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::ACCOUNT_PIN, &hash_pin("1234").unwrap())
            .await
            .unwrap();
        let incorrect = h.flag("flag_incorrect_pin").unwrap();
        let authorized = h.flag("flag_account_authorized").unwrap();

        let res = h.authorize_account(&request(), "1111").await.unwrap();
        assert!(res.leaves_set(incorrect));
        assert_eq!(h.pin_attempts(SESSION).await.unwrap(), 1);

        let res = h.authorize_account(&request(), "1234").await.unwrap();
        assert!(res.leaves_set(authorized));
        assert!(res.leaves_reset(incorrect));
        assert_eq!(h.pin_attempts(SESSION).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_format_does_not_count() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::ACCOUNT_PIN, &hash_pin("1234").unwrap())
            .await
            .unwrap();
        let invalid = h.flag("flag_invalid_pin").unwrap();
        let res = h.authorize_account(&request(), "12a4").await.unwrap();
        assert!(res.leaves_set(invalid));
        assert_eq!(h.pin_attempts(SESSION).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blocked_guard_keeps_counter() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::ACCOUNT_PIN, &hash_pin("1234").unwrap())
            .await
            .unwrap();
        h.write(SESSION, DataType::INCORRECT_PIN_ATTEMPTS, "3")
            .await
            .unwrap();
        let res = h.authorize_account(&request(), "1234").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_account_blocked").unwrap()));
        assert!(!res.leaves_set(h.flag("flag_account_authorized").unwrap()));
        assert_eq!(h.pin_attempts(SESSION).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_remaining_attempts() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::INCORRECT_PIN_ATTEMPTS, "1")
            .await
            .unwrap();
        let res = h.reset_incorrect_pin(&request(), "").await.unwrap();
        assert_eq!(res.content, "2");
        assert!(!res.leaves_set(h.flag("flag_account_blocked").unwrap()));

        h.write(SESSION, DataType::INCORRECT_PIN_ATTEMPTS, "3")
            .await
            .unwrap();
        let res = h.reset_incorrect_pin(&request(), "").await.unwrap();
        assert_eq!(res.content, "0");
        assert!(res.leaves_set(h.flag("flag_account_blocked").unwrap()));
        assert!(res.leaves_reset(h.flag("flag_incorrect_pin").unwrap()));
    }

    #[tokio::test]
    async fn test_staged_pin_is_hashed() {
        let (h, _) = handlers();
        let res = h.save_temporary_pin(&request(), "4321").await.unwrap();
        assert!(res.leaves_reset(h.flag("flag_invalid_pin").unwrap()));
        let staged = h
            .read_required(SESSION, DataType::TEMPORARY_VALUE)
            .await
            .unwrap();
        assert_ne!(staged, "4321");

        let res = h.verify_create_pin(&request(), "4321").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_pin_set").unwrap()));
        let stored = h.read_required(SESSION, DataType::ACCOUNT_PIN).await.unwrap();
        assert!(verify_pin("4321", &stored).unwrap());
    }

    #[tokio::test]
    async fn test_confirm_pin_change_consumes_reset_marker() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::SELF_PIN_RESET, "1").await.unwrap();
        h.write(SESSION, DataType::TEMPORARY_VALUE, &hash_pin("5555").unwrap())
            .await
            .unwrap();
        let res = h.confirm_pin_change(&request(), "5556").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_pin_mismatch").unwrap()));
        assert_eq!(
            h.read_required(SESSION, DataType::SELF_PIN_RESET).await.unwrap(),
            "0"
        );
    }

    #[tokio::test]
    async fn test_blocked_status_keeps_flag_while_attempts_remain() {
        let (h, _) = handlers();
        let blocked = h.flag("flag_account_blocked").unwrap();
        h.write(SESSION, DataType::INCORRECT_PIN_ATTEMPTS, "2")
            .await
            .unwrap();
        let res = h.check_blocked_status(&request(), "").await.unwrap();
        assert!(!res.leaves_reset(blocked));

        h.write(SESSION, DataType::INCORRECT_PIN_ATTEMPTS, "0")
            .await
            .unwrap();
        let res = h.check_blocked_status(&request(), "").await.unwrap();
        assert!(res.leaves_reset(blocked));
    }
}
