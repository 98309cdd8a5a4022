use tracing::info;

use super::MenuHandlers;
use crate::error::Result;
use crate::l10n::Text;
use crate::pin::{hash_pin, is_valid_pin};
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::DataType;
use crate::validate::{format_phone_number, is_valid_phone};

impl MenuHandlers {
    /// Raise `flag_admin_privilege` for configured admin numbers.
    pub async fn check_admin(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let admin = self.flag("flag_admin_privilege")?;

        let res = HandlerResult::new();
        Ok(if self.config.admin_numbers.iter().any(|n| n == session_id) {
            res.set(admin)
        } else {
            res.reset(admin)
        })
    }

    /// Stage the member whose PIN an admin is about to reset.
    pub async fn validate_blocked_number(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let unregistered = self.flag("flag_unregistered_number")?;

        let number = input.trim();
        if !is_valid_phone(number) {
            return Ok(HandlerResult::with_content(number).set(unregistered));
        }
        let formatted = format_phone_number(number)?;
        if self
            .read_optional(&formatted, DataType::PUBLIC_KEY)
            .await?
            .is_none()
        {
            return Ok(HandlerResult::with_content(number).set(unregistered));
        }
        self.write(session_id, DataType::BLOCKED_NUMBER, &formatted)
            .await?;
        Ok(HandlerResult::with_content(formatted).reset(unregistered))
    }

    pub async fn retrieve_blocked_number(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let number = self
            .read_optional(session_id, DataType::BLOCKED_NUMBER)
            .await?
            .unwrap_or_default();
        Ok(HandlerResult::with_content(number))
    }

    /// Give the staged member a temporary PIN and unblock them.
    ///
    /// The member is asked to change the PIN at their next session.
    pub async fn reset_others_pin(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let admin = self.flag("flag_admin_privilege")?;
        let invalid_pin = self.flag("flag_invalid_pin")?;
        let api_error = self.flag("flag_api_call_error")?;

        if !req.is_set(admin) {
            return Ok(HandlerResult::new());
        }
        if !is_valid_pin(input) {
            return Ok(HandlerResult::new().set(invalid_pin));
        }
        let blocked = self
            .read_required(session_id, DataType::BLOCKED_NUMBER)
            .await?;

        self.write(&blocked, DataType::ACCOUNT_PIN, &hash_pin(input)?)
            .await?;
        self.write(&blocked, DataType::INCORRECT_PIN_ATTEMPTS, "0")
            .await?;
        self.write(&blocked, DataType::SELF_PIN_RESET, "1").await?;
        info!(admin = session_id, member = %blocked, "pin reset by admin");

        let mut res = HandlerResult::with_content(
            Text::PinResetDone.render(req.language(), &[("number", blocked.as_str())]),
        );
        res.reset_flag(invalid_pin);
        if let Err(e) = self.service.send_pin_reset_sms(session_id, &blocked).await {
            self.service_failed(req, &mut res, api_error, "send_pin_reset_sms", &e);
        }
        Ok(res)
    }

    pub async fn reset_unregistered_number(&self, _req: &Request, _input: &str) -> Result<HandlerResult> {
        Ok(HandlerResult::new().reset(self.flag("flag_unregistered_number")?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{handlers, request, request_with, SESSION};
    use crate::pin::verify_pin;

    const MEMBER: &str = "+254711223344";

    #[tokio::test]
    async fn test_blocked_number_must_be_registered() {
        let (h, _) = handlers();
        let unregistered = h.flag("flag_unregistered_number").unwrap();

        let res = h.validate_blocked_number(&request(), "0711223344").await.unwrap();
        assert!(res.leaves_set(unregistered));

        h.write(MEMBER, DataType::PUBLIC_KEY, "0xabc").await.unwrap();
        let res = h.validate_blocked_number(&request(), "0711223344").await.unwrap();
        assert!(res.leaves_reset(unregistered));
        assert_eq!(res.content, MEMBER);
    }

    #[tokio::test]
    async fn test_reset_others_pin() {
        let (h, fake) = handlers();
        h.write(MEMBER, DataType::INCORRECT_PIN_ATTEMPTS, "3")
            .await
            .unwrap();
        h.write(SESSION, DataType::BLOCKED_NUMBER, MEMBER).await.unwrap();

        // Without the admin flag nothing happens.
        h.reset_others_pin(&request(), "9876").await.unwrap();
        assert!(fake.calls_to("send_pin_reset_sms").is_empty());

        let req = request_with(&h, &["flag_admin_privilege"]);
        let res = h.reset_others_pin(&req, "9876").await.unwrap();
        assert_eq!(res.content, "PIN reset for +254711223344 was successful");

        let pin = h.read_required(MEMBER, DataType::ACCOUNT_PIN).await.unwrap();
        assert!(verify_pin("9876", &pin).unwrap());
        assert_eq!(
            h.read_required(MEMBER, DataType::INCORRECT_PIN_ATTEMPTS)
                .await
                .unwrap(),
            "0"
        );
        assert_eq!(
            h.read_required(MEMBER, DataType::SELF_PIN_RESET).await.unwrap(),
            "1"
        );
        assert_eq!(
            fake.calls_to("send_pin_reset_sms")[0].args,
            vec![SESSION, MEMBER]
        );
    }
}
