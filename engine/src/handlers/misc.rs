use super::MenuHandlers;
use crate::error::Result;
use crate::l10n::Text;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::DataType;

impl MenuHandlers {
    /// Raise `flag_back_set` when the input is the back selector.
    pub async fn set_back(&self, _req: &Request, input: &str) -> Result<HandlerResult> {
        let back = self.flag("flag_back_set")?;
        Ok(if input.trim() == "0" {
            HandlerResult::new().set(back)
        } else {
            HandlerResult::new().reset(back)
        })
    }

    pub async fn clear_temporary_value(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        self.clear(req.session_id()?, DataType::TEMPORARY_VALUE)
            .await?;
        Ok(HandlerResult::new())
    }

    pub async fn reset_api_call_failure(&self, _req: &Request, _input: &str) -> Result<HandlerResult> {
        Ok(HandlerResult::new().reset(self.flag("flag_api_call_error")?))
    }

    pub async fn quit(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let authorized = self.flag("flag_account_authorized")?;
        Ok(HandlerResult::with_content(Text::Goodbye.get(req.language())).reset(authorized))
    }

    pub async fn quit_with_balance(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let authorized = self.flag("flag_account_authorized")?;

        let symbol = self.read_optional(session_id, DataType::ACTIVE_SYM).await?;
        let balance = self.read_optional(session_id, DataType::ACTIVE_BAL).await?;
        let content = match (symbol, balance) {
            (Some(symbol), Some(balance)) => Text::GoodbyeWithBalance.render(
                req.language(),
                &[("balance", balance.as_str()), ("symbol", symbol.as_str())],
            ),
            _ => Text::Goodbye.get(req.language()).to_string(),
        };
        Ok(HandlerResult::with_content(content).reset(authorized))
    }

    pub async fn quit_with_help(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let authorized = self.flag("flag_account_authorized")?;
        Ok(HandlerResult::with_content(Text::GoodbyeWithHelp.get(req.language())).reset(authorized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{handlers, request, SESSION};
    use crate::request::Request;
    use crate::state::FlagSet;

    #[tokio::test]
    async fn test_quit_with_balance() {
        let (h, _) = handlers();
        let res = h.quit_with_balance(&request(), "").await.unwrap();
        assert_eq!(res.content, "Thank you for using Sarafu. Goodbye!");

        h.write(SESSION, DataType::ACTIVE_SYM, "SRF").await.unwrap();
        h.write(SESSION, DataType::ACTIVE_BAL, "3.50").await.unwrap();
        let res = h.quit_with_balance(&request(), "").await.unwrap();
        assert_eq!(res.content, "Your account balance is 3.50 SRF");
        assert!(res.leaves_reset(h.flag("flag_account_authorized").unwrap()));
    }

    #[tokio::test]
    async fn test_quit_in_swahili() {
        let (h, _) = handlers();
        let req = Request::new(SESSION, "swa", FlagSet::new(128));
        let res = h.quit(&req, "").await.unwrap();
        assert_eq!(res.content, "Asante kwa kutumia huduma ya Sarafu. Kwaheri!");
    }

    #[tokio::test]
    async fn test_set_back() {
        let (h, _) = handlers();
        let back = h.flag("flag_back_set").unwrap();
        assert!(h.set_back(&request(), "0").await.unwrap().leaves_set(back));
        assert!(h.set_back(&request(), "1").await.unwrap().leaves_reset(back));
    }
}
