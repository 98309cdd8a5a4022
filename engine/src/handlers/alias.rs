use tracing::info;

use super::MenuHandlers;
use crate::error::Result;
use crate::l10n::Text;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::DataType;

impl MenuHandlers {
    /// Ask the naming service for an alias based on the typed hint.
    ///
    /// Accounts without an alias register a new one, others update theirs.
    /// The returned alias is only a suggestion until confirmed.
    pub async fn request_custom_alias(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let api_error = self.flag("flag_api_call_error")?;

        let hint = input.trim();
        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let existing = self
            .read_optional(session_id, DataType::ACCOUNT_ALIAS)
            .await?;
        let result = match existing {
            Some(_) => self.service.update_alias(hint, &public_key).await,
            None => self.service.request_alias(&public_key, hint).await,
        };

        let mut res = HandlerResult::new();
        match result {
            Ok(r) => {
                self.write(session_id, DataType::SUGGESTED_ALIAS, &r.alias)
                    .await?;
                res.content = r.alias;
                res.reset_flag(api_error);
            }
            Err(e) => self.service_failed(req, &mut res, api_error, "request_alias", &e),
        }
        Ok(res)
    }

    pub async fn get_suggested_alias(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let alias = self
            .read_optional(session_id, DataType::SUGGESTED_ALIAS)
            .await?
            .unwrap_or_default();
        Ok(HandlerResult::with_content(alias))
    }

    /// Promote the suggested alias to the account alias.
    pub async fn confirm_new_alias(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let alias_set = self.flag("flag_alias_set")?;

        let alias = self
            .read_required(session_id, DataType::SUGGESTED_ALIAS)
            .await?;
        self.write(session_id, DataType::ACCOUNT_ALIAS, &alias).await?;
        self.clear(session_id, DataType::SUGGESTED_ALIAS).await?;
        info!(session_id, %alias, "alias confirmed");
        let content = Text::AliasRequested.render(req.language(), &[("alias", alias.as_str())]);
        Ok(HandlerResult::with_content(content).set(alias_set))
    }

    pub async fn get_current_alias(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let alias = self
            .read_optional(session_id, DataType::ACCOUNT_ALIAS)
            .await?
            .unwrap_or_else(|| Text::NoAlias.get(req.language()).to_string());
        Ok(HandlerResult::with_content(alias))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{handlers, request, SESSION};

    #[tokio::test]
    async fn test_first_alias_is_requested_then_confirmed() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, "0xme").await.unwrap();
        fake.set_alias_result("amina.sarafu.eth");

        assert_eq!(
            h.get_current_alias(&request(), "").await.unwrap().content,
            "No alias set"
        );
        let res = h.request_custom_alias(&request(), "amina").await.unwrap();
        assert_eq!(res.content, "amina.sarafu.eth");
        assert_eq!(fake.calls_to("request_alias")[0].args, vec!["0xme", "amina"]);

        let res = h.confirm_new_alias(&request(), "").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_alias_set").unwrap()));
        assert_eq!(
            h.get_current_alias(&request(), "").await.unwrap().content,
            "amina.sarafu.eth"
        );
        assert!(h.get_suggested_alias(&request(), "").await.unwrap().content.is_empty());
    }

    #[tokio::test]
    async fn test_existing_alias_is_updated() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, "0xme").await.unwrap();
        h.write(SESSION, DataType::ACCOUNT_ALIAS, "old.sarafu.eth").await.unwrap();
        fake.set_alias_result("new.sarafu.eth");

        h.request_custom_alias(&request(), "new").await.unwrap();
        assert_eq!(fake.calls_to("update_alias")[0].args, vec!["new", "0xme"]);
        assert!(fake.calls_to("request_alias").is_empty());
    }

    #[tokio::test]
    async fn test_alias_service_failure() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, "0xme").await.unwrap();
        let res = h.request_custom_alias(&request(), "amina").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_api_call_error").unwrap()));
        assert_eq!(
            h.read_optional(SESSION, DataType::SUGGESTED_ALIAS).await.unwrap(),
            None
        );
    }
}
