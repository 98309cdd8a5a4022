use tracing::{debug, warn};

use super::{holding_columns, MenuHandlers, VOUCHER_COLUMNS};
use crate::decimal::{truncate_decimal, DISPLAY_PLACES};
use crate::error::{EngineError, Result};
use crate::l10n::Text;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::list::Selection;
use crate::store::DataType;

impl MenuHandlers {
    /// Make `row` the active voucher.
    async fn write_active(&self, session_id: &str, row: &Selection) -> Result<()> {
        self.write(session_id, DataType::ACTIVE_BAL, &row.balance).await?;
        self.write(session_id, DataType::ACTIVE_DECIMAL, &row.decimal)
            .await?;
        self.write(session_id, DataType::ACTIVE_ADDRESS, &row.address)
            .await?;
        self.write(session_id, DataType::ACTIVE_SYM, &row.symbol).await?;
        Ok(())
    }

    /// Alias line (if any) followed by the active voucher balance.
    pub async fn check_balance(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let no_active = self.flag("flag_no_active_voucher")?;

        let symbol = self.read_optional(session_id, DataType::ACTIVE_SYM).await?;
        let balance = self.read_optional(session_id, DataType::ACTIVE_BAL).await?;
        let (Some(symbol), Some(balance)) = (symbol, balance) else {
            return Ok(HandlerResult::new().set(no_active));
        };
        let alias = self
            .read_optional(session_id, DataType::ACCOUNT_ALIAS)
            .await?;

        let balance = truncate_decimal(&balance, DISPLAY_PLACES).unwrap_or(balance);

        let mut content = String::new();
        if let Some(alias) = alias {
            content.push_str(&alias);
            content.push('\n');
        }
        content.push_str(&Text::Balance.render(
            req.language(),
            &[("balance", balance.as_str()), ("symbol", symbol.as_str())],
        ));
        content.push('\n');
        Ok(HandlerResult::with_content(content).reset(no_active))
    }

    /// Refresh held vouchers and reconcile the active voucher with them.
    ///
    /// Without a previous choice the first held voucher becomes active. A
    /// previously active voucher that is no longer held is an error.
    pub async fn manage_vouchers(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let no_active = self.flag("flag_no_active_voucher")?;
        let api_error = self.flag("flag_api_call_error")?;

        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let mut res = HandlerResult::new();
        let fetched = self
            .service
            .fetch_vouchers(&public_key)
            .await
            .and_then(|holdings| holding_columns(&holdings));
        let cols = match fetched {
            Ok(c) => c,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "fetch_vouchers", &e);
                return Ok(res);
            }
        };
        res.reset_flag(api_error);

        self.write_columns(session_id, VOUCHER_COLUMNS, &cols).await?;
        debug!(session_id, count = cols.len(), "vouchers refreshed");

        if cols.is_empty() {
            res.set_flag(no_active);
            return Ok(res);
        }
        res.reset_flag(no_active);

        let active = match self.read_optional(session_id, DataType::ACTIVE_SYM).await? {
            None => cols.row(0),
            Some(symbol) => match cols.position_of(&symbol) {
                Some(i) => cols.row(i),
                None => {
                    warn!(session_id, %symbol, "active voucher no longer held");
                    return Err(EngineError::Data(format!(
                        "active voucher {symbol} not in holdings of {session_id}"
                    )));
                }
            },
        };
        if let Some(row) = active {
            self.write_active(session_id, &row).await?;
        }
        Ok(res)
    }

    /// Held vouchers as a numbered list of `SYMBOL BALANCE`.
    pub async fn get_vouchers(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let cols = self.read_columns(session_id, VOUCHER_COLUMNS).await?;
        let items: Vec<String> = cols
            .symbols
            .iter()
            .zip(&cols.balances)
            .map(|(s, b)| format!("{s} {b}"))
            .collect();
        Ok(HandlerResult::with_content(self.render_list(&items)))
    }

    /// Stage the voucher picked by index or symbol.
    pub async fn view_voucher(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let incorrect_voucher = self.flag("flag_incorrect_voucher")?;

        let cols = self.read_columns(session_id, VOUCHER_COLUMNS).await?;
        let Some(row) = cols.select(input) else {
            return Ok(HandlerResult::with_content(input.trim()).set(incorrect_voucher));
        };
        self.write(session_id, DataType::TEMPORARY_VALUE, &row.encode())
            .await?;
        Ok(
            HandlerResult::with_content(format!("{} {}", row.symbol, row.balance))
                .reset(incorrect_voucher),
        )
    }

    /// Make the staged voucher active.
    pub async fn set_voucher(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let staged = self
            .read_required(session_id, DataType::TEMPORARY_VALUE)
            .await?;
        let row = Selection::decode(&staged)?;
        self.write_active(session_id, &row).await?;
        self.clear(session_id, DataType::TEMPORARY_VALUE).await?;
        Ok(HandlerResult::with_content(row.symbol))
    }

    pub async fn get_voucher_details(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let api_error = self.flag("flag_api_call_error")?;

        let address = self
            .read_required(session_id, DataType::ACTIVE_ADDRESS)
            .await?;
        let mut res = HandlerResult::new();
        match self.service.voucher_data(&address).await {
            Ok(data) => {
                res.content = Text::VoucherDetails.render(
                    req.language(),
                    &[
                        ("name", data.token_name.as_str()),
                        ("symbol", data.token_symbol.as_str()),
                        ("commodity", data.token_commodity.as_str()),
                        ("location", data.token_location.as_str()),
                    ],
                );
                res.reset_flag(api_error);
            }
            Err(e) => self.service_failed(req, &mut res, api_error, "voucher_data", &e),
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{handlers, request, SESSION};
    use crate::testing::holding;

    const SRF: &str = "0x1111111111111111111111111111111111111111";
    const MILO: &str = "0x2222222222222222222222222222222222222222";

    #[tokio::test]
    async fn test_balance_with_alias() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::ACTIVE_SYM, "SRF").await.unwrap();
        h.write(SESSION, DataType::ACTIVE_BAL, "10.967").await.unwrap();
        h.write(SESSION, DataType::ACCOUNT_ALIAS, "user72").await.unwrap();
        let res = h.check_balance(&request(), "").await.unwrap();
        assert_eq!(res.content, "user72\nBalance: 10.96 SRF\n");
    }

    #[tokio::test]
    async fn test_manage_vouchers_keeps_columns_parallel() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, "0xabc").await.unwrap();
        fake.set_vouchers(vec![
            holding("SRF", "10967000", "6", SRF),
            holding("MILO", "2000000000000000000", "18", MILO),
        ]);

        h.manage_vouchers(&request(), "").await.unwrap();
        let cols = h.read_columns(SESSION, VOUCHER_COLUMNS).await.unwrap();
        assert_eq!(cols.symbols, vec!["SRF", "MILO"]);
        assert_eq!(cols.balances, vec!["10.96", "2.00"]);
        assert_eq!(cols.decimals, vec!["6", "18"]);
        assert_eq!(cols.addresses, vec![SRF, MILO]);
        assert_eq!(
            h.read_required(SESSION, DataType::ACTIVE_SYM).await.unwrap(),
            "SRF"
        );
    }

    #[tokio::test]
    async fn test_malformed_holding_is_a_failed_call() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, "0xabc").await.unwrap();
        fake.set_vouchers(vec![holding("SRF", "10967000", "6", SRF)]);
        h.manage_vouchers(&request(), "").await.unwrap();

        fake.set_vouchers(vec![
            holding("SRF", "10967000", "6", SRF),
            holding("MILO", "2000000", "six", MILO),
        ]);
        let res = h.manage_vouchers(&request(), "").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_api_call_error").unwrap()));
        assert_eq!(res.content, "Your request failed. Please try again later.");

        // The last good list stays cached.
        let cols = h.read_columns(SESSION, VOUCHER_COLUMNS).await.unwrap();
        assert_eq!(cols.symbols, vec!["SRF"]);
        assert_eq!(cols.balances, vec!["10.96"]);
    }

    #[tokio::test]
    async fn test_manage_vouchers_refreshes_active_balance() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, "0xabc").await.unwrap();
        h.write(SESSION, DataType::ACTIVE_SYM, "MILO").await.unwrap();
        h.write(SESSION, DataType::ACTIVE_BAL, "9.00").await.unwrap();
        fake.set_vouchers(vec![
            holding("SRF", "10967000", "6", SRF),
            holding("MILO", "2000000000000000000", "18", MILO),
        ]);
        h.manage_vouchers(&request(), "").await.unwrap();
        assert_eq!(
            h.read_required(SESSION, DataType::ACTIVE_BAL).await.unwrap(),
            "2.00"
        );

        fake.set_vouchers(vec![holding("SRF", "10967000", "6", SRF)]);
        assert!(matches!(
            h.manage_vouchers(&request(), "").await,
            Err(EngineError::Data(_))
        ));
    }

    #[tokio::test]
    async fn test_manage_vouchers_failure_keeps_cache() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, "0xabc").await.unwrap();
        fake.set_vouchers(vec![holding("SRF", "10967000", "6", SRF)]);
        h.manage_vouchers(&request(), "").await.unwrap();

        fake.fail("fetch_vouchers");
        let res = h.manage_vouchers(&request(), "").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_api_call_error").unwrap()));
        let cols = h.read_columns(SESSION, VOUCHER_COLUMNS).await.unwrap();
        assert_eq!(cols.symbols, vec!["SRF"]);
    }

    #[tokio::test]
    async fn test_select_and_set_voucher() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, "0xabc").await.unwrap();
        fake.set_vouchers(vec![
            holding("SRF", "10967000", "6", SRF),
            holding("MILO", "2000000000000000000", "18", MILO),
        ]);
        h.manage_vouchers(&request(), "").await.unwrap();

        let list = h.get_vouchers(&request(), "").await.unwrap();
        assert_eq!(list.content, "1:SRF 10.96\n2:MILO 2.00");

        let bad = h.view_voucher(&request(), "7").await.unwrap();
        assert!(bad.leaves_set(h.flag("flag_incorrect_voucher").unwrap()));

        h.view_voucher(&request(), "milo").await.unwrap();
        let res = h.set_voucher(&request(), "").await.unwrap();
        assert_eq!(res.content, "MILO");
        assert_eq!(
            h.read_required(SESSION, DataType::ACTIVE_ADDRESS).await.unwrap(),
            MILO
        );
        assert_eq!(
            h.read_required(SESSION, DataType::ACTIVE_DECIMAL).await.unwrap(),
            "18"
        );
    }
}
