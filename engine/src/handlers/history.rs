use tracing::debug;

use super::{malformed, MenuHandlers};
use crate::decimal::{parse_decimals, scale_down_display};
use crate::error::Result;
use crate::l10n::Text;
use crate::request::Request;
use crate::result::HandlerResult;
use crate::store::list::decode_list;
use crate::store::DataType;
use crate::validate::normalize_hex;

/// Columns written by `check_transactions`, in write order.
const TX_COLUMNS: [DataType; 8] = [
    DataType::TX_RECIPIENTS,
    DataType::TX_VALUES,
    DataType::TX_ADDRESSES,
    DataType::TX_HASHES,
    DataType::TX_DATES,
    DataType::TX_SYMBOLS,
    DataType::TX_DECIMALS,
    DataType::TX_SENDERS,
];

impl MenuHandlers {
    /// Fetch and cache the latest transfers of the account.
    pub async fn check_transactions(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let no_transfers = self.flag("flag_no_transfers")?;
        let api_error = self.flag("flag_api_call_error")?;

        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let mut res = HandlerResult::new();
        let transfers = match self.service.fetch_transactions(&public_key).await {
            Ok(t) => t,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "fetch_transactions", &e);
                return Ok(res);
            }
        };
        let values = transfers
            .iter()
            .map(|t| scale_down_display(&t.transfer_value, parse_decimals(&t.token_decimals)?))
            .collect::<Result<Vec<_>>>();
        let values = match values {
            Ok(v) => v,
            Err(e) => {
                self.service_failed(req, &mut res, api_error, "fetch_transactions", &malformed(e));
                return Ok(res);
            }
        };
        res.reset_flag(api_error);
        if transfers.is_empty() {
            res.set_flag(no_transfers);
            return Ok(res);
        }
        res.reset_flag(no_transfers);

        let me = normalize_hex(&public_key);
        let mut columns: [Vec<String>; 8] = Default::default();
        let mut feed = Vec::with_capacity(transfers.len());
        for (i, (t, value)) in transfers.iter().zip(values).enumerate() {
            let date = t.date_block.format("%Y-%m-%d").to_string();
            let index = (i + 1).to_string();
            let line = if normalize_hex(&t.sender) == me {
                Text::StatementSent
            } else {
                Text::StatementReceived
            };
            feed.push(line.render(
                req.language(),
                &[
                    ("index", index.as_str()),
                    ("value", value.as_str()),
                    ("symbol", t.token_symbol.as_str()),
                    ("date", date.as_str()),
                ],
            ));

            columns[0].push(t.recipient.clone());
            columns[1].push(value);
            columns[2].push(t.contract_address.clone());
            columns[3].push(t.tx_hash.clone());
            columns[4].push(t.date_block.format("%Y-%m-%d %H:%M").to_string());
            columns[5].push(t.token_symbol.clone());
            columns[6].push(t.token_decimals.clone());
            columns[7].push(t.sender.clone());
        }
        let family = self.store.list_family(TX_COLUMNS[0]);
        for (dt, column) in TX_COLUMNS.iter().zip(&columns) {
            family.write_list(session_id, *dt, column).await?;
        }
        self.write(session_id, DataType::TRANSFERS, &feed.join("\n"))
            .await?;
        debug!(session_id, count = transfers.len(), "transfers cached");
        Ok(res)
    }

    /// The cached transfer feed, one numbered line per transfer.
    pub async fn get_transactions(&self, req: &Request, _input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let feed = self
            .read_optional(session_id, DataType::TRANSFERS)
            .await?
            .unwrap_or_default();
        let items = decode_list(&feed);
        Ok(HandlerResult::with_content(self.render_list(&items)))
    }

    /// Details of the transfer at the 1-based index given as input.
    pub async fn view_statement(&self, req: &Request, input: &str) -> Result<HandlerResult> {
        let session_id = req.session_id()?;
        let incorrect_statement = self.flag("flag_incorrect_statement")?;

        let family = self.store.list_family(TX_COLUMNS[0]);
        let mut columns = Vec::with_capacity(TX_COLUMNS.len());
        for dt in TX_COLUMNS {
            columns.push(family.read_list(session_id, dt).await?);
        }
        let index = input
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| i.checked_sub(1))
            .filter(|i| columns.iter().all(|c| *i < c.len()));
        let Some(i) = index else {
            return Ok(HandlerResult::with_content(input.trim()).set(incorrect_statement));
        };

        let public_key = self.read_required(session_id, DataType::PUBLIC_KEY).await?;
        let sent = normalize_hex(&columns[7][i]) == normalize_hex(&public_key);
        let (direction, party) = if sent {
            (Text::DirectionSent, &columns[0][i])
        } else {
            (Text::DirectionReceived, &columns[7][i])
        };
        let content = Text::StatementDetail.render(
            req.language(),
            &[
                ("direction", direction.get(req.language())),
                ("value", columns[1][i].as_str()),
                ("symbol", columns[5][i].as_str()),
                ("party", party.as_str()),
                ("date", columns[4][i].as_str()),
                ("hash", columns[3][i].as_str()),
            ],
        );
        Ok(HandlerResult::with_content(content).reset(incorrect_statement))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::handlers::test_support::{handlers, request, SESSION};
    use crate::services::Transfer;

    const ME: &str = "0xAbC0000000000000000000000000000000000001";
    const PEER: &str = "0xdef0000000000000000000000000000000000002";

    fn transfer(sender: &str, recipient: &str, value: &str) -> Transfer {
        Transfer {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            transfer_value: value.to_string(),
            contract_address: "0x1111111111111111111111111111111111111111".to_string(),
            tx_hash: "0xfeed".to_string(),
            date_block: Utc.with_ymd_and_hms(2024, 9, 3, 10, 30, 0).unwrap(),
            token_symbol: "SRF".to_string(),
            token_decimals: "6".to_string(),
        }
    }

    #[tokio::test]
    async fn test_statement_feed_and_detail() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, ME).await.unwrap();
        fake.set_transfers(vec![
            transfer(ME, PEER, "1500000"),
            transfer(PEER, ME, "250000"),
        ]);

        h.check_transactions(&request(), "").await.unwrap();
        let feed = h.get_transactions(&request(), "").await.unwrap();
        assert_eq!(
            feed.content,
            "1:Sent 1.50 SRF 2024-09-03\n2:Received 0.25 SRF 2024-09-03"
        );

        let detail = h.view_statement(&request(), "2").await.unwrap();
        assert_eq!(
            detail.content,
            format!("Received 0.25 SRF\n{PEER}\n2024-09-03 10:30\n0xfeed")
        );

        let bad = h.view_statement(&request(), "3").await.unwrap();
        assert!(bad.leaves_set(h.flag("flag_incorrect_statement").unwrap()));
    }

    #[tokio::test]
    async fn test_malformed_transfer_is_a_failed_call() {
        let (h, fake) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, ME).await.unwrap();
        let mut odd = transfer(PEER, ME, "250000");
        odd.token_decimals = "x".to_string();
        fake.set_transfers(vec![transfer(ME, PEER, "1500000"), odd]);

        let res = h.check_transactions(&request(), "").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_api_call_error").unwrap()));
        assert!(!res.leaves_set(h.flag("flag_no_transfers").unwrap()));
    }

    #[tokio::test]
    async fn test_no_transfers() {
        let (h, _) = handlers();
        h.write(SESSION, DataType::PUBLIC_KEY, ME).await.unwrap();
        let res = h.check_transactions(&request(), "").await.unwrap();
        assert!(res.leaves_set(h.flag("flag_no_transfers").unwrap()));
    }
}
