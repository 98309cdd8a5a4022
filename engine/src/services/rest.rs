//! JSON-over-HTTP implementation of [`AccountService`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::ServiceError;
use crate::services::types::*;
use crate::services::{AccountService, ServiceResult};

/// Every response body is wrapped as `{ok, description, result}`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    #[serde(default)]
    description: String,
    result: Option<T>,
}

impl<T> Envelope<T> {
    fn into_result(self) -> ServiceResult<T> {
        if !self.ok {
            return Err(ServiceError::Api {
                description: self.description,
            });
        }
        self.result.ok_or(ServiceError::Api {
            description: "response carried no result".to_string(),
        })
    }
}

/// Client for the custodial API (accounts, transfers, swaps, SMS) and the
/// data API (holdings, history, pools, aliases).
#[derive(Debug, Clone)]
pub struct HttpAccountService {
    client: Client,
    custodial_url: String,
    data_url: String,
}

impl HttpAccountService {
    /// # Errors
    ///
    /// Returns `ServiceError::Url` if either base URL does not parse.
    pub fn new(custodial_url: &str, data_url: &str) -> ServiceResult<Self> {
        Url::parse(custodial_url)?;
        Url::parse(data_url)?;
        Ok(Self {
            client: Client::new(),
            custodial_url: custodial_url.trim_end_matches('/').to_string(),
            data_url: data_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn custodial_url(&self) -> &str {
        &self.custodial_url
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    async fn envelope<T: DeserializeOwned>(resp: reqwest::Response) -> ServiceResult<Envelope<T>> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::Http {
                status,
                message: body,
            });
        }
        Ok(resp.json().await?)
    }

    async fn unwrap<T: DeserializeOwned>(resp: reqwest::Response) -> ServiceResult<T> {
        Self::envelope(resp).await?.into_result()
    }

    async fn get<T: DeserializeOwned>(&self, base: &str, path: &str) -> ServiceResult<T> {
        let url = format!("{base}{path}");
        debug!(%url, "GET");
        let resp = self.client.get(&url).send().await?;
        Self::unwrap(resp).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        body: &B,
    ) -> ServiceResult<T> {
        let url = format!("{base}{path}");
        debug!(%url, "POST");
        let resp = self.client.post(&url).json(body).send().await?;
        Self::unwrap(resp).await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        base: &str,
        path: &str,
        body: &B,
    ) -> ServiceResult<T> {
        let url = format!("{base}{path}");
        debug!(%url, "PUT");
        let resp = self.client.put(&url).json(body).send().await?;
        Self::unwrap(resp).await
    }

    /// POST where only success matters; the result may be absent.
    async fn post_unit<B: Serialize + ?Sized>(&self, base: &str, path: &str, body: &B) -> ServiceResult<()> {
        let url = format!("{base}{path}");
        debug!(%url, "POST");
        let resp = self.client.post(&url).json(body).send().await?;
        let envelope: Envelope<serde_json::Value> = Self::envelope(resp).await?;
        if !envelope.ok {
            return Err(ServiceError::Api {
                description: envelope.description,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AccountService for HttpAccountService {
    async fn create_account(&self) -> ServiceResult<AccountResult> {
        self.post(&self.custodial_url, "/api/v2/account/create", &json!({}))
            .await
    }

    async fn track_account_status(&self, public_key: &str) -> ServiceResult<TrackStatusResult> {
        self.get(
            &self.custodial_url,
            &format!("/api/v2/account/status/{public_key}"),
        )
        .await
    }

    async fn fetch_vouchers(&self, public_key: &str) -> ServiceResult<Vec<TokenHoldings>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Holdings {
            holdings: Vec<TokenHoldings>,
        }
        let res: Holdings = self
            .get(&self.data_url, &format!("/api/v1/token-holdings/{public_key}"))
            .await?;
        Ok(res.holdings)
    }

    async fn voucher_data(&self, address: &str) -> ServiceResult<VoucherDataResult> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Details {
            token_details: VoucherDataResult,
        }
        let res: Details = self
            .get(&self.data_url, &format!("/api/v1/token-details/{address}"))
            .await?;
        Ok(res.token_details)
    }

    async fn fetch_transactions(&self, public_key: &str) -> ServiceResult<Vec<Transfer>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Transfers {
            transfers: Vec<Transfer>,
        }
        let res: Transfers = self
            .get(
                &self.data_url,
                &format!("/api/v1/token-transfers/last10/{public_key}"),
            )
            .await?;
        Ok(res.transfers)
    }

    async fn token_transfer(
        &self,
        amount: &str,
        from: &str,
        to: &str,
        token_address: &str,
    ) -> ServiceResult<TokenTransferResult> {
        self.post(
            &self.custodial_url,
            "/api/v2/token/transfer",
            &json!({
                "amount": amount,
                "from": from,
                "to": to,
                "tokenAddress": token_address,
            }),
        )
        .await
    }

    async fn check_alias_address(&self, alias: &str) -> ServiceResult<AliasAddress> {
        self.get(&self.data_url, &format!("/api/v1/alias/{alias}"))
            .await
    }

    async fn request_alias(&self, public_key: &str, hint: &str) -> ServiceResult<RequestAliasResult> {
        self.post(
            &self.data_url,
            "/api/v1/alias/register",
            &json!({ "address": public_key, "hint": hint }),
        )
        .await
    }

    async fn update_alias(&self, hint: &str, public_key: &str) -> ServiceResult<RequestAliasResult> {
        self.put(
            &self.data_url,
            "/api/v1/alias/update",
            &json!({ "address": public_key, "hint": hint }),
        )
        .await
    }

    async fn fetch_top_pools(&self) -> ServiceResult<Vec<Pool>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Pools {
            pools: Vec<Pool>,
        }
        let res: Pools = self.get(&self.data_url, "/api/v1/pool/top").await?;
        Ok(res.pools)
    }

    async fn retrieve_pool_details(&self, sym_or_address: &str) -> ServiceResult<Pool> {
        self.get(
            &self.data_url,
            &format!("/api/v1/pool/details/{sym_or_address}"),
        )
        .await
    }

    async fn check_token_in_pool(&self, pool: &str, token: &str) -> ServiceResult<TokenInPool> {
        self.get(
            &self.data_url,
            &format!("/api/v1/pool/{pool}/check/{token}"),
        )
        .await
    }

    async fn get_pool_swappable_vouchers(&self, pool: &str) -> ServiceResult<Vec<TokenHoldings>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Swappable {
            filtered: Vec<TokenHoldings>,
        }
        let res: Swappable = self
            .get(&self.data_url, &format!("/api/v1/pool/{pool}/tokens"))
            .await?;
        Ok(res.filtered)
    }

    async fn get_swap_from_token_max_limit(
        &self,
        pool: &str,
        from: &str,
        to: &str,
        public_key: &str,
    ) -> ServiceResult<MaxLimitResult> {
        self.get(
            &self.data_url,
            &format!("/api/v1/pool/{pool}/limit/{from}/{to}/{public_key}"),
        )
        .await
    }

    async fn get_pool_swap_quote(
        &self,
        amount: &str,
        public_key: &str,
        from: &str,
        pool: &str,
        to: &str,
    ) -> ServiceResult<SwapQuote> {
        self.post(
            &self.custodial_url,
            "/api/v2/pool/quote",
            &json!({
                "amount": amount,
                "from": public_key,
                "fromTokenAddress": from,
                "poolAddress": pool,
                "toTokenAddress": to,
            }),
        )
        .await
    }

    async fn get_credit_send_reverse_quote(
        &self,
        pool: &str,
        from: &str,
        to: &str,
        out_amount: &str,
    ) -> ServiceResult<ReverseQuote> {
        self.post(
            &self.custodial_url,
            "/api/v2/pool/reverse-quote",
            &json!({
                "poolAddress": pool,
                "fromTokenAddress": from,
                "toTokenAddress": to,
                "outAmount": out_amount,
            }),
        )
        .await
    }

    async fn pool_swap(
        &self,
        amount: &str,
        public_key: &str,
        from: &str,
        pool: &str,
        to: &str,
    ) -> ServiceResult<PoolSwapResult> {
        self.post(
            &self.custodial_url,
            "/api/v2/pool/swap",
            &json!({
                "amount": amount,
                "from": public_key,
                "fromTokenAddress": from,
                "poolAddress": pool,
                "toTokenAddress": to,
            }),
        )
        .await
    }

    async fn send_upsell_sms(&self, from: &str, to: &str) -> ServiceResult<()> {
        self.post_unit(
            &self.custodial_url,
            "/api/v1/external/upsell",
            &json!({ "inviterPhoneNumber": from, "inviteePhoneNumber": to }),
        )
        .await
    }

    async fn send_pin_reset_sms(&self, admin: &str, blocked: &str) -> ServiceResult<()> {
        self.post_unit(
            &self.custodial_url,
            "/api/v1/external/pin-reset",
            &json!({ "admin": admin, "phoneNumber": blocked }),
        )
        .await
    }

    async fn send_address_sms(&self, public_key: &str, phone: &str) -> ServiceResult<()> {
        self.post_unit(
            &self.custodial_url,
            "/api/v1/external/address",
            &json!({ "address": public_key, "phoneNumber": phone }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_urls() {
        assert!(matches!(
            HttpAccountService::new("not a url", "http://localhost"),
            Err(ServiceError::Url(_))
        ));
        let svc = HttpAccountService::new("http://custodial/", "http://data").unwrap();
        assert_eq!(svc.custodial_url(), "http://custodial");
    }

    #[test]
    fn test_envelope() {
        let ok: Envelope<TokenInPool> =
            serde_json::from_str(r#"{"ok":true,"description":"","result":{"canSwapFrom":true}}"#)
                .unwrap();
        assert!(ok.into_result().unwrap().can_swap_from);
        let failed: Envelope<TokenInPool> =
            serde_json::from_str(r#"{"ok":false,"description":"pool not found"}"#).unwrap();
        assert!(matches!(
            failed.into_result(),
            Err(ServiceError::Api { description }) if description == "pool not found"
        ));
    }
}
