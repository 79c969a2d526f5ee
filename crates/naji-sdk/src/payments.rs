//! Sparks invoices and the user's Solana wallet.

use std::future::Future;

use serde::Serialize;
use serde_json::Value;

use crate::catalog::{
    CREATE_INVOICE_SPARKS, GET_SOLANA_ADDRESS, GET_SOLANA_BALANCE, GET_TOKEN_BALANCE,
    SOLANA_CREATE_TOKEN, SOLANA_EXECUTE_CONTRACT, SOLANA_MINT_NFT, SOLANA_PAYMENT_REQUEST,
    SOLANA_SIGN_MESSAGE,
};
use crate::{BridgeError, NajiApp, Result, decode, truthy};

/// Native payment sheet for an in-app purchase priced in Sparks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub title: String,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Invoice {
    pub fn new(title: impl Into<String>, amount: u64) -> Self {
        Self {
            title: title.into(),
            amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Transfer request shown to the user for approval.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub recipient: String,
    pub amount: f64,
    /// SPL token mint; `None` pays in SOL.
    pub token_mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl PaymentRequest {
    pub fn sol(recipient: impl Into<String>, amount: f64) -> Self {
        Self {
            recipient: recipient.into(),
            amount,
            token_mint: None,
            memo: None,
        }
    }

    pub fn token(recipient: impl Into<String>, amount: f64, token_mint: impl Into<String>) -> Self {
        Self {
            token_mint: Some(token_mint.into()),
            ..Self::sol(recipient, amount)
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Largest integer a JavaScript number holds exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Whole count of units from a JavaScript number. `None` for NaN, infinities,
/// negatives, fractions and anything past `Number.MAX_SAFE_INTEGER`.
pub fn whole_units(value: f64) -> Option<u64> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= MAX_SAFE_INTEGER {
        Some(value as u64)
    } else {
        None
    }
}

/// New SPL token
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenSpec {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub supply: u64,
    /// Metadata URI
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NftSpec {
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenMintPayload<'a> {
    token_mint: &'a str,
}

#[derive(Serialize)]
struct MessagePayload<'a> {
    message: &'a str,
}

impl NajiApp {
    /// Resolves to `true` once paid; `false` when cancelled.
    pub fn create_invoice(&self, invoice: Invoice) -> impl Future<Output = Result<bool>> {
        let reply = self.bridge.request(CREATE_INVOICE_SPARKS, &invoice);
        async move { Ok(truthy(&reply.await?)) }
    }

    /// Address of the linked wallet, `None` when no wallet is linked.
    pub fn solana_address(&self) -> impl Future<Output = Result<Option<String>>> {
        let reply = self.bridge.request(GET_SOLANA_ADDRESS, ());
        async move {
            match reply.await? {
                Value::Null => Ok(None),
                Value::String(address) if address.is_empty() => Ok(None),
                Value::String(address) => Ok(Some(address)),
                other => Err(BridgeError::Decode {
                    kind: GET_SOLANA_ADDRESS.to_string(),
                    reason: format!("expected address string, got {}", other),
                }),
            }
        }
    }

    /// SOL balance of the linked wallet
    pub fn solana_balance(&self) -> impl Future<Output = Result<f64>> {
        let reply = self.bridge.request(GET_SOLANA_BALANCE, ());
        async move { decode(GET_SOLANA_BALANCE, reply.await?) }
    }

    pub fn token_balance(&self, token_mint: &str) -> impl Future<Output = Result<f64>> {
        let reply = self
            .bridge
            .request(GET_TOKEN_BALANCE, TokenMintPayload { token_mint });
        async move { decode(GET_TOKEN_BALANCE, reply.await?) }
    }

    /// Resolves to the host's transaction result.
    pub fn payment_request(&self, request: PaymentRequest) -> impl Future<Output = Result<Value>> {
        self.bridge.request(SOLANA_PAYMENT_REQUEST, &request)
    }

    pub fn create_token(&self, spec: TokenSpec) -> impl Future<Output = Result<Value>> {
        self.bridge.request(SOLANA_CREATE_TOKEN, &spec)
    }

    pub fn mint_nft(&self, spec: NftSpec) -> impl Future<Output = Result<Value>> {
        self.bridge.request(SOLANA_MINT_NFT, &spec)
    }

    pub fn sign_message(&self, message: &str) -> impl Future<Output = Result<Value>> {
        self.bridge
            .request(SOLANA_SIGN_MESSAGE, MessagePayload { message })
    }

    /// The payload layout is defined by the contract being called.
    pub fn execute_contract(&self, payload: impl Serialize) -> impl Future<Output = Result<Value>> {
        self.bridge.request(SOLANA_EXECUTE_CONTRACT, payload)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::test_support::app;

    use super::*;

    #[test]
    fn test_whole_units() {
        assert_eq!(whole_units(0.0), Some(0));
        assert_eq!(whole_units(250.0), Some(250));
        assert_eq!(whole_units(MAX_SAFE_INTEGER), Some(9_007_199_254_740_991));

        for bad in [-1.0, 2.5, f64::NAN, f64::INFINITY, MAX_SAFE_INTEGER + 2.0] {
            assert_eq!(whole_units(bad), None, "{} accepted", bad);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_invoice_paid_and_declined() {
        let (app, host) = app();

        let paid = app.create_invoice(Invoice::new("Golden hat", 150).with_description("Cosmetic"));
        let frame = host.requests_of(CREATE_INVOICE_SPARKS).remove(0);
        assert_eq!(frame.payload["title"], "Golden hat");
        assert_eq!(frame.payload["amount"], 150);
        assert_eq!(frame.payload["description"], "Cosmetic");
        host.reply(frame.request_id().unwrap(), json!(true));
        assert_eq!(paid.await, Ok(true));

        let declined = app.create_invoice(Invoice::new("Golden hat", 150));
        let id = host.last_request_id(CREATE_INVOICE_SPARKS).unwrap();
        assert!(!host.requests_of(CREATE_INVOICE_SPARKS)[1].payload.contains_key("description"));
        host.reply_error(&id, "Insufficient sparks");
        assert_eq!(
            declined.await.unwrap_err().host_message(),
            Some("Insufficient sparks")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_solana_address() {
        let (app, host) = app();

        let linked = app.solana_address();
        host.reply(&host.last_request_id(GET_SOLANA_ADDRESS).unwrap(), json!("9xQe...Fin"));
        assert_eq!(linked.await, Ok(Some("9xQe...Fin".to_string())));

        let unlinked = app.solana_address();
        host.reply(&host.last_request_id(GET_SOLANA_ADDRESS).unwrap(), Value::Null);
        assert_eq!(unlinked.await, Ok(None));

        let garbage = app.solana_address();
        host.reply(&host.last_request_id(GET_SOLANA_ADDRESS).unwrap(), json!(12));
        assert!(matches!(garbage.await, Err(BridgeError::Decode { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_balances() {
        let (app, host) = app();

        let sol = app.solana_balance();
        host.reply(&host.last_request_id(GET_SOLANA_BALANCE).unwrap(), json!(1.25));
        assert_eq!(sol.await, Ok(1.25));

        let usdc = app.token_balance("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        let frame = host.requests_of(GET_TOKEN_BALANCE).remove(0);
        assert_eq!(
            frame.payload["tokenMint"],
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
        );
        host.reply(frame.request_id().unwrap(), json!(20));
        assert_eq!(usdc.await, Ok(20.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_payment_request_payload() {
        let (app, host) = app();

        let reply = app.payment_request(PaymentRequest::sol("Recipient111", 0.5).with_memo("order 7"));
        let frame = host.requests_of(SOLANA_PAYMENT_REQUEST).remove(0);
        assert_eq!(frame.payload["recipient"], "Recipient111");
        assert_eq!(frame.payload["amount"], 0.5);
        assert_eq!(frame.payload["tokenMint"], Value::Null);
        assert_eq!(frame.payload["memo"], "order 7");

        host.reply(frame.request_id().unwrap(), json!({"signature": "5sig"}));
        assert_eq!(reply.await.unwrap()["signature"], "5sig");

        let token = PaymentRequest::token("R", 3.0, "Mint111");
        assert_eq!(token.token_mint.as_deref(), Some("Mint111"));
        assert_eq!(token.memo, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_nft_sign_and_contract() {
        let (app, host) = app();

        let _token = app.create_token(TokenSpec {
            name: "Naji Coin".to_string(),
            symbol: "NJC".to_string(),
            decimals: 9,
            supply: 1_000_000,
            uri: "https://meta/njc.json".to_string(),
        });
        let _nft = app.mint_nft(NftSpec {
            name: "Badge".to_string(),
            symbol: "BDG".to_string(),
            uri: "https://meta/badge.json".to_string(),
        });
        let signed = app.sign_message("hello");
        let _call = app.execute_contract(json!({"programId": "Prog111", "data": [1, 2]}));

        assert_eq!(host.requests_of(SOLANA_CREATE_TOKEN)[0].payload["decimals"], 9);
        assert_eq!(host.requests_of(SOLANA_MINT_NFT)[0].payload["symbol"], "BDG");
        assert_eq!(host.requests_of(SOLANA_EXECUTE_CONTRACT)[0].payload["programId"], "Prog111");

        let frame = host.requests_of(SOLANA_SIGN_MESSAGE).remove(0);
        assert_eq!(frame.payload["message"], "hello");
        host.reply(frame.request_id().unwrap(), json!("c2lnbmF0dXJl"));
        assert_eq!(signed.await, Ok(json!("c2lnbmF0dXJl")));
    }
}
