//! External ledger lookup.
//!
//! Lists recent inbound transactions for the merchant account from a
//! toncenter-style HTTP API. Amounts are integer nanotons end to end; the
//! memo lives in one of several fields depending on how the wallet sent
//! it, so extraction is an explicit priority-ordered pipeline with a total
//! "no memo" fallback instead of a shape assertion.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed ledger response: {0}")]
    Malformed(String),
}

/// One inbound transaction, reduced to what payment matching needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTx {
    pub hash: String,
    /// Transferred amount in nanotons.
    pub amount_nano: i64,
    pub comment: Option<String>,
    pub message: Option<String>,
    pub decoded_text: Option<String>,
}

impl LedgerTx {
    /// Memo extraction: fixed priority order, first non-empty wins.
    pub fn memo(&self) -> Option<&str> {
        [&self.comment, &self.message, &self.decoded_text]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Most recent inbound transactions for the merchant account,
    /// newest first, at most `limit` entries.
    async fn recent_transactions(&self, limit: u32) -> Result<Vec<LedgerTx>, LedgerError>;
}

// ============================================================================
// HTTP implementation
// ============================================================================

pub struct TonHttpLedger {
    http: reqwest::Client,
    base_url: String,
    account: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct TonResponse {
    ok: bool,
    result: Option<Vec<TonTxRaw>>,
}

#[derive(Deserialize)]
struct TonTxRaw {
    transaction_id: Option<TonTxId>,
    in_msg: Option<TonInMsg>,
}

#[derive(Deserialize)]
struct TonTxId {
    hash: Option<String>,
}

#[derive(Deserialize)]
struct TonInMsg {
    value: Option<String>,
    comment: Option<String>,
    message: Option<String>,
    msg_data: Option<TonMsgData>,
}

#[derive(Deserialize)]
struct TonMsgData {
    text: Option<String>,
}

impl TonHttpLedger {
    pub fn new(base_url: String, account: String, api_key: Option<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url, account, api_key }
    }

    fn convert(raw: TonTxRaw) -> Option<LedgerTx> {
        let hash = raw.transaction_id?.hash?;
        let in_msg = raw.in_msg?;
        // Amounts arrive as decimal strings of nanotons; anything that
        // does not parse cleanly is skipped rather than guessed at.
        let amount_nano = in_msg.value.as_deref()?.parse::<i64>().ok()?;
        Some(LedgerTx {
            hash,
            amount_nano,
            comment: in_msg.comment,
            message: in_msg.message,
            decoded_text: in_msg.msg_data.and_then(|d| d.text),
        })
    }
}

#[async_trait]
impl LedgerClient for TonHttpLedger {
    async fn recent_transactions(&self, limit: u32) -> Result<Vec<LedgerTx>, LedgerError> {
        let url = format!("{}/getTransactions", self.base_url);
        let mut request = self
            .http
            .get(&url)
            .query(&[("address", self.account.as_str())])
            .query(&[("limit", limit)]);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response: TonResponse = request.send().await?.error_for_status()?.json().await?;
        if !response.ok {
            return Err(LedgerError::Malformed("ledger reported ok=false".into()));
        }
        let raw = response
            .result
            .ok_or_else(|| LedgerError::Malformed("missing result array".into()))?;

        let txs: Vec<LedgerTx> = raw.into_iter().filter_map(Self::convert).collect();
        debug!(count = txs.len(), "fetched ledger transactions");
        Ok(txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(comment: Option<&str>, message: Option<&str>, text: Option<&str>) -> LedgerTx {
        LedgerTx {
            hash: "h".into(),
            amount_nano: 1,
            comment: comment.map(Into::into),
            message: message.map(Into::into),
            decoded_text: text.map(Into::into),
        }
    }

    #[test]
    fn memo_priority_order() {
        assert_eq!(tx(Some("c"), Some("m"), Some("t")).memo(), Some("c"));
        assert_eq!(tx(None, Some("m"), Some("t")).memo(), Some("m"));
        assert_eq!(tx(None, None, Some("t")).memo(), Some("t"));
        assert_eq!(tx(None, None, None).memo(), None);
    }

    #[test]
    fn empty_and_whitespace_fields_are_skipped() {
        assert_eq!(tx(Some(""), Some("m"), None).memo(), Some("m"));
        assert_eq!(tx(Some("  "), None, Some("t")).memo(), Some("t"));
        assert_eq!(tx(Some(""), Some(""), Some("")).memo(), None);
    }

    #[test]
    fn convert_skips_malformed_entries() {
        let raw = TonTxRaw {
            transaction_id: Some(TonTxId { hash: Some("abc".into()) }),
            in_msg: Some(TonInMsg {
                value: Some("not_a_number".into()),
                comment: None,
                message: None,
                msg_data: None,
            }),
        };
        assert!(TonHttpLedger::convert(raw).is_none());

        let ok = TonTxRaw {
            transaction_id: Some(TonTxId { hash: Some("abc".into()) }),
            in_msg: Some(TonInMsg {
                value: Some("500000000".into()),
                comment: Some("memo".into()),
                message: None,
                msg_data: None,
            }),
        };
        let tx = TonHttpLedger::convert(ok).unwrap();
        assert_eq!(tx.amount_nano, 500_000_000);
        assert_eq!(tx.memo(), Some("memo"));
    }

    #[test]
    fn response_envelope_parses() {
        let body = r#"{
            "ok": true,
            "result": [{
                "transaction_id": { "hash": "deadbeef" },
                "in_msg": {
                    "value": "2500000000",
                    "message": "tc_u1_silver_42",
                    "msg_data": { "text": "ignored" }
                }
            }]
        }"#;
        let parsed: TonResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.ok);
        let txs: Vec<LedgerTx> = parsed
            .result
            .unwrap()
            .into_iter()
            .filter_map(TonHttpLedger::convert)
            .collect();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].hash, "deadbeef");
        assert_eq!(txs[0].memo(), Some("tc_u1_silver_42"));
    }
}
