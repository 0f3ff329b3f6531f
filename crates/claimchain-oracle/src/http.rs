//! Insight-API HTTP client for the chain oracle.
//!
//! Talks to an insight-style block explorer:
//! - `GET  /addr/{address}/utxo`
//! - `GET  /tx/{txid}`
//! - `GET  /ntx/{ntxid}` (normalized-id resolution)
//! - `POST /tx/send` with `{"rawtx": hex}`

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::OracleError;
use crate::oracle::ChainOracle;
use crate::types::{TransactionInfo, TxOutput, Utxo};

/// HTTP chain oracle backed by an insight API.
#[derive(Clone)]
pub struct InsightOracle {
    base_url: String,
    client: reqwest::Client,
}

impl InsightOracle {
    /// Create a client for the given insight base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, OracleError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(format!("GET {}: {}", url, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(OracleError::Http(format!(
                "GET {}: status {}",
                url,
                response.status()
            )));
        }

        let value = response
            .json::<T>()
            .await
            .map_err(|e| OracleError::Decode(format!("GET {}: {}", url, e)))?;
        Ok(Some(value))
    }
}

/// Insight's UTXO shape.
#[derive(Debug, Deserialize)]
struct InsightUtxo {
    txid: String,
    vout: u32,
    satoshis: u64,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: String,
}

/// Insight's transaction shape, reduced to the fields we read.
#[derive(Debug, Deserialize)]
struct InsightTx {
    txid: String,
    #[serde(default)]
    ntxid: String,
    vout: Vec<InsightVout>,
}

#[derive(Debug, Deserialize)]
struct InsightVout {
    /// Insight reports values as decimal strings.
    value: serde_json::Value,
    #[serde(rename = "scriptPubKey")]
    script_pub_key: InsightScript,
}

#[derive(Debug, Deserialize)]
struct InsightScript {
    #[serde(default)]
    addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct NtxResponse {
    txid: String,
}

#[derive(Debug, Deserialize)]
struct BroadcastResponse {
    txid: String,
}

fn parse_value(value: &serde_json::Value) -> Result<f64, OracleError> {
    match value {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| OracleError::Decode(format!("output value {}: {}", s, e))),
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| OracleError::Decode(format!("output value {}", n))),
        other => Err(OracleError::Decode(format!("output value {}", other))),
    }
}

impl TryFrom<InsightTx> for TransactionInfo {
    type Error = OracleError;

    fn try_from(tx: InsightTx) -> Result<Self, OracleError> {
        let outputs = tx
            .vout
            .into_iter()
            .map(|v| {
                Ok(TxOutput {
                    value: parse_value(&v.value)?,
                    addresses: v.script_pub_key.addresses,
                })
            })
            .collect::<Result<Vec<_>, OracleError>>()?;
        Ok(TransactionInfo {
            txid: tx.txid,
            ntxid: tx.ntxid,
            outputs,
        })
    }
}

#[async_trait]
impl ChainOracle for InsightOracle {
    async fn unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>, OracleError> {
        let utxos: Vec<InsightUtxo> = self
            .get_json(&format!("/addr/{}/utxo", address))
            .await?
            .unwrap_or_default();
        debug!(address, count = utxos.len(), "fetched unspent outputs");
        Ok(utxos
            .into_iter()
            .map(|u| Utxo {
                txid: u.txid,
                vout: u.vout,
                satoshis: u.satoshis,
                script_pub_key: u.script_pub_key,
            })
            .collect())
    }

    async fn transaction(&self, txid: &str) -> Result<Option<TransactionInfo>, OracleError> {
        let tx: Option<InsightTx> = self.get_json(&format!("/tx/{}", txid)).await?;
        tx.map(TransactionInfo::try_from).transpose()
    }

    async fn resolve_ntxid(&self, ntxid: &str) -> Result<Option<String>, OracleError> {
        let resolved: Option<NtxResponse> = self.get_json(&format!("/ntx/{}", ntxid)).await?;
        Ok(resolved.map(|r| r.txid))
    }

    async fn broadcast(&self, raw_tx: &[u8]) -> Result<String, OracleError> {
        let url = format!("{}/tx/send", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "rawtx": hex::encode(raw_tx) }))
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(format!("POST {}: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::BroadcastRejected(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body: BroadcastResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Decode(format!("broadcast response: {}", e)))?;
        Ok(body.txid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insight_tx_value_forms() {
        let tx: InsightTx = serde_json::from_value(serde_json::json!({
            "txid": "ab".repeat(32),
            "ntxid": "cd".repeat(32),
            "vout": [
                { "value": "0.10000000", "scriptPubKey": { "addresses": ["addr1"] } },
                { "value": 0.25, "scriptPubKey": { "addresses": [] } },
            ]
        }))
        .unwrap();

        let info = TransactionInfo::try_from(tx).unwrap();
        assert_eq!(info.outputs.len(), 2);
        assert!((info.outputs[0].value - 0.1).abs() < 1e-12);
        assert!((info.outputs[1].value - 0.25).abs() < 1e-12);
        assert_eq!(info.outputs[0].addresses, vec!["addr1"]);
    }

    #[test]
    fn test_bad_value_is_decode_error() {
        let tx: InsightTx = serde_json::from_value(serde_json::json!({
            "txid": "ab".repeat(32),
            "vout": [
                { "value": "not a number", "scriptPubKey": {} },
            ]
        }))
        .unwrap();
        assert!(matches!(
            TransactionInfo::try_from(tx),
            Err(OracleError::Decode(_))
        ));
    }
}
