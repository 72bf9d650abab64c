//! # gateway::kraken
//!
//! Kraken Futures `sendorder` client.
//!
//! ## Request signing
//! ```text
//! query   = orderType=mkt&side=buy&size=1&symbol=pi_xbtusd   (keys sorted)
//! path    = endpoint path without the leading /derivatives  → /api/v3/sendorder
//! Authent = base64( HMAC-SHA512( base64decode(secret), SHA256(query + path) ) )
//! ```
//! Headers: `APIKey: <public key>`, `Authent: <signature>`.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};
use tracing::{info, warn};
use url::Url;

use super::{GatewayError, OrderGateway};
use crate::models::order::SendOrderResponse;
use crate::models::{Instrument, OrderResult, Side};

type HmacSha512 = Hmac<Sha512>;

/// Prefix the exchange strips before checking the signature.
const SIGNED_PATH_PREFIX: &str = "/derivatives";

pub struct KrakenGateway {
    client:      reqwest::Client,
    public_key:  String,
    private_key: String,
}

impl KrakenGateway {
    pub fn new(client: reqwest::Client, public_key: String, private_key: String) -> Self {
        Self {
            client,
            public_key,
            private_key,
        }
    }
}

/// Compute the `Authent` header for `post_data` sent to `endpoint_path`.
pub fn sign_request(post_data: &str, endpoint_path: &str, secret_b64: &str) -> Result<String, GatewayError> {
    let digest = Sha256::digest(format!("{post_data}{endpoint_path}").as_bytes());
    let secret = STANDARD.decode(secret_b64)?;

    // HMAC accepts keys of any length
    let mut mac = HmacSha512::new_from_slice(&secret).map_err(|e| GatewayError::Endpoint {
        endpoint: endpoint_path.to_string(),
        reason:   e.to_string(),
    })?;
    mac.update(&digest);

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn order_query(instrument: Instrument, side: Side, size: u32) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .append_pair("orderType", "mkt")
        .append_pair("side", side.as_str())
        .append_pair("size", &size.to_string())
        .append_pair("symbol", &instrument.order_symbol())
        .finish()
}

fn signed_path(endpoint: &str) -> Result<String, GatewayError> {
    let url = Url::parse(endpoint).map_err(|e| GatewayError::Endpoint {
        endpoint: endpoint.to_string(),
        reason:   e.to_string(),
    })?;
    let path = url.path();
    Ok(path.strip_prefix(SIGNED_PATH_PREFIX).unwrap_or(path).to_string())
}

#[async_trait]
impl OrderGateway for KrakenGateway {
    async fn submit(
        &self,
        instrument: Instrument,
        side: Side,
        size: u32,
        endpoint: &str,
    ) -> Result<OrderResult, GatewayError> {
        let query = order_query(instrument, side, size);
        let authent = sign_request(&query, &signed_path(endpoint)?, &self.private_key)?;

        info!(%instrument, %side, size, %endpoint, "🚀 [GATEWAY] Sending market order");

        let response = self
            .client
            .post(format!("{endpoint}?{query}"))
            .header("APIKey", &self.public_key)
            .header("Authent", authent)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        let decoded: SendOrderResponse = serde_json::from_slice(&body).map_err(|source| {
            warn!(http_status = %status, "Order response decode failed");
            GatewayError::Decode {
                status: status.as_u16(),
                source,
            }
        })?;

        let result = OrderResult::from(decoded);
        info!(
            accepted = result.is_accepted(),
            order_id = ?result.order_id,
            fill_price = ?result.fill_price,
            "[GATEWAY] Exchange answered"
        );

        Ok(result)
    }
}
