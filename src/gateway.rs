use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Order creation request sent to the external payment provider. Amounts are
/// in minor currency units, as the provider expects.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt: String,
}

/// Provider-side order handle returned to the client so it can complete the
/// payment flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrderHandle {
    pub gateway_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(
        &self,
        request: GatewayOrderRequest,
    ) -> Result<GatewayOrderHandle, ServiceError>;
}

/// HTTP client for the hosted payment provider.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            key_id,
            key_secret,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProviderOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProviderOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_order(
        &self,
        request: GatewayOrderRequest,
    ) -> Result<GatewayOrderHandle, ServiceError> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&ProviderOrderBody {
                amount: request.amount_minor,
                currency: &request.currency,
                receipt: &request.receipt,
            })
            .send()
            .await
            .map_err(|e| {
                ServiceError::ExternalServiceError(format!("Payment provider unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Payment provider returned {}",
                response.status()
            )));
        }

        let body: ProviderOrderResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed provider response: {}", e))
        })?;

        Ok(GatewayOrderHandle {
            gateway_order_id: body.id,
            amount_minor: body.amount,
            currency: body.currency,
        })
    }
}
