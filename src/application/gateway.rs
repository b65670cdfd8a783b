use crate::domain::payload::{
    AuthorisationPayload, GatewayResponse, RegistrationPayload, SalesAdjustmentPayload,
};
use crate::domain::ports::{Endpoint, GatewayTransportBox};
use crate::error::{GatewayError, Result};
use serde::Serialize;
use tracing::Instrument;

/// Typed client for the gateway's POS API.
///
/// Encodes signed payloads, hands them to the transport, and decodes the
/// reply. It neither signs nor authenticates; the flow controller owns keys.
pub struct GatewayClient {
    transport: GatewayTransportBox,
    version: String,
}

impl GatewayClient {
    pub fn new(transport: GatewayTransportBox, version: impl Into<String>) -> Self {
        Self {
            transport,
            version: version.into(),
        }
    }

    /// Integration version reported as the registration firmware version.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub async fn register_pos_device(&self, payload: &RegistrationPayload) -> Result<GatewayResponse> {
        let span = tracing::info_span!(
            "gateway",
            call = "RegisterPosDevice",
            device_id = %payload.device_id,
            merchant_id = %payload.merchant_id,
        );
        self.dispatch(Endpoint::CreateKey, payload)
            .instrument(span)
            .await
    }

    pub async fn process_authorisation(
        &self,
        payload: &AuthorisationPayload,
    ) -> Result<GatewayResponse> {
        let span = tracing::info_span!(
            "gateway",
            call = "ProcessAuthorisation",
            device_id = %payload.device_id,
            merchant_id = %payload.merchant_id,
        );
        self.dispatch(Endpoint::ProcessAuthorisation, payload)
            .instrument(span)
            .await
    }

    pub async fn process_sales_adjustment(
        &self,
        payload: &SalesAdjustmentPayload,
    ) -> Result<GatewayResponse> {
        let span = tracing::info_span!(
            "gateway",
            call = "ProcessSalesAdjustment",
            device_id = %payload.device_id,
            merchant_id = %payload.merchant_id,
        );
        self.dispatch(Endpoint::ProcessSalesAdjustment, payload)
            .instrument(span)
            .await
    }

    async fn dispatch<P: Serialize>(&self, endpoint: Endpoint, payload: &P) -> Result<GatewayResponse> {
        let body = serde_json::to_value(payload)?;
        tracing::debug!(%endpoint, %body, "posting to gateway");

        let reply = self.transport.post(endpoint, &body).await?;
        tracing::debug!(
            status = reply.status,
            body = %String::from_utf8_lossy(&reply.body),
            "gateway replied"
        );

        serde_json::from_slice(&reply.body).map_err(|e| GatewayError::MalformedResponse {
            endpoint: endpoint.to_string(),
            status: reply.status,
            reason: e.to_string(),
        })
    }
}
