use super::gateway::GatewayClient;
use crate::domain::outcome::Outcome;
use crate::domain::payload::{AuthorisationPayload, RegistrationPayload, SalesAdjustmentPayload};
use crate::domain::payment::PaymentContext;
use crate::domain::ports::{SessionStoreBox, TerminalRegistryBox};
use crate::domain::response_code::{OperationType, classify};
use crate::domain::signature::{authenticate, sign};
use crate::domain::terminal::{SigningKey, TerminalBinding};
use crate::error::{GatewayError, Result};
use uuid::Uuid;

/// Stages of a payment, refund, or registration flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Init,
    NeedsRegistration,
    Bound,
    Dispatched,
    Completed,
    Failed,
}

impl FlowState {
    pub fn can_advance_to(self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Init, NeedsRegistration | Bound | Failed)
                | (NeedsRegistration, Dispatched | Failed)
                | (Bound, Dispatched | Failed)
                | (Dispatched, Completed | Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Completed | FlowState::Failed)
    }
}

/// Tracks one flow instance through its states.
#[derive(Debug)]
pub struct Flow {
    trail: Vec<FlowState>,
}

impl Flow {
    pub fn new() -> Self {
        Self::starting_at(FlowState::Init)
    }

    pub fn starting_at(state: FlowState) -> Self {
        Self { trail: vec![state] }
    }

    pub fn state(&self) -> FlowState {
        self.trail.last().copied().unwrap_or(FlowState::Init)
    }

    /// Every state visited so far, oldest first.
    pub fn trail(&self) -> &[FlowState] {
        &self.trail
    }

    pub fn advance(&mut self, next: FlowState) {
        let current = self.state();
        debug_assert!(
            current.can_advance_to(next),
            "illegal flow transition {current:?} -> {next:?}"
        );
        tracing::debug!(from = ?current, to = ?next, "flow transition");
        self.trail.push(next);
    }

    /// Moves to `Failed` if `result` is an error and the flow is still open.
    pub fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() && !self.state().is_terminal() {
            self.advance(FlowState::Failed);
        }
        result
    }
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

/// What a POS-originated flow ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowResult {
    /// The terminal is unbound; the context was saved to the session.
    NeedsRegistration,
    Completed(Outcome),
}

/// Fixed identifiers written into outgoing payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSettings {
    pub operator_id: String,
    pub firmware_version: String,
    pub registration_operator_id: String,
    pub pos_vendor: String,
    /// Recorded as the creator of new bindings.
    pub created_by: String,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            operator_id: "Vend".to_string(),
            firmware_version: "vend_integration_v0.0.1".to_string(),
            registration_operator_id: "unknown".to_string(),
            pos_vendor: "Vend-Proxy".to_string(),
            created_by: "vend-proxy".to_string(),
        }
    }
}

/// Orchestrates terminal registration, payments, and refunds.
///
/// Owns its collaborators; they are built once at start-up and passed in.
pub struct PaymentFlowController {
    registry: TerminalRegistryBox,
    sessions: SessionStoreBox,
    gateway: GatewayClient,
    settings: FlowSettings,
}

impl PaymentFlowController {
    pub fn new(
        registry: TerminalRegistryBox,
        sessions: SessionStoreBox,
        gateway: GatewayClient,
    ) -> Self {
        Self {
            registry,
            sessions,
            gateway,
            settings: FlowSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: FlowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn lookup_binding(
        &self,
        origin_domain: &str,
        pos_register_id: &str,
    ) -> Result<TerminalBinding> {
        self.registry.lookup(origin_domain, pos_register_id).await
    }

    /// The payment context waiting in `session_id` for its register to be
    /// registered.
    pub async fn parked_context(&self, session_id: &str) -> Result<PaymentContext> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| GatewayError::SessionContextMissing(session_id.to_string()))
    }

    /// Payment entry point. Authorises against the bound terminal, or parks the
    /// context in the session when the terminal still needs registering.
    #[tracing::instrument(skip(self, context), fields(origin = %context.origin_domain, register_id = %context.pos_register_id))]
    pub async fn pay(&self, session_id: &str, context: PaymentContext) -> Result<FlowResult> {
        let mut flow = Flow::new();
        let Some(binding) = self.begin(&mut flow, session_id, &context).await? else {
            return Ok(FlowResult::NeedsRegistration);
        };
        tracing::info!(device_id = %binding.gateway_device_id, "processing payment");

        let result = self.run_authorisation(&mut flow, &context, &binding).await;
        let outcome = flow.settle(result)?;
        self.discard_context(session_id).await;
        Ok(FlowResult::Completed(outcome))
    }

    /// Refund entry point; `purchase_ref` is the gateway purchase number being
    /// refunded.
    #[tracing::instrument(skip(self, context), fields(origin = %context.origin_domain, register_id = %context.pos_register_id))]
    pub async fn refund(
        &self,
        session_id: &str,
        context: PaymentContext,
        purchase_ref: &str,
    ) -> Result<FlowResult> {
        let mut flow = Flow::new();
        let Some(binding) = self.begin(&mut flow, session_id, &context).await? else {
            return Ok(FlowResult::NeedsRegistration);
        };
        tracing::info!(device_id = %binding.gateway_device_id, "processing refund");

        let result = self
            .run_adjustment(&mut flow, &context, &binding, purchase_ref)
            .await;
        let outcome = flow.settle(result)?;
        self.discard_context(session_id).await;
        Ok(FlowResult::Completed(outcome))
    }

    /// Registers the terminal whose context was parked under `session_id`.
    pub async fn resume_registration(
        &self,
        session_id: &str,
        merchant_id: &str,
        device_token: &str,
    ) -> Result<Outcome> {
        let context = self.parked_context(session_id).await?;
        self.register_terminal(
            &context.origin_domain,
            &context.pos_register_id,
            merchant_id,
            device_token,
        )
        .await
    }

    /// Registers a POS register with the gateway and binds it.
    ///
    /// The request is signed with the raw device token; no terminal key exists
    /// yet. A binding is only written for an authentic, approved reply.
    #[tracing::instrument(skip(self, device_token))]
    pub async fn register_terminal(
        &self,
        origin_domain: &str,
        pos_register_id: &str,
        merchant_id: &str,
        device_token: &str,
    ) -> Result<Outcome> {
        let mut flow = Flow::starting_at(FlowState::NeedsRegistration);
        let result = self
            .run_registration(
                &mut flow,
                origin_domain,
                pos_register_id,
                merchant_id,
                device_token,
            )
            .await;
        flow.settle(result)
    }

    /// Authorises a purchase against a bound terminal.
    pub async fn authorize(
        &self,
        context: &PaymentContext,
        binding: &TerminalBinding,
    ) -> Result<Outcome> {
        let mut flow = Flow::starting_at(FlowState::Bound);
        let result = self.run_authorisation(&mut flow, context, binding).await;
        flow.settle(result)
    }

    /// Refunds against an earlier purchase on a bound terminal.
    pub async fn adjust(
        &self,
        context: &PaymentContext,
        binding: &TerminalBinding,
        purchase_ref: &str,
    ) -> Result<Outcome> {
        let mut flow = Flow::starting_at(FlowState::Bound);
        let result = self
            .run_adjustment(&mut flow, context, binding, purchase_ref)
            .await;
        flow.settle(result)
    }

    async fn begin(
        &self,
        flow: &mut Flow,
        session_id: &str,
        context: &PaymentContext,
    ) -> Result<Option<TerminalBinding>> {
        match self
            .registry
            .lookup(&context.origin_domain, &context.pos_register_id)
            .await
        {
            Ok(binding) => {
                flow.advance(FlowState::Bound);
                Ok(Some(binding))
            }
            Err(err) if err.needs_registration() => {
                tracing::info!(intent = ?context.intent(), "register not found, registration required");
                let parked = self.sessions.put(session_id, context).await;
                flow.settle(parked)?;
                flow.advance(FlowState::NeedsRegistration);
                Ok(None)
            }
            Err(err) => flow.settle(Err(err)),
        }
    }

    async fn run_registration(
        &self,
        flow: &mut Flow,
        origin_domain: &str,
        pos_register_id: &str,
        merchant_id: &str,
        device_token: &str,
    ) -> Result<Outcome> {
        let mut payload = RegistrationPayload {
            merchant_id: merchant_id.to_string(),
            device_id: device_id_for(device_token),
            device_token: device_token.to_string(),
            operator_id: self.settings.registration_operator_id.clone(),
            firmware_version: format!("version {}", self.gateway.version()),
            pos_vendor: self.settings.pos_vendor.clone(),
            ..Default::default()
        };
        payload.signature = sign(&payload, device_token)?;

        flow.advance(FlowState::Dispatched);
        let response = self.gateway.register_pos_device(&payload).await?;
        authenticate(&response, &response.signature, device_token)?;

        let code = classify(OperationType::Registration, &response.code);
        let outcome = Outcome::from_response(code, &response, "", pos_register_id);
        if !outcome.is_approved() {
            tracing::warn!(code = %response.code, reason = code.log_message, "registration rejected");
            flow.advance(FlowState::Failed);
            return Ok(outcome);
        }
        if response.key.is_empty() {
            return Err(GatewayError::MalformedResponse {
                endpoint: "CreateKey".to_string(),
                status: 200,
                reason: "approved registration carried no key".to_string(),
            });
        }

        let binding = TerminalBinding::new(
            origin_domain,
            pos_register_id,
            payload.device_id,
            merchant_id,
            SigningKey::new(response.key),
        );
        self.registry
            .save(&self.settings.created_by, &binding)
            .await?;
        tracing::info!(device_id = %binding.gateway_device_id, "device registered");

        flow.advance(FlowState::Completed);
        Ok(outcome)
    }

    async fn run_authorisation(
        &self,
        flow: &mut Flow,
        context: &PaymentContext,
        binding: &TerminalBinding,
    ) -> Result<Outcome> {
        let key = binding.signing_key().expose();
        let amount = context.gateway_amount();
        let mut payload = AuthorisationPayload {
            merchant_id: binding.gateway_merchant_id.clone(),
            device_id: binding.gateway_device_id.clone(),
            operator_id: self.settings.operator_id.clone(),
            firmware_version: self.settings.firmware_version.clone(),
            pos_transaction_ref: context.sale_id.clone(),
            pre_approval_code: context.purchase_code.clone(),
            finance_amount: amount.clone(),
            purchase_amount: amount.clone(),
            signature: String::new(),
        };
        payload.signature = sign(&payload, key)?;

        flow.advance(FlowState::Dispatched);
        let response = self.gateway.process_authorisation(&payload).await?;
        authenticate(&response, &response.signature, key)?;

        let code = classify(OperationType::Authorisation, &response.code);
        let outcome = Outcome::from_response(code, &response, amount, &context.pos_register_id);
        tracing::info!(status = ?outcome.sale_status, reason = code.log_message, "authorisation complete");
        flow.advance(FlowState::Completed);
        Ok(outcome)
    }

    async fn run_adjustment(
        &self,
        flow: &mut Flow,
        context: &PaymentContext,
        binding: &TerminalBinding,
        purchase_ref: &str,
    ) -> Result<Outcome> {
        let key = binding.signing_key().expose();
        let mut payload = SalesAdjustmentPayload {
            pos_transaction_ref: Uuid::new_v4().simple().to_string(),
            purchase_ref: purchase_ref.trim().to_string(),
            merchant_id: binding.gateway_merchant_id.clone(),
            amount: context.gateway_amount(),
            device_id: binding.gateway_device_id.clone(),
            operator_id: self.settings.operator_id.clone(),
            firmware_version: self.settings.firmware_version.clone(),
            ..Default::default()
        };
        payload.signature = sign(&payload, key)?;

        flow.advance(FlowState::Dispatched);
        let response = self.gateway.process_sales_adjustment(&payload).await?;
        authenticate(&response, &response.signature, key)?;

        let code = classify(OperationType::SalesAdjustment, &response.code);
        // refunds report a zero amount back to the register
        let outcome = Outcome::from_response(code, &response, "0", &context.pos_register_id);
        tracing::info!(status = ?outcome.sale_status, reason = code.log_message, "sales adjustment complete");
        flow.advance(FlowState::Completed);
        Ok(outcome)
    }

    async fn discard_context(&self, session_id: &str) {
        if let Err(err) = self.sessions.remove(session_id).await {
            tracing::warn!(%err, session_id, "unable to discard payment context");
        }
    }
}

/// Device IDs are the token plus a short unique suffix.
fn device_id_for(device_token: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{device_token}-{}", &suffix[..10])
}
