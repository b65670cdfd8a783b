mod common;

use common::*;
use vendproxy::application::flow::FlowResult;
use vendproxy::domain::outcome::SaleStatus;
use vendproxy::domain::payload::PayloadKind;
use vendproxy::domain::payment::PaymentContext;
use vendproxy::domain::ports::{Endpoint, SessionStore, TerminalRegistry};
use vendproxy::domain::response_code::TxnStatus;
use vendproxy::error::GatewayError;
use vendproxy::interfaces::cli::{Command, execute};

fn sale(amount: &str) -> PaymentContext {
    PaymentContext::from_request(ORIGIN, REGISTER_ID, amount)
        .unwrap()
        .with_sale_id("sale-0001")
        .with_purchase_code("123456")
}

fn registration_reply(key: &str) -> vendproxy::domain::payload::GatewayResponse {
    let mut reply = response("SCRK01", "");
    reply.key = key.to_string();
    reply
}

#[tokio::test]
async fn test_registration_binds_terminal() {
    let h = harness();
    h.transport
        .reply_signed(registration_reply(TERMINAL_KEY), DEVICE_TOKEN);

    let outcome = h
        .controller
        .register_terminal(ORIGIN, REGISTER_ID, MERCHANT_ID, DEVICE_TOKEN)
        .await
        .unwrap();
    assert!(outcome.is_approved());

    let binding = h.registry.lookup(ORIGIN, REGISTER_ID).await.unwrap();
    assert_eq!(binding.signing_key().expose(), TERMINAL_KEY);
    assert_eq!(binding.gateway_merchant_id, MERCHANT_ID);
    assert!(binding.gateway_device_id.starts_with("01SUCCES-"));

    let requests = h.transport.requests();
    assert_eq!(requests.len(), 1);
    let (endpoint, body) = &requests[0];
    assert_eq!(*endpoint, Endpoint::CreateKey);
    assert_eq!(body["x_device_id"], binding.gateway_device_id.as_str());
    assert_eq!(body["x_firmware_version"], "version 1.1");
    assert_eq!(body["x_operator_id"], "unknown");
    assert_eq!(body["x_pos_vendor"], "Vend-Proxy");
    assert!(request_is_signed(PayloadKind::Registration, body, DEVICE_TOKEN));
}

#[tokio::test]
async fn test_registration_with_forged_reply_is_rejected() {
    let h = harness();
    h.transport
        .reply_signed(registration_reply(TERMINAL_KEY), "not-the-token");

    let err = h
        .controller
        .register_terminal(ORIGIN, REGISTER_ID, MERCHANT_ID, DEVICE_TOKEN)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::SignatureMismatch));
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn test_rejected_registration_writes_nothing() {
    let h = harness();
    h.transport
        .reply_signed(response("FCRK01", ""), DEVICE_TOKEN);

    let outcome = h
        .controller
        .register_terminal(ORIGIN, REGISTER_ID, MERCHANT_ID, DEVICE_TOKEN)
        .await
        .unwrap();
    assert_eq!(outcome.txn_status, TxnStatus::Failed);
    assert!(!outcome.is_approved());
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn test_registering_a_bound_terminal_keeps_first_key() {
    let h = harness();
    h.registry.save("test", &bound_terminal()).await.unwrap();
    h.transport
        .reply_signed(registration_reply("another-key"), DEVICE_TOKEN);

    let err = h
        .controller
        .register_terminal(ORIGIN, REGISTER_ID, MERCHANT_ID, DEVICE_TOKEN)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::DuplicateBinding { .. }));

    let binding = h.registry.lookup(ORIGIN, REGISTER_ID).await.unwrap();
    assert_eq!(binding.signing_key().expose(), TERMINAL_KEY);
}

#[tokio::test]
async fn test_unbound_payment_parks_context() {
    let h = harness();

    let result = h.controller.pay("sess-1", sale("44.00")).await.unwrap();
    assert_eq!(result, FlowResult::NeedsRegistration);
    assert!(h.transport.requests().is_empty());

    let parked = h.sessions.get("sess-1").await.unwrap().unwrap();
    assert_eq!(parked.amount, "4400");
    assert_eq!(parked.sale_id, "sale-0001");
}

#[tokio::test]
async fn test_register_then_pay_on_same_session() {
    let h = harness();
    h.controller.pay("sess-1", sale("44.00")).await.unwrap();

    h.transport
        .reply_signed(registration_reply(TERMINAL_KEY), DEVICE_TOKEN);
    let registered = h
        .controller
        .resume_registration("sess-1", MERCHANT_ID, DEVICE_TOKEN)
        .await
        .unwrap();
    assert!(registered.is_approved());

    h.transport
        .reply_signed(response("SPRA01", "52011913"), TERMINAL_KEY);
    let parked = h.sessions.get("sess-1").await.unwrap().unwrap();
    let result = h.controller.pay("sess-1", parked).await.unwrap();

    let FlowResult::Completed(outcome) = result else {
        panic!("expected a completed payment, got {result:?}");
    };
    assert_eq!(outcome.sale_status, SaleStatus::Accepted);
    assert_eq!(outcome.purchase_number.as_deref(), Some("52011913"));
    assert_eq!(outcome.amount, "4400");
    assert!(h.sessions.get("sess-1").await.unwrap().is_none());

    let requests = h.transport.requests();
    let (endpoint, body) = requests.last().unwrap();
    assert_eq!(*endpoint, Endpoint::ProcessAuthorisation);
    assert_eq!(body["x_finance_amount"], "4400");
    assert_eq!(body["x_purchase_amount"], "4400");
    assert_eq!(body["x_pos_transaction_ref"], "sale-0001");
    assert_eq!(body["x_pre_approval_code"], "123456");
    assert_eq!(body["x_operator_id"], "Vend");
    assert_eq!(body["x_firmware_version"], "vend_integration_v0.0.1");
    assert!(request_is_signed(PayloadKind::Authorisation, body, TERMINAL_KEY));
}

#[tokio::test]
async fn test_resume_without_context() {
    let h = harness();
    let err = h
        .controller
        .resume_registration("missing", MERCHANT_ID, DEVICE_TOKEN)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::SessionContextMissing(_)));
}

#[tokio::test]
async fn test_failed_session_registration_names_parked_register() {
    let h = harness();
    h.controller.pay("sess-1", sale("44.00")).await.unwrap();
    h.transport
        .reply_signed(registration_reply(TERMINAL_KEY), "not-the-token");

    let command = Command::Register {
        merchant_id: MERCHANT_ID.to_string(),
        device_token: DEVICE_TOKEN.to_string(),
        session_id: Some("sess-1".to_string()),
        origin: None,
        register_id: None,
    };
    let response = execute(&h.controller, command).await;
    assert_eq!(response.register_id, REGISTER_ID);
    assert_eq!(response.status, Some(SaleStatus::Failed));
    assert!(h.registry.is_empty().await);
    assert!(h.sessions.get("sess-1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_session_registration_without_parked_context() {
    let h = harness();
    let command = Command::Register {
        merchant_id: MERCHANT_ID.to_string(),
        device_token: DEVICE_TOKEN.to_string(),
        session_id: Some("missing".to_string()),
        origin: None,
        register_id: None,
    };
    let response = execute(&h.controller, command).await;
    assert_eq!(response.status, Some(SaleStatus::Failed));
    assert!(response.register_id.is_empty());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn test_declined_payment() {
    let h = harness();
    h.registry.save("test", &bound_terminal()).await.unwrap();
    h.transport
        .reply_signed(response("FPRA21", "52011913"), TERMINAL_KEY);

    let outcome = h
        .controller
        .authorize(&sale("44.00"), &bound_terminal())
        .await
        .unwrap();
    assert_eq!(outcome.sale_status, SaleStatus::Declined);
    assert_eq!(outcome.purchase_number, None);
}

#[tokio::test]
async fn test_tampered_authorisation_reply() {
    let h = harness();
    let mut reply = response("SPRA01", "52011913");
    reply.signature = vendproxy::domain::signature::sign(&reply, TERMINAL_KEY).unwrap();
    reply.purchase_number = "99999999".to_string();
    h.transport
        .reply_raw(200, serde_json::to_vec(&reply).unwrap());

    let err = h
        .controller
        .authorize(&sale("44.00"), &bound_terminal())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::SignatureMismatch));
}

#[tokio::test]
async fn test_unknown_code_falls_back_to_failure() {
    let h = harness();
    h.transport
        .reply_signed(response("ZZZZ99", ""), TERMINAL_KEY);

    let outcome = h
        .controller
        .authorize(&sale("44.00"), &bound_terminal())
        .await
        .unwrap();
    assert_eq!(outcome.txn_status, TxnStatus::Failed);
    assert!(outcome.log_message.contains("ZZZZ99"));
}

#[tokio::test]
async fn test_gateway_timeout() {
    let h = harness();
    h.transport.fail(true);

    let err = h
        .controller
        .authorize(&sale("44.00"), &bound_terminal())
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_malformed_reply() {
    let h = harness();
    h.transport.reply_raw(502, "<html>Bad Gateway</html>");

    let err = h
        .controller
        .authorize(&sale("44.00"), &bound_terminal())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GatewayError::MalformedResponse { status: 502, .. }
    ));
}

#[tokio::test]
async fn test_refund_strips_sign() {
    let h = harness();
    h.registry.save("test", &bound_terminal()).await.unwrap();
    h.transport
        .reply_signed(response("SPSA01", ""), TERMINAL_KEY);

    let result = h
        .controller
        .refund("sess-2", sale("-12.50"), " 52011913 ")
        .await
        .unwrap();
    let FlowResult::Completed(outcome) = result else {
        panic!("expected a completed refund, got {result:?}");
    };
    assert_eq!(outcome.sale_status, SaleStatus::Accepted);
    assert_eq!(outcome.amount, "0");

    let requests = h.transport.requests();
    let (endpoint, body) = &requests[0];
    assert_eq!(*endpoint, Endpoint::ProcessSalesAdjustment);
    assert_eq!(body["x_amount"], "1250");
    assert_eq!(body["x_purchase_ref"], "52011913");
    assert!(!body["x_pos_transaction_ref"].as_str().unwrap().is_empty());
    assert!(request_is_signed(PayloadKind::SalesAdjustment, body, TERMINAL_KEY));
}
