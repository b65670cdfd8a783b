use super::response::ProxyResponse;
use crate::application::flow::PaymentFlowController;
use crate::config::HostConfig;
use crate::domain::payment::PaymentContext;
use crate::logging::LogFormat;
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "vendproxy", author, version, about = "Bridges POS payment requests to the gateway", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub host: HostArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Host settings. Each one overrides the config file when given.
#[derive(Args, Debug, Default)]
pub struct HostArgs {
    /// JSON config file
    #[arg(long, env = "VENDPROXY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Gateway API root URL
    #[arg(long, env = "VENDPROXY_GATEWAY_URL", global = true)]
    pub gateway_url: Option<String>,

    /// Seconds to wait for the gateway before giving up
    #[arg(long, env = "VENDPROXY_GATEWAY_TIMEOUT", global = true)]
    pub gateway_timeout_secs: Option<u64>,

    /// Terminal registry database URL
    #[arg(long, env = "VENDPROXY_DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Path to persistent session storage (optional). If provided, uses RocksDB.
    #[arg(long, env = "VENDPROXY_SESSION_PATH", global = true)]
    pub session_path: Option<PathBuf>,

    #[arg(long, env = "VENDPROXY_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    #[arg(long, value_enum, env = "VENDPROXY_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,
}

impl HostArgs {
    pub fn apply(&self, config: &mut HostConfig) {
        if let Some(url) = &self.gateway_url {
            config.gateway.url = url.clone();
        }
        if let Some(secs) = self.gateway_timeout_secs {
            config.gateway.timeout_secs = secs;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(path) = &self.session_path {
            config.session.path = Some(path.clone());
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct TerminalArgs {
    /// Origin domain of the POS account
    #[arg(long)]
    pub origin: String,

    #[arg(long)]
    pub register_id: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Charge a sale through the register's gateway terminal
    Pay {
        #[command(flatten)]
        terminal: TerminalArgs,
        /// Amount in major units, e.g. 44.00
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        #[arg(long, default_value = "")]
        sale_id: String,
        /// Pre-approval code the customer received from the gateway
        #[arg(long, default_value = "")]
        payment_code: String,
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Refund an earlier purchase
    Refund {
        #[command(flatten)]
        terminal: TerminalArgs,
        #[arg(long, allow_hyphen_values = true)]
        amount: String,
        #[arg(long, default_value = "")]
        sale_id: String,
        /// Gateway purchase number being refunded
        #[arg(long)]
        purchase_number: String,
        #[arg(long)]
        session_id: Option<String>,
    },
    /// Register a terminal with the gateway and bind it to a POS register
    #[command(group(ArgGroup::new("target").required(true).args(["session_id", "origin"])))]
    Register {
        #[arg(long)]
        merchant_id: String,
        #[arg(long)]
        device_token: String,
        /// Session holding a parked payment
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long, requires = "register_id")]
        origin: Option<String>,
        #[arg(long)]
        register_id: Option<String>,
    },
    /// Show the binding for a register
    Lookup {
        #[command(flatten)]
        terminal: TerminalArgs,
    },
}

/// Runs one command against the controller. Failures become customer-safe
/// responses rather than errors.
pub async fn execute(controller: &PaymentFlowController, command: Command) -> ProxyResponse {
    match command {
        Command::Pay {
            terminal,
            amount,
            sale_id,
            payment_code,
            session_id,
        } => {
            let session_id = session_id.unwrap_or_else(new_session_id);
            let context = match PaymentContext::from_request(
                &terminal.origin,
                &terminal.register_id,
                &amount,
            ) {
                Ok(context) => context
                    .with_sale_id(sale_id)
                    .with_purchase_code(payment_code),
                Err(err) => return ProxyResponse::from_error(&err, &terminal.register_id),
            };
            match controller.pay(&session_id, context).await {
                Ok(result) => ProxyResponse::from_flow(result, &terminal.register_id, &session_id),
                Err(err) => ProxyResponse::from_error(&err, &terminal.register_id),
            }
        }
        Command::Refund {
            terminal,
            amount,
            sale_id,
            purchase_number,
            session_id,
        } => {
            let session_id = session_id.unwrap_or_else(new_session_id);
            let context = match PaymentContext::from_request(
                &terminal.origin,
                &terminal.register_id,
                &amount,
            ) {
                Ok(context) => context.with_sale_id(sale_id),
                Err(err) => return ProxyResponse::from_error(&err, &terminal.register_id),
            };
            match controller
                .refund(&session_id, context, &purchase_number)
                .await
            {
                Ok(result) => ProxyResponse::from_flow(result, &terminal.register_id, &session_id),
                Err(err) => ProxyResponse::from_error(&err, &terminal.register_id),
            }
        }
        Command::Register {
            merchant_id,
            device_token,
            session_id,
            origin,
            register_id,
        } => {
            let (register_id, result) = match (session_id, origin, register_id) {
                (Some(session_id), _, _) => match controller.parked_context(&session_id).await {
                    Ok(context) => {
                        let result = controller
                            .register_terminal(
                                &context.origin_domain,
                                &context.pos_register_id,
                                &merchant_id,
                                &device_token,
                            )
                            .await;
                        (context.pos_register_id, result)
                    }
                    Err(err) => (String::new(), Err(err)),
                },
                (None, Some(origin), Some(register_id)) => {
                    let result = controller
                        .register_terminal(&origin, &register_id, &merchant_id, &device_token)
                        .await;
                    (register_id, result)
                }
                (None, _, register_id) => (
                    register_id.unwrap_or_default(),
                    Err(crate::error::GatewayError::SessionContextMissing(
                        "no session or terminal given".to_string(),
                    )),
                ),
            };
            match result {
                Ok(outcome) => ProxyResponse::from_outcome(outcome),
                Err(err) => ProxyResponse::from_error(&err, &register_id),
            }
        }
        Command::Lookup { terminal } => {
            match controller
                .lookup_binding(&terminal.origin, &terminal.register_id)
                .await
            {
                Ok(binding) => ProxyResponse::bound(&binding),
                Err(err) if err.needs_registration() => {
                    ProxyResponse::needs_registration(&terminal.register_id, None)
                }
                Err(err) => ProxyResponse::from_error(&err, &terminal.register_id),
            }
        }
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
