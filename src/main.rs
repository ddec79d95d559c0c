use clap::Parser;

use voicechat_gateway::config::{ConfigValidator, GatewayConfig};
use voicechat_gateway::logging::{self, LoggingConfig};
use voicechat_gateway::server;

#[derive(Parser, Debug)]
#[command(name = "voicechat-gateway")]
#[command(about = "Realtime chat gateway that streams model output with reasoning spans removed")]
#[command(long_about = r#"
Realtime chat gateway that sits between a chat frontend and one
OpenAI-compatible model backend (LM Studio, Ollama, ...). Model output is
streamed through a reasoning-span filter so internal <think>...</think>
deliberation never reaches the consumer, and a bounded conversation history
is kept for context.

Examples:
  # LM Studio on the default port
  voicechat-gateway --upstream-url http://127.0.0.1:1234

  # Pin a model and restrict CORS
  voicechat-gateway --upstream-url http://127.0.0.1:11434 \
    --model qwen3:0.6b \
    --cors-allowed-origins http://localhost:3000
"#)]
struct CliArgs {
    /// Host address to bind the gateway server
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the gateway server
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Base URL of the OpenAI-compatible backend (without /v1)
    #[arg(long, default_value = "http://127.0.0.1:1234")]
    upstream_url: String,

    /// Model name sent upstream (omit to use whatever the backend loaded)
    #[arg(long)]
    model: Option<String>,

    /// Token budget per generated reply
    #[arg(long, default_value_t = 256)]
    max_tokens: u32,

    /// Timeout in seconds for non-streaming upstream requests
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Maximum retained conversation turns
    #[arg(long, default_value_t = 20)]
    history_max_turns: usize,

    /// Number of trailing history messages sent as model context
    #[arg(long, default_value_t = 8)]
    context_window: usize,

    /// Marker that opens a reasoning span in model output
    #[arg(long, default_value = "<think>")]
    reasoning_open_tag: String,

    /// Marker that closes a reasoning span in model output
    #[arg(long, default_value = "</think>")]
    reasoning_close_tag: String,

    /// System prompt prepended to every upstream request
    #[arg(long)]
    system_prompt: Option<String>,

    /// CORS allowed origins (empty = allow any origin)
    #[arg(long, num_args = 0..)]
    cors_allowed_origins: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for rolling log files (omit for stdout only)
    #[arg(long)]
    log_dir: Option<String>,
}

impl CliArgs {
    fn to_gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            host: self.host.clone(),
            port: self.port,
            upstream_url: self.upstream_url.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            request_timeout_secs: self.request_timeout_secs,
            history_max_turns: self.history_max_turns,
            context_window: self.context_window,
            reasoning_open_tag: self.reasoning_open_tag.clone(),
            reasoning_close_tag: self.reasoning_close_tag.clone(),
            system_prompt: self.system_prompt.clone(),
            cors_allowed_origins: self.cors_allowed_origins.clone(),
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = args.to_gateway_config();
    ConfigValidator::validate(&config)?;

    let _log_guard = logging::init_logging(LoggingConfig {
        level: logging::parse_level(config.log_level.as_deref()),
        log_dir: config.log_dir.clone(),
        ..Default::default()
    });

    server::startup(config).await
}
