use anyhow::{Context, Result};
use clap::Parser;
use shopbot_actions::actions::{self, ACTION_NAMES, ActionContext};
use shopbot_actions::config::Config;
use shopbot_actions::tracker::ActionRequest;
use shopbot_actions::{LlmOverride, llm, safety, server};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

fn make_llm_override(provider: Option<String>, model: Option<String>) -> Option<LlmOverride> {
    if provider.is_none() && model.is_none() {
        return None;
    }
    let provider = provider
        .map(|p| match p.as_str() {
            "openai" => llm::Provider::OpenAi,
            _ => llm::Provider::Gemini,
        })
        .unwrap_or_default();
    let model = model.unwrap_or_else(|| match &provider {
        llm::Provider::OpenAi => "gpt-4o-mini".into(),
        llm::Provider::Gemini => "gemini-1.5-flash".into(),
    });
    Some(LlmOverride { provider, model })
}

/// Load config (defaults when the file is missing), apply CLI overrides, validate.
fn load_config(path: &Path, llm_override: Option<LlmOverride>) -> Result<Config> {
    let mut cfg = Config::load_or_default(path)?;
    if let Some(o) = llm_override {
        o.apply(&mut cfg.llm);
    }
    cfg.validate()?;
    Ok(cfg)
}

#[derive(Parser)]
#[command(
    name = "shopbot-actions",
    about = "Custom action server for the shop assistant: backend lookups, reply formatting, AI answer screening"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Serve the action webhook for the dialogue engine
    Serve {
        /// Path to config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Listen address override, e.g. 0.0.0.0:5055
        #[arg(long)]
        bind: Option<String>,

        /// LLM provider override: gemini, openai
        #[arg(long)]
        provider: Option<String>,

        /// LLM model override
        #[arg(long)]
        model: Option<String>,
    },

    /// Execute one action from a webhook request JSON file and print the response
    Run {
        /// Path to an action request (`next_action` + `tracker`)
        request: PathBuf,

        /// Path to config file
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// LLM provider override: gemini, openai
        #[arg(long)]
        provider: Option<String>,

        /// LLM model override
        #[arg(long)]
        model: Option<String>,
    },

    /// Screen a candidate AI reply with the content filter
    Check {
        /// Text to screen
        text: String,
    },

    /// List registered action names
    Actions,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("shopbot_actions=info")),
        )
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            bind,
            provider,
            model,
        } => {
            let cfg = load_config(&config, make_llm_override(provider, model))?;
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            let ctx = Arc::new(ActionContext::from_config(&cfg)?);
            server::serve(&bind, ctx).await?;
            Ok(())
        }
        Command::Run {
            request,
            config,
            provider,
            model,
        } => {
            let cfg = load_config(&config, make_llm_override(provider, model))?;
            let raw = std::fs::read_to_string(&request)
                .with_context(|| format!("reading {}", request.display()))?;
            let req: ActionRequest = serde_json::from_str(&raw)?;
            let ctx = ActionContext::from_config(&cfg)?;
            let response = actions::run(&req.next_action, &req.tracker, &ctx).await?;
            let json = serde_json::to_string_pretty(&response)?;
            println!("{json}");
            Ok(())
        }
        Command::Check { text } => {
            match safety::find_violation(&text) {
                Some(v) => {
                    info!(topic = %v.topic, matched = %v.matched, "reply would be blocked");
                    println!("BLOCKED ({}): '{}'", v.topic, v.matched);
                    println!("Replacement: {}", safety::SAFE_FALLBACK);
                }
                None => println!("OK"),
            }
            Ok(())
        }
        Command::Actions => {
            for name in ACTION_NAMES {
                println!("{name}");
            }
            Ok(())
        }
    }
}
