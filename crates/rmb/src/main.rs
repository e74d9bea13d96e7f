use std::sync::Arc;

use tracing::{error, info};

use rmb_core::{
    client::RtmClient,
    config::Config,
    domain::{Channel, User},
    ports::EventHandler,
};
use rmb_slack::{HttpApi, WsConnector};

/// Default bot behavior: log every inbound message and answer direct
/// mentions via the chat API.
struct MentionResponder {
    client: Arc<RtmClient>,
}

#[async_trait::async_trait]
impl EventHandler for MentionResponder {
    async fn on_message(&self, channel: &Channel, user: &User, text: &str, mentioned: bool) {
        info!("#{} <{}> {}", channel.name, user.name, text);
        if !mentioned {
            return;
        }

        let reply = format!("<@{}> you rang?", user.id);
        if let Err(e) = self.client.post_message(&channel.id, &reply, None).await {
            // Chat sends are fire-and-forget; log and move on.
            error!("reply to {} failed: {e}", channel.id);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rmb_core::logging::init("rmb")?;

    let cfg = Arc::new(Config::load()?);
    let api = Arc::new(HttpApi::new(cfg.api_base_url.clone(), cfg.api_token.clone()));
    let client = Arc::new(RtmClient::new(cfg, api, Arc::new(WsConnector)));

    client
        .register_handler(Arc::new(MentionResponder {
            client: client.clone(),
        }))
        .await;

    client.connect().await?;
    info!("press ctrl-c to stop");

    tokio::signal::ctrl_c().await?;
    client.disconnect().await;

    Ok(())
}
