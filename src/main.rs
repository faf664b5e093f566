use llmlink::{
    logger, LlmSession, ParameterKind, Preferences, PromptStore, StreamEvent,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenv::dotenv() {
        Ok(_) => log::info!("✅ .env file loaded successfully"),
        Err(_) => log::warn!("⚠️  No .env file found, using system environment variables"),
    }

    logger::init_with_config(
        logger::LoggerConfig::development().with_level(logger::LogLevel::Debug),
    )?;

    let mut prefs = Preferences::load_default()?;
    if let Ok(url) = std::env::var("LLM_SERVER_URL") {
        prefs.set_server_url(url)?;
    }
    logger::log_startup_info("llmlink", env!("CARGO_PKG_VERSION"), prefs.server_url());

    let mut session = LlmSession::with_preferences(prefs)?;

    log::info!("🔄 Pinging server...");
    match session.ping().await {
        Ok(true) => log::info!("✅ Server is reachable"),
        Ok(false) => log::warn!("⚠️  Server answered the ping with a non-success status"),
        Err(e) => {
            log::error!("❌ Server unreachable: {}", e);
            log::info!("💡 Set LLM_SERVER_URL or edit the preferences file and retry");
            return Ok(());
        }
    }

    log::info!("📚 Fetching available models...");
    match session.refresh_models().await {
        Ok(models) => {
            for model in models {
                log::info!("   {}", model);
            }
        }
        Err(e) => log::error!("❌ Failed to fetch models: {}", e),
    }

    log::info!("⚙️  Fetching loading-parameter schema...");
    if let Err(e) = session.fetch_loading_parameters().await {
        log::error!("❌ Failed to fetch loading parameters: {}", e);
    }

    log::info!("🔍 Checking model status...");
    if let Err(e) = session.refresh_status().await {
        log::error!("❌ Failed to check status: {}", e);
    }

    if !session.status().loaded {
        if let Some(model) = session.available_models().first().cloned() {
            log::info!("🧪 Loading model: {}", model);
            match session.load_model(&model).await {
                Ok(result) => {
                    log::info!("✅ {}", result.message);
                    if let Some(n_ctx) = result.context_length {
                        log::info!("🔢 Context length: {}", n_ctx);
                    }
                }
                Err(e) => log::error!("❌ Model load failed: {}", e),
            }
        } else {
            log::warn!("⚠️  No models available to load");
        }
    }

    if session.status().loaded {
        let model = session
            .status()
            .current_model
            .clone()
            .unwrap_or_default();

        log::info!("⚙️  Fetching inference-parameter schema for {}...", model);
        if let Err(e) = session.fetch_inference_parameters(Some(&model)).await {
            log::error!("❌ Failed to fetch inference parameters: {}", e);
        }
        let changed = session
            .parameters()
            .changed_parameter_names(ParameterKind::Inference);
        log::info!("🎛️  {} inference parameters modified", changed.len());

        let prompt = "Write a haiku about technology";
        log::info!("🔤 Counting tokens for the demo prompt...");
        match session.update_context_usage(prompt).await {
            Ok(Some(usage)) => log::info!(
                "🔢 {} / {} tokens used ({:.1}%)",
                usage.token_count,
                usage.max_context,
                usage.usage_percentage
            ),
            Ok(None) => log::info!("🔢 Server reported no context usage"),
            Err(e) => log::warn!("⚠️  Token count failed: {}", e),
        }

        log::info!("🌊 Streaming query: {}", prompt);
        let query_timer = logger::timer("streaming query");
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        session.send_prompt(prompt, "", move |event| {
            let _ = tx.send(event);
        })?;

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Generating(partial) => {
                    log::debug!("📝 {} chars so far", partial.len());
                }
                StreamEvent::Complete(response) => {
                    log::info!("✅ Response: {}", response);
                    break;
                }
                StreamEvent::Error(message) => {
                    log::error!("❌ Streaming failed: {}", message);
                    break;
                }
                StreamEvent::Queued => {}
            }
        }
        query_timer.stop();
    }

    log::info!("💾 Exercising the saved-prompt store...");
    let store = PromptStore::open_default()?;
    let saved = store.create("haiku", "Write a haiku about technology").await?;
    log::info!("✅ Saved prompt #{} ({})", saved.id, saved.name);
    log::info!("📋 {} prompts stored", store.count().await?);
    for prompt in store.search("haiku").await? {
        log::info!("   #{} {} (updated {})", prompt.id, prompt.name, prompt.updated_at);
    }
    store.delete(saved.id).await?;

    log::info!("🏁 Done");
    Ok(())
}
