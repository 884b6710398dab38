mod settings;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conversation_core::{
    GeneratePort, PipelineOrchestrator, RecognizePort, SessionConfig, SessionStore, SynthesizePort,
};
use llm::{ChatOptions, Client as LlmClient, GeminiGenerate, Provider};
use settings::Settings;
use stt::SarvamStt;
use tts::SarvamTts;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const TURN_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "voxloop=info,agent=info,conversation_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Fail fast on missing credentials, before any session exists.
    let settings = Settings::from_env()?;
    let voice_enabled = settings.sarvam_api_key.is_some();
    info!("starting voxloop (model {})", settings.gemini_model);
    if !voice_enabled {
        info!("SARVAM_API_KEY not set, running text-only");
    }

    let store = Arc::new(SessionStore::new(SessionConfig {
        max_history_turns: settings.max_history_turns,
        session_timeout: Duration::from_secs(settings.session_timeout_secs),
    }));

    let sarvam_key = settings.sarvam_api_key.clone().unwrap_or_default();
    let recognizer = SarvamStt::new(
        sarvam_key.clone(),
        settings.sarvam_stt_url.clone(),
        settings.stt_language.clone(),
    );
    let generator = GeminiGenerate::new(
        LlmClient::new(
            Provider::Gemini,
            settings.gemini_api_key.clone(),
            settings.gemini_model.clone(),
        )?,
        ChatOptions {
            temperature: Some(settings.gemini_temperature),
            max_output_tokens: Some(settings.gemini_max_tokens),
        },
    );
    let synthesizer = SarvamTts::new(sarvam_key, settings.sarvam_tts_url.clone()).with_voice(
        settings.sarvam_tts_language.clone(),
        settings.sarvam_tts_speaker.clone(),
    );

    let pipeline = Arc::new(
        PipelineOrchestrator::new(Arc::clone(&store), recognizer, generator, synthesizer)
            .with_turn_timeout(TURN_TIMEOUT),
    );

    // Expired sessions are reaped lazily on lookup; this sweep handles
    // the ones nobody asks for again.
    {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                let removed = store.sweep_expired();
                if removed > 0 {
                    info!("sweep removed {} expired sessions", removed);
                }
            }
        });
    }

    run_turn_loop(pipeline, voice_enabled, &settings.audio_out_dir).await
}

/// Console stand-in for the audio-room transport: each line is one
/// recognized utterance.
async fn run_turn_loop<R, G, S>(
    pipeline: Arc<PipelineOrchestrator<R, G, S>>,
    voice_enabled: bool,
    audio_out_dir: &str,
) -> Result<()>
where
    R: RecognizePort,
    G: GeneratePort,
    S: SynthesizePort,
{
    let session_id = pipeline.create_session(None);
    println!("session {} ready", session_id);
    println!("type to talk; :summary, :remember <key> <value>, :recall <key>, :quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reply_count = 0u32;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == ":quit" {
            break;
        }
        if line == ":summary" {
            match pipeline.session_summary(&session_id, 10) {
                Some(summary) => println!("{}", summary),
                None => println!("session expired"),
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix(":remember ") {
            match rest.split_once(' ') {
                Some((key, value)) => {
                    if pipeline.remember_fact(&session_id, key, value) {
                        println!("remembered {} = {}", key, value);
                    } else {
                        println!("session expired");
                    }
                }
                None => println!("usage: :remember <key> <value>"),
            }
            continue;
        }
        if let Some(key) = line.strip_prefix(":recall ") {
            match pipeline.recall_fact(&session_id, key.trim()) {
                Some(value) => println!("{} = {}", key.trim(), value),
                None => println!("nothing remembered for {}", key.trim()),
            }
            continue;
        }

        match pipeline.handle_user_utterance(&session_id, line).await {
            Ok(reply) => {
                println!("assistant: {}", reply);
                if voice_enabled {
                    reply_count += 1;
                    if let Err(e) =
                        speak_to_file(&pipeline, &reply, audio_out_dir, reply_count).await
                    {
                        warn!("synthesis failed: {}", e);
                    }
                }
            }
            // Turn-level failure: the conversation continues on the next
            // utterance.
            Err(e) => eprintln!("turn failed: {}", e),
        }
    }

    Ok(())
}

async fn speak_to_file<R, G, S>(
    pipeline: &PipelineOrchestrator<R, G, S>,
    reply: &str,
    audio_out_dir: &str,
    reply_count: u32,
) -> Result<()>
where
    R: RecognizePort,
    G: GeneratePort,
    S: SynthesizePort,
{
    let audio = pipeline.speak(reply).await?;
    std::fs::create_dir_all(audio_out_dir)?;
    // Raw PCM samples; container handling stays out of scope.
    let path = Path::new(audio_out_dir).join(format!("reply-{:04}.pcm", reply_count));
    std::fs::write(&path, &audio)?;
    info!("wrote {} bytes of audio to {}", audio.len(), path.display());
    Ok(())
}
