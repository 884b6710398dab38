use conversation_core::mocks::{EchoGenerate, FixedRecognize, TextBytesSynthesize};
use conversation_core::{PipelineOrchestrator, SessionConfig, SessionStore};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Wire mocks
    let store = Arc::new(SessionStore::new(SessionConfig::default()));
    let text = {
        let args = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
        if args.is_empty() {
            "what's the weather like?".to_string()
        } else {
            args
        }
    };
    let pipeline = PipelineOrchestrator::new(
        Arc::clone(&store),
        FixedRecognize(text),
        EchoGenerate,
        TextBytesSynthesize,
    );

    let session_id = pipeline.create_session(None);
    println!("session: {}", session_id);

    // One full recognize -> generate -> synthesize turn over fake audio.
    match pipeline.handle_utterance(&session_id, &[0u8; 320], "en-IN").await {
        Ok(outcome) => {
            println!("heard:  {}", outcome.transcript);
            println!("reply:  {}", outcome.reply);
            println!("audio:  {} bytes", outcome.audio.len());
        }
        Err(e) => eprintln!("turn failed: {}", e),
    }

    if let Some(summary) = pipeline.session_summary(&session_id, 5) {
        println!("--- summary ---\n{}", summary);
    }
}
