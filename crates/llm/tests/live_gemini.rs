use llm::{ChatOptions, Client};

use conversation_core::{ChatMessage, Role};

fn init_env() {
    // Load .env from workspace root (two levels up from tests)
    let _ = dotenv::from_path("../../.env");
}

#[tokio::test]
#[ignore] // Needs GEMINI_API_KEY, run manually with --ignored
async fn basic_call() {
    init_env();
    let cli = Client::from_env_gemini("gemini-2.5-flash").unwrap();
    let out = cli.simple("Say OK.").await.unwrap();
    println!("Response: {}", out);
    assert!(!out.trim().is_empty());
}

#[tokio::test]
#[ignore] // Needs GEMINI_API_KEY, run manually with --ignored
async fn system_instruction_respected() {
    init_env();
    let cli = Client::from_env_gemini("gemini-2.5-flash").unwrap();
    let msgs = vec![
        ChatMessage::new(Role::System, "Reply with exactly one word."),
        ChatMessage::new(Role::User, "How are you?"),
    ];
    let out = cli
        .chat(
            &msgs,
            ChatOptions {
                temperature: Some(0.0),
                max_output_tokens: Some(16),
            },
        )
        .await
        .unwrap();
    println!("Response: {}", out);
    assert!(!out.trim().is_empty());
}
