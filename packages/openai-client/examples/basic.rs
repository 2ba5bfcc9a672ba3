//! Basic OpenAI speech usage example

use openai_client::{AudioFormat, OpenAIClient, SpeechRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize from environment
    let client = OpenAIClient::from_env()?;

    println!("=== Speech ===");
    let request = SpeechRequest::new("tts-1", "nova")
        .input("Rust is a language empowering everyone to build reliable software.")
        .response_format(AudioFormat::Mp3);

    let audio = client.create_speech(&request).await?;
    tokio::fs::write("speech.mp3", &audio).await?;

    println!("Wrote {} bytes to speech.mp3", audio.len());

    Ok(())
}
