// Terminal recitation trainer.
//
// Shows the verse under the cursor, takes the path of a recorded attempt
// from stdin, runs it through the engine and reports the verdict. Progress
// survives restarts through the progress store.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use murattil::config::{TrainerSettings, SETTINGS};
use murattil::{
    Corpus, CurrentVerse, JsonFileStore, LocalWhisperProvider, RecitationEngine,
    RemoteWhisperProvider, TranscriptionProvider,
};

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let corpus_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "assets/quran.json".to_string());
    println!("Loading corpus from {}", corpus_path);
    let corpus = Corpus::from_json_file(Path::new(&corpus_path))?;
    println!(
        "Loaded {} verses across {} chapters",
        corpus.total_verses(),
        corpus.chapter_count()
    );

    let settings = SETTINGS
        .lock()
        .map_err(|e| format!("Failed to lock settings: {}", e))?
        .clone();
    let store = JsonFileStore::open_default()?;

    match settings.provider.as_str() {
        "local" => {
            let provider = LocalWhisperProvider::new(
                PathBuf::from(&settings.whisper_binary_path),
                PathBuf::from(&settings.whisper_model_path),
            );
            run_session(corpus, provider, store, &settings).await
        }
        _ => {
            let provider = RemoteWhisperProvider::new(&settings.server_url);
            run_session(corpus, provider, store, &settings).await
        }
    }
}

async fn run_session<P: TranscriptionProvider>(
    corpus: Corpus,
    provider: P,
    store: JsonFileStore,
    settings: &TrainerSettings,
) -> Result<(), String> {
    let status = provider.check_availability().await;
    if !status.available {
        println!("Warning: the transcription service is unreachable. Attempts will fail until it is back.");
    } else if !status.ready {
        println!("Warning: the transcription service is still initializing. Give it a moment before reciting.");
    }

    let mut engine = RecitationEngine::new(
        corpus,
        provider,
        Box::new(store),
        &settings.language,
        settings.pass_threshold,
        Duration::from_secs(settings.request_timeout_secs),
    );

    loop {
        let heading = match engine.current_verse()? {
            CurrentVerse::Completed => {
                println!("\nAll 114 chapters completed. Well done!");
                break;
            }
            CurrentVerse::Verse(verse) => format!(
                "\n[{}:{}] {}",
                verse.chapter_number, verse.verse_number, verse.text
            ),
        };
        println!("{}", heading);

        print!("Recording path (q to quit) > ");
        io::stdout()
            .flush()
            .map_err(|e| format!("Failed to flush stdout: {}", e))?;

        let mut input = String::new();
        io::stdin()
            .read_line(&mut input)
            .map_err(|e| format!("Failed to read input: {}", e))?;
        let input = input.trim();

        if input.eq_ignore_ascii_case("q") {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match engine.submit_attempt(Path::new(input)).await {
            Ok(report) => {
                println!(
                    "Similarity: {:.1}%  Verdict: {:?}",
                    report.verification.similarity_percent, report.verification.verdict
                );
                if !report.verification.recognized_text.is_empty() {
                    println!("Heard: {}", report.verification.recognized_text);
                }
                if let Some(kind) = report.error_kind {
                    println!("{}", kind.user_guidance());
                }
                if report.corpus_exhausted {
                    println!("\nAll 114 chapters completed. Well done!");
                    break;
                }
                if report.advanced {
                    println!("Passed! Moving to the next verse.");
                }
            }
            Err(e) => {
                eprintln!("Attempt failed: {}", e);
            }
        }
    }

    println!(
        "Session: {} attempts, {} passed.",
        engine.attempts(),
        engine.passes()
    );
    Ok(())
}
