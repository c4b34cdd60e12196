//! Credential lookup from the process environment.

use crate::config::Context;

/// Environment variable holding the transcription API key.
pub const API_KEY_ENV: &str = "DEEPGRAM_API_KEY";

/// Loads `.env` from the working directory into the environment.
///
/// A missing file is not an error. Variables already set are kept.
pub fn load_dotenv() -> anyhow::Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::debug!(path = %path.display(), "loaded environment file");
            Ok(())
        }
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Resolves the API key: explicit flag, then context, then [`API_KEY_ENV`].
pub fn resolve_api_key(flag: Option<&str>, ctx: Option<&Context>) -> Option<String> {
    resolve_api_key_with(flag, ctx, |name| std::env::var(name).ok())
}

fn resolve_api_key_with(
    flag: Option<&str>,
    ctx: Option<&Context>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    flag.filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| {
            ctx.map(|c| c.api_key.clone())
                .filter(|k| !k.is_empty())
        })
        .or_else(|| lookup(API_KEY_ENV).filter(|k| !k.is_empty()))
}
