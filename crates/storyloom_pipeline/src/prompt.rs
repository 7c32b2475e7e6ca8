//! Prompt assembly and the deterministic last-resort simplification.

use storyloom_core::{StageConfig, StageKind};

/// Instruction sent with the full generated text to derive the image master context.
pub const MASTER_PROMPT_INSTRUCTION: &str = "Write a short visual style guide for illustrating \
the story below. Describe the recurring characters' appearance, the setting and the palette \
in plain sentences, under 120 words. Output only the guide.";

/// Narration instruction used when an item sets no audio prompt.
pub const DEFAULT_NARRATION_INSTRUCTION: &str = "Read the following passage as a professional \
voice actor narrating an audiobook: warm, clear and evenly paced.";

const FALLBACK_TOKEN_LIMIT: usize = 20;

const JARGON: &[&str] = &["arri", "zeiss", "supreme", "primes"];

/// Custom prompt passed to the text generator for the image master context.
pub fn master_instruction(config: &StageConfig) -> String {
    match config.image_prompt() {
        Some(custom) if !custom.trim().is_empty() => {
            format!("{MASTER_PROMPT_INSTRUCTION}\n\nAdditional direction: {custom}")
        }
        _ => MASTER_PROMPT_INSTRUCTION.to_string(),
    }
}

/// Audio master context: the narration instruction plus the voice.
pub fn audio_context(config: &StageConfig) -> String {
    let instruction = match config.audio_prompt() {
        Some(custom) if !custom.trim().is_empty() => custom.as_str(),
        _ => DEFAULT_NARRATION_INSTRUCTION,
    };
    format!("{instruction}\nVoice: {}", config.voice())
}

/// Prompt for one image segment.
pub fn image_prompt(chunk: &str, master: &str) -> String {
    if master.trim().is_empty() {
        chunk.to_string()
    } else {
        format!("{chunk}\n\nArt direction: {master}")
    }
}

/// Reduce a prompt to its first plain words.
///
/// Drops short tokens, tokens carrying brackets or dashes, and camera jargon,
/// keeps the first twenty tokens that contain a letter, and prefixes a lead
/// for the kind.
///
/// # Examples
///
/// ```
/// use storyloom_core::StageKind;
/// use storyloom_pipeline::fallback_prompt;
///
/// let prompt = "A knight (heroic) rides at dawn, shot on ARRI Alexa";
/// assert_eq!(
///     fallback_prompt(prompt, StageKind::Image),
///     "A simple image of knight rides dawn, shot Alexa"
/// );
/// ```
pub fn fallback_prompt(prompt: &str, kind: StageKind) -> String {
    let lead = match kind {
        StageKind::Image => "A simple image of",
        StageKind::Audio => "Read aloud plainly:",
    };
    let words: Vec<&str> = prompt
        .split_whitespace()
        .filter(|token| token.chars().count() > 2)
        .filter(|token| !token.contains(['(', ')', '[', ']', '—', '–']))
        .filter(|token| {
            let lower = token.to_lowercase();
            !JARGON.iter().any(|jargon| lower.contains(jargon))
        })
        .filter(|token| token.chars().any(char::is_alphabetic))
        .take(FALLBACK_TOKEN_LIMIT)
        .collect();
    if words.is_empty() {
        lead.to_string()
    } else {
        format!("{lead} {}", words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_keeps_at_most_twenty_tokens() {
        let prompt = (0..40).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ");
        let simplified = fallback_prompt(&prompt, StageKind::Audio);
        assert!(simplified.starts_with("Read aloud plainly: word0 "));
        assert_eq!(simplified.split_whitespace().count(), 3 + 20);
        assert!(simplified.ends_with("word19"));
    }

    #[test]
    fn fallback_of_noise_is_the_lead() {
        assert_eq!(fallback_prompt("42 -- [x] ok", StageKind::Image), "A simple image of");
    }

    #[test]
    fn audio_context_names_voice() {
        let config = StageConfig::builder().voice("Puck").build().unwrap();
        let context = audio_context(&config);
        assert!(context.starts_with(DEFAULT_NARRATION_INSTRUCTION));
        assert!(context.ends_with("Voice: Puck"));
    }

    #[test]
    fn custom_image_prompt_extends_master_instruction() {
        let config = StageConfig::builder().image_prompt("ink wash").build().unwrap();
        assert!(master_instruction(&config).ends_with("Additional direction: ink wash"));
        assert_eq!(master_instruction(&StageConfig::default()), MASTER_PROMPT_INSTRUCTION);
    }

    #[test]
    fn empty_master_leaves_chunk_alone() {
        assert_eq!(image_prompt("A cat sleeps.", " "), "A cat sleeps.");
        assert!(image_prompt("A cat sleeps.", "Ink").ends_with("Art direction: Ink"));
    }
}
