//! Soundscript text parser.
//!
//! ```text
//! tracks/diesel
//! {
//!     trigger_source engine
//!     pitch_source engine_rpm
//!     sound 800 diesel_idle.wav
//! }
//! ```
//!
//! The parser only splits the text into blocks of tokenised attribute
//! lines. Applying them to a template is up to the caller, so the grammar
//! stays independent of the template layout.

use tracing::warn;

/// One attribute line inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLine {
    /// 1-based line number.
    pub line: usize,
    /// The trimmed line text.
    pub text: String,
}

impl AttributeLine {
    /// Whitespace-separated tokens.
    pub fn tokens(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }
}

/// A named block of attribute lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    /// Template name.
    pub name: String,
    /// 1-based line of the name.
    pub line: usize,
    /// Attribute lines in order.
    pub attributes: Vec<AttributeLine>,
}

fn is_comment(line: &str) -> bool {
    line.is_empty() || line.starts_with("//")
}

/// Split soundscript text into blocks.
///
/// Anything between a name and its opening brace is skipped. A block left
/// open at the end of the text is kept with a warning.
pub fn parse_blocks(text: &str, source_name: &str) -> Vec<ScriptBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<ScriptBlock> = None;
    let mut awaiting_brace = false;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        let number = index + 1;

        if awaiting_brace {
            if line == "{" {
                awaiting_brace = false;
            }
            continue;
        }
        if is_comment(line) {
            continue;
        }

        if line == "}" && current.is_some() {
            blocks.extend(current.take());
            continue;
        }

        if let Some(block) = current.as_mut() {
            block.attributes.push(AttributeLine {
                line: number,
                text: line.to_string(),
            });
        } else {
            current = Some(ScriptBlock {
                name: line.to_string(),
                line: number,
                attributes: Vec::new(),
            });
            awaiting_brace = true;
        }
    }

    if let Some(block) = current {
        warn!(
            "Soundscript '{}' in {source_name} is not closed before end of file",
            block.name
        );
        blocks.push(block);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = "\
// diesel truck sounds
tracks/diesel
{
    trigger_source engine
    pitch_source  engine_rpm
\tsound 800 idle.wav

    // comment inside
}

tracks/horn
{
    trigger_source horn
}
";

    #[test]
    fn test_blocks_and_tokens() {
        let blocks = parse_blocks(SCRIPT, "diesel.soundscript");
        assert_eq!(blocks.len(), 2);

        let diesel = &blocks[0];
        assert_eq!(diesel.name, "tracks/diesel");
        assert_eq!(diesel.line, 2);
        assert_eq!(diesel.attributes.len(), 3);
        assert_eq!(diesel.attributes[1].tokens(), vec!["pitch_source", "engine_rpm"]);
        assert_eq!(diesel.attributes[2].tokens(), vec!["sound", "800", "idle.wav"]);
        assert_eq!(diesel.attributes[2].line, 6);

        assert_eq!(blocks[1].name, "tracks/horn");
        assert_eq!(blocks[1].attributes.len(), 1);
    }

    #[test]
    fn test_junk_before_brace_is_skipped() {
        let text = "name\nstray line\n{\ntrigger_source horn\n}\n";
        let blocks = parse_blocks(text, "junk.soundscript");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].attributes.len(), 1);
    }

    #[test]
    fn test_unterminated_block_kept() {
        let blocks = parse_blocks("open\n{\ntrigger_source horn\n", "open.soundscript");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].attributes[0].text, "trigger_source horn");
    }

    #[test]
    fn test_empty_text() {
        assert!(parse_blocks("", "empty.soundscript").is_empty());
        assert!(parse_blocks("// nothing\n\n", "empty.soundscript").is_empty());
    }
}
