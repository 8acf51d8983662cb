//! Pattern list parser: one regular expression per line, `#` comments.

use std::io::BufRead;

use super::{ParseError, RuleFileParser};

/// Parser for pattern lists.
///
/// Lines are returned as raw pattern sources in file order; compilation
/// (and rejection of invalid patterns) happens when the rule store is
/// built. A line starting with `#` is a comment, which means a pattern
/// cannot begin with a literal `#`; escape it as `\#` if ever needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternListParser;

impl RuleFileParser for PatternListParser {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Vec<String>, ParseError> {
        let mut sources = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            sources.push(trimmed.to_string());
        }

        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn parse(content: &str) -> Vec<String> {
        PatternListParser
            .parse(&mut BufReader::new(content.as_bytes()))
            .unwrap()
    }

    #[test]
    fn should_keep_patterns_in_file_order() {
        let sources = parse("^ads\\.\ntracker\n\\.metrics\\.");
        assert_eq!(sources, vec!["^ads\\.", "tracker", "\\.metrics\\."]);
    }

    #[test]
    fn should_skip_comments_and_blank_lines() {
        let sources = parse("# heuristics\n\n^ad\\d+\\.\n");
        assert_eq!(sources, vec!["^ad\\d+\\."]);
    }

    #[test]
    fn should_not_touch_pattern_internals() {
        // Regex metacharacters pass through untouched, including inner #.
        let sources = parse("track(er|ing)#?\n");
        assert_eq!(sources, vec!["track(er|ing)#?"]);
    }
}
