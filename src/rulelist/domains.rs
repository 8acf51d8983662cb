//! Domain list parser: one domain per line, `#` comments.

use std::io::BufRead;

use super::{ParseError, RuleFileParser};

/// Parser for plain domain lists.
///
/// Empty lines and `#` comments are skipped, surrounding whitespace is
/// trimmed. Entries may carry a `*.` prefix; the classifier normalizes
/// it away since its suffix matching already covers subdomains.
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainListParser;

impl RuleFileParser for DomainListParser {
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Vec<String>, ParseError> {
        let mut entries = Vec::new();
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

            entries.push(trimmed.to_string());
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn parse(content: &str) -> Vec<String> {
        DomainListParser
            .parse(&mut BufReader::new(content.as_bytes()))
            .unwrap()
    }

    #[test]
    fn should_parse_one_domain_per_line() {
        let entries = parse("doubleclick.net\nads.example.com\n*.tracker.example");
        assert_eq!(
            entries,
            vec!["doubleclick.net", "ads.example.com", "*.tracker.example"]
        );
    }

    #[test]
    fn should_skip_comments_and_blank_lines() {
        let entries = parse("# ad networks\n\ndoubleclick.net\n  # indented comment\n");
        assert_eq!(entries, vec!["doubleclick.net"]);
    }

    #[test]
    fn should_trim_whitespace() {
        let entries = parse("  doubleclick.net  \n\tads.example.com\t");
        assert_eq!(entries, vec!["doubleclick.net", "ads.example.com"]);
    }

    #[test]
    fn should_handle_windows_line_endings() {
        let entries = parse("doubleclick.net\r\nads.example.com\r\n");
        assert_eq!(entries, vec!["doubleclick.net", "ads.example.com"]);
    }

    #[test]
    fn should_return_empty_for_comment_only_content() {
        assert!(parse("# one\n# two\n").is_empty());
        assert!(parse("").is_empty());
    }
}
