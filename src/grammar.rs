//! Line classification for rules files.
//!
//! Comments run from `#` to end of line and are stripped before anything else
//! happens. Blank lines are dropped. What survives is a sequence of content
//! lines that only remember whether they were indented; the width of the
//! indentation does not matter.

const INDENT: &[char] = &[' ', '\t'];

/// One content line of a rules file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// 1-based line number in the source text.
    pub number: usize,
    pub indented: bool,
    /// Text with indentation, comment and trailing whitespace removed.
    pub content: &'a str,
    /// 1-based column at which `content` starts.
    pub column: usize,
    /// The untouched source line, kept for diagnostics.
    pub raw: &'a str,
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

pub fn tokenize(text: &str) -> Vec<Line<'_>> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let uncommented = strip_comment(raw).trim_end();
            let content = uncommented.trim_start_matches(INDENT);
            if content.is_empty() {
                return None;
            }
            let indent = &uncommented[..uncommented.len() - content.len()];
            Some(Line {
                number: idx + 1,
                indented: !indent.is_empty(),
                content,
                column: indent.chars().count() + 1,
                raw,
            })
        })
        .collect()
}

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Splits a statement into its keyword and the trimmed rest of the line.
///
/// A keyword is a run of ASCII letters, digits and hyphens that must be
/// followed by whitespace or the end of the line. On failure the 0-based
/// character offset of the offending character is returned.
pub fn split_keyword(content: &str) -> Result<(&str, &str), usize> {
    let end = content
        .find(|c: char| !is_keyword_char(c))
        .unwrap_or(content.len());
    let (keyword, rest) = content.split_at(end);
    if keyword.is_empty() || keyword.starts_with('-') {
        return Err(0);
    }
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return Err(keyword.chars().count());
    }
    Ok((keyword, rest.trim()))
}
