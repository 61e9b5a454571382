//! Zone file line grammar: `NAME IN TYPE VALUE [; comment]`

use std::fmt;

/// One resource record line of a generated zone file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLine {
    /// Owner name
    pub name: String,
    /// Record type (A, AAAA, CNAME, PTR)
    pub kind: String,
    /// Record data
    pub value: String,
    /// Trailing comment
    pub comment: Option<String>,
}

impl ResourceLine {
    /// Create a line without comment
    pub fn new(name: impl Into<String>, kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            value: value.into(),
            comment: None,
        }
    }

    /// Attach a trailing comment; empty comments are dropped
    ///
    /// Control characters become spaces so the comment stays on its line.
    pub fn with_comment(mut self, comment: &str) -> Self {
        let flat: String = comment
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        let flat = flat.trim();
        if !flat.is_empty() {
            self.comment = Some(flat.to_string());
        }
        self
    }

    /// Parse a rendered line back; comment-only and blank lines yield `None`
    pub fn parse(line: &str) -> Option<Self> {
        let (body, comment) = match line.split_once(';') {
            Some((body, comment)) => (body, Some(comment.trim())),
            None => (line, None),
        };

        let mut tokens = body.split_whitespace();
        let name = tokens.next()?;
        if tokens.next()? != "IN" {
            return None;
        }
        let kind = tokens.next()?;
        let value: Vec<&str> = tokens.collect();
        if value.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_string(),
            kind: kind.to_string(),
            value: value.join(" "),
            comment: comment.filter(|c| !c.is_empty()).map(str::to_string),
        })
    }
}

impl fmt::Display for ResourceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}    IN {}    {}", self.name, self.kind, self.value)?;
        if let Some(comment) = &self.comment {
            write!(f, " ; {}", comment)?;
        }
        Ok(())
    }
}

/// A rendered zone: one header comment followed by resource lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    /// Header comment text (without the leading `;`)
    pub header: String,
    /// Resource lines in output order
    pub lines: Vec<ResourceLine>,
}

impl Zone {
    /// Create an empty zone
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            lines: Vec::new(),
        }
    }

    /// Full file contents
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; {}", self.header)?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Parse every resource line of a zone file
pub fn parse_zone(text: &str) -> Vec<ResourceLine> {
    text.lines().filter_map(ResourceLine::parse).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_display() {
        let line = ResourceLine::new("www", "A", "192.0.2.10");
        assert_eq!(line.to_string(), "www    IN A    192.0.2.10");

        let commented = line.with_comment("front end");
        assert_eq!(commented.to_string(), "www    IN A    192.0.2.10 ; front end");
    }

    #[test]
    fn test_line_parse() {
        let parsed = ResourceLine::parse("alias    IN CNAME    www.example.com. ; legacy").unwrap();
        assert_eq!(parsed.name, "alias");
        assert_eq!(parsed.kind, "CNAME");
        assert_eq!(parsed.value, "www.example.com.");
        assert_eq!(parsed.comment.as_deref(), Some("legacy"));

        assert!(ResourceLine::parse("; header").is_none());
        assert!(ResourceLine::parse("").is_none());
        assert!(ResourceLine::parse("www A 192.0.2.1").is_none());
    }

    #[test]
    fn test_comment_cannot_break_the_line() {
        let line = ResourceLine::new("www", "A", "192.0.2.10")
            .with_comment("x\nevil    IN A    203.0.113.66\r\n");

        let mut zone = Zone::new("forward zone example.com generated by ipam");
        zone.lines.push(line);
        let text = zone.render();
        assert_eq!(text.lines().count(), 2);

        let parsed = parse_zone(&text);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "www");
        assert_eq!(parsed[0].comment.as_deref(), Some("x evil    IN A    203.0.113.66"));
    }

    #[test]
    fn test_zone_render() {
        let mut zone = Zone::new("forward zone example.com generated by ipam");
        zone.lines.push(ResourceLine::new("www", "A", "192.0.2.10"));
        assert_eq!(
            zone.render(),
            "; forward zone example.com generated by ipam\nwww    IN A    192.0.2.10\n"
        );
        assert_eq!(parse_zone(&zone.render()).len(), 1);
    }
}
