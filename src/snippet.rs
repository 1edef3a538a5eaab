use crate::position::Span;

/// Renders the source lines covered by `span` with a row of `^` under the
/// covered columns.
pub fn render(span: &Span) -> String {
    let text = &span.start.source.text;
    let lines: Vec<&str> = text.split('\n').collect();

    let first = span.start.line;
    // A span ending at column 0 stops at the newline of the previous line.
    let (last, last_column) = if span.end.line > first && span.end.column == 0 {
        (span.end.line - 1, None)
    } else {
        (span.end.line.max(first), Some(span.end.column))
    };

    let mut rows = Vec::new();
    for line_number in first..=last {
        let Some(line) = lines.get(line_number) else {
            break;
        };
        let line = line.trim_end_matches('\r').replace('\t', " ");
        let width = line.chars().count();

        let col_start = if line_number == first {
            span.start.column
        } else {
            0
        };
        let col_end = match last_column {
            Some(column) if line_number == last => column,
            _ => width,
        };

        let markers = "^".repeat(col_end.saturating_sub(col_start).max(1));
        rows.push(format!("{}\n{}{}", line, " ".repeat(col_start), markers));
    }

    rows.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{Position, Source};

    fn span_of(text: &str, start: usize, end: usize) -> Span {
        let source = Source::new("<test>", text);
        let mut from = Position::start_of(source);
        for c in text.chars().take(start) {
            from.advance(c);
        }
        let mut to = from.clone();
        for c in text.chars().skip(start).take(end - start) {
            to.advance(c);
        }
        Span::new(from, to)
    }

    #[test]
    fn test_single_line_arrows() {
        let span = span_of("let x = 1 + @", 12, 13);
        assert_eq!(render(&span), "let x = 1 + @\n            ^");
    }

    #[test]
    fn test_multi_line_arrows() {
        let span = span_of("a +\nbc", 0, 6);
        assert_eq!(render(&span), "a +\n^^^\nbc\n^^");
    }

    #[test]
    fn test_span_ending_at_newline_stays_on_its_line() {
        let span = span_of("ab\ncd", 1, 3);
        assert_eq!(render(&span), "ab\n ^");
    }
}
