use crate::state::Position;
use std::io::{self, BufRead, Write};

pub const FALLBACK_POSITION: Position = Position::TopRight;

/// Asks for a screen corner on `out` and reads one line from `input`.
pub fn prompt_position<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
) -> io::Result<Position> {
    let choices: Vec<String> = Position::ALL
        .iter()
        .map(|p| format!("'{}'", p.as_str()))
        .collect();
    write!(out, "Enter position [{}]: ", choices.join(", "))?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    resolve_position(&line, out)
}

/// Case-insensitive match; anything else falls back to top-right with a
/// warning on `out`.
pub fn resolve_position<W: Write>(raw: &str, out: &mut W) -> io::Result<Position> {
    match raw.trim().to_lowercase().parse::<Position>() {
        Ok(position) => Ok(position),
        Err(_) => {
            writeln!(out, "Invalid position. Using default: {FALLBACK_POSITION}")?;
            Ok(FALLBACK_POSITION)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &str) -> (Position, String) {
        let mut reader = input.as_bytes();
        let mut out = Vec::new();
        let position = prompt_position(&mut reader, &mut out).expect("in-memory io");
        (position, String::from_utf8(out).expect("utf8 output"))
    }

    #[test]
    fn prints_choices() {
        let (_, out) = run("top-left\n");
        assert!(out.starts_with(
            "Enter position ['top-left', 'top-right', 'bottom-left', 'bottom-right']: "
        ));
    }

    #[test]
    fn mixed_case_is_accepted() {
        let (position, out) = run("Top-Right\n");
        assert_eq!(position, Position::TopRight);
        assert!(!out.contains("Invalid"));

        let (position, _) = run("  BOTTOM-left \r\n");
        assert_eq!(position, Position::BottomLeft);
    }

    #[test]
    fn every_position_resolves() {
        for expected in Position::ALL {
            let (position, _) = run(&format!("{expected}\n"));
            assert_eq!(position, expected);
        }
    }

    #[test]
    fn unknown_input_warns_and_falls_back() {
        let (position, out) = run("center\n");
        assert_eq!(position, Position::TopRight);
        assert!(out.ends_with("Invalid position. Using default: top-right\n"));
    }

    #[test]
    fn empty_input_falls_back() {
        let (position, out) = run("");
        assert_eq!(position, Position::TopRight);
        assert!(out.contains("Invalid position"));
    }
}
