//! Turning failures into wire records.

use std::fmt::Write as _;

use crate::error::{ErrorLoc, ErrorRecord};
use crate::script::{Frame, ScriptFailure};

/// Classify a failure into a record.
///
/// The location is taken from the innermost frame that runs user code and
/// has a known line, so errors raised inside harness functions point at the
/// user's call site rather than at harness internals. Never fails: if the
/// details cannot be rendered the record degrades to an empty one.
#[must_use]
pub fn classify(failure: &ScriptFailure) -> ErrorRecord {
    render(failure).unwrap_or_default()
}

/// The innermost user frame with a known line.
#[must_use]
pub fn user_location(frames: &[Frame]) -> Option<ErrorLoc> {
    frames
        .iter()
        .rev()
        .filter(|frame| frame.is_user())
        .find_map(|frame| frame.line.map(|line| ErrorLoc::at(line, frame.column)))
}

fn render(failure: &ScriptFailure) -> Result<ErrorRecord, std::fmt::Error> {
    let first_line = failure.message.lines().next().unwrap_or_default();
    let summary = format!("{}: {first_line}", failure.kind);

    // the summary line is left out of a traceback; only continuation lines follow it
    let mut details = String::new();
    if failure.frames.is_empty() {
        writeln!(details, "{}: {}", failure.kind, failure.message)?;
    } else {
        writeln!(details, "Traceback (most recent call last):")?;
        for frame in &failure.frames {
            write_frame(&mut details, frame)?;
        }
        for line in failure.message.lines().skip(1) {
            writeln!(details, "{line}")?;
        }
    }

    Ok(ErrorRecord {
        summary,
        details,
        loc: user_location(&failure.frames),
    })
}

fn write_frame(out: &mut String, frame: &Frame) -> std::fmt::Result {
    let source = frame.source.as_deref().unwrap_or("<native>");
    write!(out, "  File \"{source}\"")?;
    if let Some(line) = frame.line {
        write!(out, ", line {line}")?;
        if let Some(column) = frame.column {
            write!(out, ", column {column}")?;
        }
    }
    if let Some(function) = &frame.function {
        write!(out, ", in {function}")?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{FailureKind, USER_SOURCE};

    fn frame(source: Option<&str>, function: &str, line: Option<usize>) -> Frame {
        Frame {
            function: Some(function.to_string()),
            source: source.map(str::to_string),
            line,
            column: line.map(|_| 5),
        }
    }

    #[test]
    fn test_innermost_user_frame_wins() {
        let failure = ScriptFailure::new(FailureKind::Runtime, "boom")
            .with_frame(frame(Some(USER_SOURCE), "robot", Some(3)))
            .with_frame(frame(Some(USER_SOURCE), "helper", Some(9)))
            .with_frame(frame(None, "debug_inspect", None));
        let record = classify(&failure);
        assert_eq!(record.summary, "RuntimeError: boom");
        assert_eq!(record.loc, Some(ErrorLoc::at(9, Some(5))));
    }

    #[test]
    fn test_harness_frames_are_skipped() {
        let failure = ScriptFailure::new(FailureKind::Type, "bad argument")
            .with_frame(frame(Some(USER_SOURCE), "robot", Some(4)))
            .with_frame(frame(Some("<stdlib>"), "check", Some(120)));
        let record = classify(&failure);
        assert_eq!(record.loc, Some(ErrorLoc::at(4, Some(5))));
    }

    #[test]
    fn test_no_user_frame_means_no_location() {
        let failure = ScriptFailure::new(FailureKind::Internal, "oops")
            .with_frame(frame(Some("<stdlib>"), "main", Some(1)));
        assert_eq!(classify(&failure).loc, None);

        let bare = ScriptFailure::new(FailureKind::Type, "no frames");
        let record = classify(&bare);
        assert_eq!(record.loc, None);
        assert_eq!(record.details, "TypeError: no frames\n");
    }

    #[test]
    fn test_summary_is_single_line() {
        let failure = ScriptFailure::new(FailureKind::Exception, "first\nsecond");
        let record = classify(&failure);
        assert_eq!(record.summary, "Exception: first");
        assert!(record.details.contains("second"));
    }

    #[test]
    fn test_details_render_traceback() {
        let failure = ScriptFailure::new(FailureKind::Name, "x not found")
            .with_frame(frame(Some(USER_SOURCE), "robot", Some(2)));
        let record = classify(&failure);
        assert_eq!(
            record.details,
            "Traceback (most recent call last):\n  File \"<robot>\", line 2, column 5, in robot\n"
        );
        assert!(!record.details.contains(&record.summary));
    }

    #[test]
    fn test_continuation_lines_follow_traceback() {
        let failure = ScriptFailure::new(FailureKind::Exception, "first\nsecond")
            .with_frame(frame(Some(USER_SOURCE), "robot", Some(1)));
        let record = classify(&failure);
        assert_eq!(record.summary, "Exception: first");
        assert!(record.details.ends_with("in robot\nsecond\n"));
    }
}
