//! SVG path data
//!
//! Pen strokes and background decorations store their geometry as
//! SVG-style path data strings. This module parses that syntax into
//! segments and emits them as PDF path operators, flipping from the
//! canvas's top-left y-down origin to PDF's bottom-left y-up origin.
//!
//! Supported commands: M/m, L/l, H/h, V/v, C/c, Q/q, Z/z. Quadratic
//! curves are elevated to cubics since PDF only has the `c` operator.

use super::content::ContentStream;
use canvas_model::Point;
use thiserror::Error;

/// Error type for malformed path data
#[derive(Debug, Error)]
#[error("invalid path data: {0}")]
pub struct PathDataError(pub String);

/// A parsed path segment in absolute canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
    Close,
}

/// Parse SVG path data into absolute segments
pub fn parse_path(data: &str) -> Result<Vec<PathSegment>, PathDataError> {
    let mut parser = PathParser::new(data);
    parser.run()?;
    Ok(parser.segments)
}

struct PathParser<'a> {
    input: &'a [u8],
    pos: usize,
    segments: Vec<PathSegment>,
    /// Current point after the last segment
    current: Point,
    /// First point of the current subpath, target of Z
    subpath_start: Point,
    started: bool,
}

impl<'a> PathParser<'a> {
    fn new(data: &'a str) -> Self {
        Self {
            input: data.as_bytes(),
            pos: 0,
            segments: Vec::new(),
            current: Point::default(),
            subpath_start: Point::default(),
            started: false,
        }
    }

    fn run(&mut self) -> Result<(), PathDataError> {
        self.skip_separators();
        let mut command: Option<u8> = None;

        while self.pos < self.input.len() {
            let byte = self.input[self.pos];
            if byte.is_ascii_alphabetic() {
                command = Some(byte);
                self.pos += 1;
                self.skip_separators();
                if matches!(byte, b'Z' | b'z') {
                    self.close()?;
                    continue;
                }
            }

            let cmd = command.ok_or_else(|| {
                PathDataError(format!("coordinates before any command at byte {}", self.pos))
            })?;
            self.apply(cmd)?;
            self.skip_separators();

            // Repeated coordinate pairs after M/m continue as implicit
            // lines, per the SVG grammar.
            command = Some(match cmd {
                b'M' => b'L',
                b'm' => b'l',
                other => other,
            });
        }

        Ok(())
    }

    fn apply(&mut self, cmd: u8) -> Result<(), PathDataError> {
        if !self.started && !matches!(cmd, b'M' | b'm') {
            return Err(PathDataError(format!(
                "path must start with a move command, found '{}'",
                cmd as char
            )));
        }

        match cmd {
            b'M' | b'm' => {
                let p = self.point(cmd.is_ascii_lowercase())?;
                self.segments.push(PathSegment::MoveTo(p));
                self.current = p;
                self.subpath_start = p;
                self.started = true;
            }
            b'L' | b'l' => {
                let p = self.point(cmd.is_ascii_lowercase())?;
                self.segments.push(PathSegment::LineTo(p));
                self.current = p;
            }
            b'H' | b'h' => {
                let x = self.number()?;
                let p = if cmd == b'h' {
                    Point::new(self.current.x + x, self.current.y)
                } else {
                    Point::new(x, self.current.y)
                };
                self.segments.push(PathSegment::LineTo(p));
                self.current = p;
            }
            b'V' | b'v' => {
                let y = self.number()?;
                let p = if cmd == b'v' {
                    Point::new(self.current.x, self.current.y + y)
                } else {
                    Point::new(self.current.x, y)
                };
                self.segments.push(PathSegment::LineTo(p));
                self.current = p;
            }
            b'C' | b'c' => {
                let relative = cmd == b'c';
                let c1 = self.point(relative)?;
                let c2 = self.point(relative)?;
                let end = self.point(relative)?;
                self.segments.push(PathSegment::CurveTo(c1, c2, end));
                self.current = end;
            }
            b'Q' | b'q' => {
                let relative = cmd == b'q';
                let q = self.point(relative)?;
                let end = self.point(relative)?;
                // Elevate the quadratic to a cubic
                let c1 = Point::new(
                    self.current.x + 2.0 / 3.0 * (q.x - self.current.x),
                    self.current.y + 2.0 / 3.0 * (q.y - self.current.y),
                );
                let c2 = Point::new(
                    end.x + 2.0 / 3.0 * (q.x - end.x),
                    end.y + 2.0 / 3.0 * (q.y - end.y),
                );
                self.segments.push(PathSegment::CurveTo(c1, c2, end));
                self.current = end;
            }
            other => {
                return Err(PathDataError(format!(
                    "unsupported path command '{}'",
                    other as char
                )));
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), PathDataError> {
        if !self.started {
            return Err(PathDataError("close before any subpath".to_string()));
        }
        self.segments.push(PathSegment::Close);
        self.current = self.subpath_start;
        Ok(())
    }

    fn point(&mut self, relative: bool) -> Result<Point, PathDataError> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(if relative {
            Point::new(self.current.x + x, self.current.y + y)
        } else {
            Point::new(x, y)
        })
    }

    fn number(&mut self) -> Result<f64, PathDataError> {
        self.skip_separators();
        let start = self.pos;

        if self.pos < self.input.len() && matches!(self.input[self.pos], b'+' | b'-') {
            self.pos += 1;
        }
        let mut seen_dot = false;
        let mut seen_exp = false;
        while self.pos < self.input.len() {
            match self.input[self.pos] {
                b'0'..=b'9' => self.pos += 1,
                b'.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    self.pos += 1;
                }
                b'e' | b'E' if !seen_exp => {
                    seen_exp = true;
                    self.pos += 1;
                    if self.pos < self.input.len() && matches!(self.input[self.pos], b'+' | b'-') {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }

        let text = std::str::from_utf8(&self.input[start..self.pos])
            .expect("number bytes are ASCII");
        text.parse().map_err(|_| {
            PathDataError(format!("expected a number at byte {}", start))
        })
    }

    fn skip_separators(&mut self) {
        while self.pos < self.input.len()
            && (self.input[self.pos].is_ascii_whitespace() || self.input[self.pos] == b',')
        {
            self.pos += 1;
        }
    }
}

/// Write segments into a content stream, flipping y for PDF's origin
pub fn emit_path(content: &mut ContentStream, segments: &[PathSegment], page_height: f64) {
    for segment in segments {
        match segment {
            PathSegment::MoveTo(p) => {
                content.move_to(p.x, page_height - p.y);
            }
            PathSegment::LineTo(p) => {
                content.line_to(p.x, page_height - p.y);
            }
            PathSegment::CurveTo(c1, c2, end) => {
                content.curve_to(
                    c1.x,
                    page_height - c1.y,
                    c2.x,
                    page_height - c2.y,
                    end.x,
                    page_height - end.y,
                );
            }
            PathSegment::Close => {
                content.close_path();
            }
        }
    }
}

/// Whether the segments form a single closed axis-aligned rectangle.
/// The Background layer stores its solid paper fill as such a path; the
/// exporter skips it because the page fill already covers it.
pub fn is_axis_aligned_rect(segments: &[PathSegment]) -> bool {
    let mut points: Vec<Point> = Vec::new();
    let mut closed = false;

    for (i, segment) in segments.iter().enumerate() {
        match segment {
            PathSegment::MoveTo(p) if i == 0 => points.push(*p),
            PathSegment::LineTo(p) if !closed => points.push(*p),
            PathSegment::Close if i == segments.len() - 1 => closed = true,
            _ => return false,
        }
    }

    // Drop an explicit return to the start point
    let returns_to_start = points.len() > 1 && points.first() == points.last();
    if returns_to_start {
        points.pop();
    } else if !closed {
        return false;
    }

    if points.len() != 4 {
        return false;
    }

    // Each edge must be horizontal or vertical, alternating
    let mut horizontal = Vec::with_capacity(4);
    for i in 0..4 {
        let a = points[i];
        let b = points[(i + 1) % 4];
        if a.y == b.y && a.x != b.x {
            horizontal.push(true);
        } else if a.x == b.x && a.y != b.y {
            horizontal.push(false);
        } else {
            return false;
        }
    }
    horizontal[0] != horizontal[1] && horizontal[1] != horizontal[2] && horizontal[2] != horizontal[3]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move_line() {
        let segments = parse_path("M 10 20 L 30 40").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::MoveTo(Point::new(10.0, 20.0)),
                PathSegment::LineTo(Point::new(30.0, 40.0)),
            ]
        );
    }

    #[test]
    fn test_parse_relative_and_implicit_lines() {
        // Pairs after the first m continue as implicit relative lines
        let segments = parse_path("m 10,10 5,0 0,5").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::MoveTo(Point::new(10.0, 10.0)),
                PathSegment::LineTo(Point::new(15.0, 10.0)),
                PathSegment::LineTo(Point::new(15.0, 15.0)),
            ]
        );
    }

    #[test]
    fn test_parse_h_v_z() {
        let segments = parse_path("M 0 0 H 10 V 10 h -10 Z").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::MoveTo(Point::new(0.0, 0.0)),
                PathSegment::LineTo(Point::new(10.0, 0.0)),
                PathSegment::LineTo(Point::new(10.0, 10.0)),
                PathSegment::LineTo(Point::new(0.0, 10.0)),
                PathSegment::Close,
            ]
        );
    }

    #[test]
    fn test_parse_cubic_and_quadratic() {
        let segments = parse_path("M 0 0 C 1 1 2 2 3 3").unwrap();
        assert_eq!(segments.len(), 2);

        // A quadratic becomes one cubic ending at its endpoint
        let segments = parse_path("M 0 0 Q 3 0 3 3").unwrap();
        match segments[1] {
            PathSegment::CurveTo(c1, _, end) => {
                assert_eq!(end, Point::new(3.0, 3.0));
                assert!((c1.x - 2.0).abs() < 1e-9);
                assert_eq!(c1.y, 0.0);
            }
            _ => panic!("expected a curve"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_path("L 1 2").is_err()); // no initial move
        assert!(parse_path("M 1").is_err()); // missing coordinate
        assert!(parse_path("M 1 2 X 3 4").is_err()); // unknown command
        assert!(parse_path("1 2 3 4").is_err()); // bare numbers
    }

    #[test]
    fn test_emit_flips_y() {
        let segments = parse_path("M 10 20 L 30 40").unwrap();
        let mut content = ContentStream::new();
        emit_path(&mut content, &segments, 100.0);
        let text = String::from_utf8(content.into_bytes()).unwrap();
        assert!(text.contains("10.0 80.0 m"));
        assert!(text.contains("30.0 60.0 l"));
    }

    proptest::proptest! {
        #[test]
        fn prop_polylines_parse_exactly(
            points in proptest::collection::vec((-1.0e4f64..1.0e4, -1.0e4f64..1.0e4), 1..24)
        ) {
            let mut data = String::new();
            for (i, (x, y)) in points.iter().enumerate() {
                let cmd = if i == 0 { 'M' } else { 'L' };
                data.push_str(&format!("{} {} {} ", cmd, x, y));
            }

            let segments = parse_path(&data).unwrap();
            proptest::prop_assert_eq!(segments.len(), points.len());
            for (segment, &(x, y)) in segments.iter().zip(&points) {
                let point = match segment {
                    PathSegment::MoveTo(p) | PathSegment::LineTo(p) => *p,
                    other => return Err(proptest::test_runner::TestCaseError::fail(
                        format!("unexpected segment {:?}", other),
                    )),
                };
                proptest::prop_assert_eq!(point, Point::new(x, y));
            }
        }
    }

    #[test]
    fn test_rect_detection() {
        assert!(is_axis_aligned_rect(
            &parse_path("M 0 0 H 100 V 50 H 0 Z").unwrap()
        ));
        assert!(is_axis_aligned_rect(
            &parse_path("M 0 0 L 100 0 L 100 50 L 0 50 L 0 0").unwrap()
        ));
        // Diagonal edge: not a rectangle
        assert!(!is_axis_aligned_rect(
            &parse_path("M 0 0 L 100 10 L 100 50 L 0 50 Z").unwrap()
        ));
        // Open three-sided shape
        assert!(!is_axis_aligned_rect(
            &parse_path("M 0 0 H 100 V 50").unwrap()
        ));
        // A plain stroke is not a rectangle
        assert!(!is_axis_aligned_rect(&parse_path("M 0 0 L 5 5").unwrap()));
    }
}
