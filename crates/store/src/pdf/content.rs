//! PDF Content Stream Generation
//!
//! Builder for the graphics operator streams that define a page's visual
//! content. Only the operators this codec emits are provided: graphics
//! state, RGB color, path construction/painting, text, XObjects and
//! ExtGState selection.

use std::fmt::Arguments;

/// Line cap style (J operator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Butt = 0,
    Round = 1,
    Square = 2,
}

/// Line join style (j operator)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Miter = 0,
    Round = 1,
    Bevel = 2,
}

/// Content stream builder
#[derive(Debug, Default)]
pub struct ContentStream {
    data: Vec<u8>,
}

impl ContentStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Graphics state

    /// Save the current graphics state (q)
    pub fn save_state(&mut self) -> &mut Self {
        self.write_line("q");
        self
    }

    /// Restore the graphics state (Q)
    pub fn restore_state(&mut self) -> &mut Self {
        self.write_line("Q");
        self
    }

    /// Concatenate a transformation matrix (cm)
    pub fn transform(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> &mut Self {
        self.write_fmt(format_args!(
            "{} {} {} {} {} {} cm\n",
            fmt_num(a),
            fmt_num(b),
            fmt_num(c),
            fmt_num(d),
            fmt_num(e),
            fmt_num(f)
        ));
        self
    }

    /// Set the line width (w)
    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        self.write_fmt(format_args!("{} w\n", fmt_num(width)));
        self
    }

    /// Set the line cap style (J)
    pub fn set_line_cap(&mut self, cap: LineCap) -> &mut Self {
        self.write_fmt(format_args!("{} J\n", cap as i32));
        self
    }

    /// Set the line join style (j)
    pub fn set_line_join(&mut self, join: LineJoin) -> &mut Self {
        self.write_fmt(format_args!("{} j\n", join as i32));
        self
    }

    /// Select a named graphics state from the ExtGState resources (gs)
    pub fn set_ext_g_state(&mut self, name: &str) -> &mut Self {
        self.write_fmt(format_args!("/{} gs\n", name));
        self
    }

    // Color

    /// Set the fill color to RGB (rg)
    pub fn set_fill_rgb(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.write_fmt(format_args!(
            "{} {} {} rg\n",
            fmt_num(r),
            fmt_num(g),
            fmt_num(b)
        ));
        self
    }

    /// Set the stroke color to RGB (RG)
    pub fn set_stroke_rgb(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.write_fmt(format_args!(
            "{} {} {} RG\n",
            fmt_num(r),
            fmt_num(g),
            fmt_num(b)
        ));
        self
    }

    // Path construction

    /// Move to a point (m)
    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.write_fmt(format_args!("{} {} m\n", fmt_num(x), fmt_num(y)));
        self
    }

    /// Line to a point (l)
    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.write_fmt(format_args!("{} {} l\n", fmt_num(x), fmt_num(y)));
        self
    }

    /// Cubic Bezier curve (c)
    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        self.write_fmt(format_args!(
            "{} {} {} {} {} {} c\n",
            fmt_num(x1),
            fmt_num(y1),
            fmt_num(x2),
            fmt_num(y2),
            fmt_num(x3),
            fmt_num(y3)
        ));
        self
    }

    /// Rectangle (re)
    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.write_fmt(format_args!(
            "{} {} {} {} re\n",
            fmt_num(x),
            fmt_num(y),
            fmt_num(width),
            fmt_num(height)
        ));
        self
    }

    /// Close the current subpath (h)
    pub fn close_path(&mut self) -> &mut Self {
        self.write_line("h");
        self
    }

    // Path painting

    /// Stroke the current path (S)
    pub fn stroke(&mut self) -> &mut Self {
        self.write_line("S");
        self
    }

    /// Fill the current path, non-zero winding (f)
    pub fn fill(&mut self) -> &mut Self {
        self.write_line("f");
        self
    }

    /// End the path without filling or stroking (n)
    pub fn end_path(&mut self) -> &mut Self {
        self.write_line("n");
        self
    }

    // Text

    /// Begin a text object (BT)
    pub fn begin_text(&mut self) -> &mut Self {
        self.write_line("BT");
        self
    }

    /// End a text object (ET)
    pub fn end_text(&mut self) -> &mut Self {
        self.write_line("ET");
        self
    }

    /// Set the font and size (Tf)
    pub fn set_font(&mut self, font_name: &str, size: f64) -> &mut Self {
        self.write_fmt(format_args!("/{} {} Tf\n", font_name, fmt_num(size)));
        self
    }

    /// Set the text matrix (Tm)
    pub fn set_text_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> &mut Self {
        self.write_fmt(format_args!(
            "{} {} {} {} {} {} Tm\n",
            fmt_num(a),
            fmt_num(b),
            fmt_num(c),
            fmt_num(d),
            fmt_num(e),
            fmt_num(f)
        ));
        self
    }

    /// Show a text string (Tj)
    pub fn show_text(&mut self, text: &str) -> &mut Self {
        self.write_pdf_string(text);
        self.write_line(" Tj");
        self
    }

    // XObjects

    /// Paint a named XObject (Do)
    pub fn draw_xobject(&mut self, name: &str) -> &mut Self {
        self.write_fmt(format_args!("/{} Do\n", name));
        self
    }

    // Internals

    fn write_line(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(b'\n');
    }

    fn write_fmt(&mut self, args: Arguments<'_>) {
        use std::io::Write;
        // Writing into a Vec cannot fail
        let _ = self.data.write_fmt(args);
    }

    /// Write a literal PDF string. Characters are mapped to single bytes
    /// (Latin-1 range); anything outside becomes '?' since the embedded
    /// fonts use a single-byte encoding.
    fn write_pdf_string(&mut self, text: &str) {
        self.data.push(b'(');
        for c in text.chars() {
            let byte = if (c as u32) <= 0xFF { c as u32 as u8 } else { b'?' };
            match byte {
                b'(' | b')' | b'\\' => {
                    self.data.push(b'\\');
                    self.data.push(byte);
                }
                0x0A => self.data.extend_from_slice(b"\\n"),
                0x0D => self.data.extend_from_slice(b"\\r"),
                _ => self.data.push(byte),
            }
        }
        self.data.push(b')');
    }
}

/// Format a coordinate or factor for a content stream
fn fmt_num(n: f64) -> String {
    super::objects::format_real(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_str(content: &ContentStream) -> String {
        String::from_utf8(content.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_path_operators() {
        let mut content = ContentStream::new();
        content
            .save_state()
            .set_stroke_rgb(1.0, 0.0, 0.0)
            .set_line_width(2.0)
            .set_line_cap(LineCap::Round)
            .move_to(10.0, 20.0)
            .line_to(30.0, 40.0)
            .stroke()
            .restore_state();

        let out = as_str(&content);
        assert!(out.contains("1.0 0.0 0.0 RG"));
        assert!(out.contains("2.0 w"));
        assert!(out.contains("1 J"));
        assert!(out.contains("10.0 20.0 m"));
        assert!(out.contains("30.0 40.0 l"));
        assert!(out.contains("S\n"));
    }

    #[test]
    fn test_text_operators() {
        let mut content = ContentStream::new();
        content
            .begin_text()
            .set_font("F1", 12.0)
            .set_text_matrix(1.0, 0.0, 0.0, 1.0, 72.0, 700.0)
            .show_text("Hi (there)")
            .end_text();

        let out = as_str(&content);
        assert!(out.contains("BT"));
        assert!(out.contains("/F1 12.0 Tf"));
        assert!(out.contains("(Hi \\(there\\)) Tj"));
        assert!(out.contains("ET"));
    }

    #[test]
    fn test_ext_g_state_and_xobject() {
        let mut content = ContentStream::new();
        content.set_ext_g_state("GS1").draw_xobject("Bg");

        let out = as_str(&content);
        assert!(out.contains("/GS1 gs"));
        assert!(out.contains("/Bg Do"));
    }

    #[test]
    fn test_non_latin1_replaced() {
        let mut content = ContentStream::new();
        content.show_text("a\u{4e2d}b");
        assert!(as_str(&content).contains("(a?b)"));
    }
}
