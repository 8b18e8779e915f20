pub mod test_helpers {
    use crate::event_source::{Event, KeyCode, KeyEvent, KeyModifiers, SimulatedEventSource};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::path::Path;

    /// Builder for creating test scenarios with simulated user input
    pub struct TestScenarioBuilder {
        events: Vec<Event>,
    }

    impl Default for TestScenarioBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestScenarioBuilder {
        pub fn new() -> Self {
            Self { events: Vec::new() }
        }

        /// Add a character key press
        pub fn press_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::char_key(c));
            self
        }

        /// Add a Ctrl+character key press
        pub fn press_ctrl_char(mut self, c: char) -> Self {
            self.events.push(SimulatedEventSource::ctrl_char_key(c));
            self
        }

        /// Add a bare key press
        pub fn press_key(mut self, code: KeyCode) -> Self {
            self.events.push(Event::Key(KeyEvent {
                code,
                modifiers: KeyModifiers::empty(),
                kind: crossterm::event::KeyEventKind::Press,
                state: crossterm::event::KeyEventState::empty(),
            }));
            self
        }

        /// Press Enter
        pub fn press_enter(self) -> Self {
            self.press_key(KeyCode::Enter)
        }

        /// Press Escape
        pub fn press_esc(self) -> Self {
            self.press_key(KeyCode::Esc)
        }

        /// Press Tab
        pub fn press_tab(self) -> Self {
            self.press_key(KeyCode::Tab)
        }

        /// Type a string one character at a time
        pub fn type_text(mut self, text: &str) -> Self {
            for c in text.chars() {
                self.events.push(SimulatedEventSource::char_key(c));
            }
            self
        }

        /// Go to the next page (press 'l')
        pub fn next_page(self) -> Self {
            self.press_char('l')
        }

        /// Go to the previous page (press 'h')
        pub fn prev_page(self) -> Self {
            self.press_char('h')
        }

        /// Jump to a page through the go-to prompt (1-indexed, as typed)
        pub fn goto_page(self, page: usize) -> Self {
            self.press_char(':')
                .type_text(&page.to_string())
                .press_enter()
        }

        /// Move down n times (press 'j' n times)
        pub fn navigate_down(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('j'));
            }
            self
        }

        /// Move up n times (press 'k' n times)
        pub fn navigate_up(mut self, times: usize) -> Self {
            for _ in 0..times {
                self.events.push(SimulatedEventSource::char_key('k'));
            }
            self
        }

        /// Add an already built event
        pub fn event(mut self, event: Event) -> Self {
            self.events.push(event);
            self
        }

        /// Quit the application (press 'q'). Every scenario must end with
        /// this or the event loop never returns.
        pub fn quit(mut self) -> Self {
            self.events.push(SimulatedEventSource::char_key('q'));
            self
        }

        /// Build the simulated event source
        pub fn build(self) -> SimulatedEventSource {
            SimulatedEventSource::new(self.events)
        }
    }

    /// Create a test terminal for snapshot testing
    pub fn create_test_terminal(width: u16, height: u16) -> Terminal<TestBackend> {
        let backend = TestBackend::new(width, height);
        Terminal::new(backend).unwrap()
    }

    /// Capture the current terminal buffer as a string
    pub fn capture_terminal_state(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut lines = Vec::new();

        for y in 0..buffer.area.height {
            let mut line = String::new();
            for x in 0..buffer.area.width {
                line.push_str(buffer[(x, y)].symbol());
            }
            // Trim trailing whitespace from each line
            lines.push(line.trim_end().to_string());
        }

        // Remove trailing empty lines
        while lines.last().is_some_and(|line| line.is_empty()) {
            lines.pop();
        }

        lines.join("\n")
    }

    /// Write a small but well-formed PDF with the given number of pages.
    ///
    /// Every page carries "Page N" and "texto de prueba pagina N" so tests
    /// can search for terms that hit one page or all of them.
    pub fn write_minimal_pdf(path: &Path, pages: usize) -> std::io::Result<()> {
        let pages = pages.max(1);
        let mut buf: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = Vec::new();

        buf.extend_from_slice(b"%PDF-1.4\n");

        let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", 4 + i * 2)).collect();

        offsets.push(buf.len());
        buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        offsets.push(buf.len());
        buf.extend_from_slice(
            format!(
                "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {pages} >>\nendobj\n",
                kids.join(" ")
            )
            .as_bytes(),
        );

        offsets.push(buf.len());
        buf.extend_from_slice(
            b"3 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>\nendobj\n",
        );

        for i in 0..pages {
            let page_obj = 4 + i * 2;
            let content_obj = page_obj + 1;

            offsets.push(buf.len());
            buf.extend_from_slice(
                format!(
                    "{page_obj} 0 obj\n<< /Type /Page /Parent 2 0 R \
                     /MediaBox [0 0 612 792] \
                     /Resources << /Font << /F1 3 0 R >> >> \
                     /Contents {content_obj} 0 R >>\nendobj\n"
                )
                .as_bytes(),
            );

            let content = format!(
                "BT /F1 24 Tf 72 700 Td (Page {n}) Tj ET\n\
                 BT /F1 12 Tf 72 660 Td (texto de prueba pagina {n}) Tj ET\n",
                n = i + 1
            );
            offsets.push(buf.len());
            buf.extend_from_slice(
                format!(
                    "{content_obj} 0 obj\n<< /Length {} >>\nstream\n{content}endstream\nendobj\n",
                    content.len()
                )
                .as_bytes(),
            );
        }

        let object_count = offsets.len();
        let xref_offset = buf.len();
        buf.extend_from_slice(format!("xref\n0 {}\n", object_count + 1).as_bytes());
        buf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        buf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
                object_count + 1
            )
            .as_bytes(),
        );

        std::fs::write(path, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::*;

    #[test]
    fn scenario_builder_collects_events() {
        let scenario = TestScenarioBuilder::new()
            .navigate_down(2)
            .press_enter()
            .press_tab()
            .navigate_up(1)
            .quit()
            .build();

        assert_eq!(scenario.events.len(), 6);
    }

    #[test]
    fn goto_page_types_prompt_digits_and_enter() {
        let scenario = TestScenarioBuilder::new().goto_page(12).quit().build();

        // ':' + '1' + '2' + Enter + 'q'
        assert_eq!(scenario.events.len(), 5);
    }

    #[test]
    fn minimal_pdf_has_header_and_page_tree() {
        let dir = std::env::temp_dir().join(format!("hojear-pdf-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("three.pdf");

        write_minimal_pdf(&path, 3).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("/Count 3"));
        assert!(text.contains("(Page 3)"));
        assert!(text.trim_end().ends_with("%%EOF"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
