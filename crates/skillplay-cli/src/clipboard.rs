use skillplay_core::ports::ClipboardPort;

/// A terminal has no clipboard the playground can reach: copied text is
/// printed on stdout for the user to pick up.
pub struct StdoutClipboard;

impl ClipboardPort for StdoutClipboard {
    fn write_text(&self, text: &str) -> skillplay_core::Result<()> {
        println!("{text}");
        Ok(())
    }
}
