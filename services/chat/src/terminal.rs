//! Terminal Rendering
//!
//! Prints page updates as they arrive. A terminal cannot rewrite a bubble in
//! place, so a settled typing placeholder is printed again as a new line.

use aidwin_core::{
    PageUpdate,
    conversation::Bubble,
    message::{AudioClip, Body},
};
use std::io::{self, Write};
use tokio::sync::mpsc;

const PROGRESS_BAR_WIDTH: usize = 20;
const WAVEFORM_GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub struct TerminalRenderer<W: Write> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn render(&mut self, update: &PageUpdate) -> io::Result<()> {
        match update {
            PageUpdate::SessionAssigned { label } => writeln!(self.out, "── {} ──", label)?,
            PageUpdate::BubbleAppended { bubble } if bubble.is_typing() => {
                writeln!(self.out, "{} is typing…", bubble.author)?
            }
            PageUpdate::BubbleAppended { bubble } | PageUpdate::BubbleReplaced { bubble } => {
                writeln!(self.out, "{}", format_bubble(bubble))?
            }
            PageUpdate::Progress { percent } => {
                writeln!(self.out, "Progress {}", progress_bar(*percent))?
            }
            PageUpdate::Recording { active: true } => {
                writeln!(self.out, "● Recording… type /mic to stop.")?
            }
            PageUpdate::Recording { active: false } => writeln!(self.out, "Recording stopped.")?,
            PageUpdate::PlaybackStarted { seconds } => {
                writeln!(self.out, "▶ Playing voice message ({:.1}s)", seconds)?
            }
            PageUpdate::Connectivity { label, .. } => writeln!(self.out, "Status: {}", label)?,
            PageUpdate::FocusInput => write!(self.out, "> ")?,
            PageUpdate::InputCleared
            | PageUpdate::SendEnabled { .. }
            | PageUpdate::Loading { .. } => {}
        }
        self.out.flush()
    }
}

/// Drains `rx` until every sender is gone.
pub async fn render_updates<W: Write>(
    mut rx: mpsc::UnboundedReceiver<PageUpdate>,
    out: W,
) -> io::Result<()> {
    let mut renderer = TerminalRenderer::new(out);
    while let Some(update) = rx.recv().await {
        renderer.render(&update)?;
    }
    Ok(())
}

pub fn format_bubble(bubble: &Bubble) -> String {
    let body = match &bubble.body {
        Body::Text(text) => text.clone(),
        Body::Html(html) => strip_html(html),
        Body::Audio(clip) => format_audio(clip),
        Body::Typing => "…".to_string(),
    };
    match &bubble.timestamp {
        Some(ts) => format!("[{}] {}: {}", ts, bubble.author, body),
        None => format!("{}: {}", bubble.author, body),
    }
}

fn format_audio(clip: &AudioClip) -> String {
    let bars: String = clip
        .waveform
        .iter()
        .map(|&h| {
            let idx = (h.saturating_sub(5) as usize * WAVEFORM_GLYPHS.len()) / 30;
            WAVEFORM_GLYPHS[idx.min(WAVEFORM_GLYPHS.len() - 1)]
        })
        .collect();
    format!("▶ {} ({} bytes, /play to listen)", bars, clip.data_url.len())
}

pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(PROGRESS_BAR_WIDTH);
    format!(
        "[{}{}] {:.0}%",
        "#".repeat(filled),
        ".".repeat(PROGRESS_BAR_WIDTH - filled),
        percent
    )
}

/// Reduces an HTML fragment to readable text: tags are dropped, line-level
/// elements become line breaks and the common entities are decoded.
pub fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut chars = html.chars();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let tag: String = chars.by_ref().take_while(|&c| c != '>').collect();
                let name = tag
                    .trim_start_matches('/')
                    .split(|c: char| c.is_whitespace() || c == '/')
                    .next()
                    .unwrap_or_default()
                    .to_lowercase();
                let closing = tag.starts_with('/');
                let block_end = matches!(name.as_str(), "p" | "div" | "li" | "h1" | "h2" | "h3");
                let breaks = name == "br" || (closing && block_end);
                if breaks {
                    text.push('\n');
                }
            }
            '&' => {
                let mut entity = String::new();
                let mut terminated = false;
                for e in chars.by_ref() {
                    if e == ';' {
                        terminated = true;
                        break;
                    }
                    entity.push(e);
                    if entity.len() > 8 {
                        break;
                    }
                }
                match (terminated, decode_entity(&entity)) {
                    (true, Some(decoded)) => text.push(decoded),
                    _ => {
                        text.push('&');
                        text.push_str(&entity);
                        if terminated {
                            text.push(';');
                        }
                    }
                }
            }
            _ => text.push(c),
        }
    }
    text.trim_end().to_string()
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" | "#39" => Some('\''),
        "nbsp" => Some(' '),
        _ => None,
    }
}
