//! Terminal front end built on crossterm.
//!
//! Interactive mode takes over the terminal (raw mode, alternate screen) and
//! repaints the whole chart every frame from one buffered write. Inline mode
//! prints a single frame into the normal scrollback, for stills.

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{
        self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode,
        enable_raw_mode,
    },
};

use crate::{
    core::{Lang, parse_hex_rgb},
    dataset::HistoryEvent,
    error::{RaceError, RaceResult},
    surface::{BarFrame, RenderSurface},
};

/// Left column reserved for rank and country name.
const NAME_COLS: u16 = 26;
/// Right column reserved for the value label.
const VALUE_COLS: u16 = 18;
/// Year banner plus axis line.
const HEADER_ROWS: u16 = 2;
const FALLBACK_SIZE: (u16, u16) = (100, 30);

pub struct TermSurface {
    out: Stdout,
    lang: Lang,
    interactive: bool,
    restored: bool,
    event_visible: bool,
}

impl TermSurface {
    /// Full-screen mode. The terminal is restored on drop.
    pub fn interactive(lang: Lang) -> RaceResult<Self> {
        let mut out = io::stdout();
        enable_raw_mode()
            .map_err(|e| RaceError::animation(format!("failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(out, EnterAlternateScreen, Hide) {
            // Leave the terminal usable if only the second step failed.
            let _ = disable_raw_mode();
            return Err(RaceError::animation(format!(
                "failed to enter alternate screen: {e}"
            )));
        }
        Ok(Self {
            out,
            lang,
            interactive: true,
            restored: false,
            event_visible: false,
        })
    }

    /// Scrollback mode: frames print sequentially without touching the
    /// terminal state.
    pub fn inline(lang: Lang) -> Self {
        Self {
            out: io::stdout(),
            lang,
            interactive: false,
            restored: true,
            event_visible: false,
        }
    }

    fn size(&self) -> (u16, u16) {
        terminal::size().unwrap_or(FALLBACK_SIZE)
    }

    fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        if let Err(err) = execute!(self.out, Show, LeaveAlternateScreen) {
            tracing::error!(?err, "failed to leave alternate screen");
        }
        if let Err(err) = disable_raw_mode() {
            tracing::error!(?err, "failed to disable raw mode");
        }
    }

    fn render_interactive(&self, frame: &BarFrame<'_>) -> io::Result<Vec<u8>> {
        let (cols, rows) = self.size();
        let bar_area = cols.saturating_sub(NAME_COLS + VALUE_COLS).max(10);
        let plot_rows = rows.saturating_sub(HEADER_ROWS + 1).max(1);

        let mut buf = Vec::with_capacity(4096);
        queue!(buf, Clear(ClearType::All), MoveTo(0, 0))?;

        let title = match self.lang {
            Lang::En => "Global GDP Ranking Dynamics",
            Lang::Zh => "全球 GDP 历年排名动态竞赛",
        };
        queue!(
            buf,
            SetAttribute(Attribute::Bold),
            Print(format!(
                "{title}  {}  ({:.0}%)",
                frame.decimal_year.floor() as i64,
                frame.progress * 100.0
            )),
            SetAttribute(Attribute::Reset),
        )?;

        // Axis line under the header, tick labels sitting where their value
        // falls inside the bar area.
        queue!(buf, MoveTo(0, 1), SetForegroundColor(Color::DarkGrey))?;
        let mut axis = vec![b' '; cols as usize];
        if frame.axis_max > 0.0 {
            for &tick in &frame.ticks {
                let col = NAME_COLS as usize
                    + ((tick / frame.axis_max) * bar_area as f64).round() as usize;
                let label = format_tick(tick);
                if col + label.len() < cols as usize {
                    axis[col..col + label.len()].copy_from_slice(label.as_bytes());
                }
            }
        }
        queue!(buf, Print(String::from_utf8_lossy(&axis).into_owned()), ResetColor)?;

        // Lowest rank first so the leader wins row collisions.
        for bar in frame.bars.iter().rev() {
            let row_f = bar.y / frame.plot_height * plot_rows as f64;
            if !(0.0..plot_rows as f64).contains(&row_f) {
                continue; // still entering from below
            }
            let row = HEADER_ROWS + row_f as u16;

            let color = parse_hex_rgb(&bar.meta.color)
                .map(|(r, g, b)| Color::Rgb { r, g, b })
                .unwrap_or(Color::White);

            let crown = if bar.rank == 0 { "👑" } else { "  " };
            let name = clip(bar.meta.display_name(self.lang), NAME_COLS as usize - 6);
            let filled = if frame.axis_max > 0.0 {
                ((bar.value / frame.axis_max) * bar_area as f64).round() as usize
            } else {
                0
            }
            .clamp(1, bar_area as usize);

            queue!(
                buf,
                MoveTo(0, row),
                Print(format!("{:>2} {crown} {name:<w$}", bar.rank + 1, w = NAME_COLS as usize - 6)),
                SetForegroundColor(color),
                Print("█".repeat(filled)),
                ResetColor,
                Print(format!(" {}", format_value(bar.value, self.lang))),
            )?;
        }

        queue!(
            buf,
            MoveTo(0, rows.saturating_sub(1)),
            SetForegroundColor(Color::DarkGrey),
            Print(match self.lang {
                Lang::En => "q to quit",
                Lang::Zh => "按 q 退出",
            }),
            ResetColor,
        )?;
        Ok(buf)
    }

    fn render_inline(&self, frame: &BarFrame<'_>) -> io::Result<Vec<u8>> {
        let (cols, _) = self.size();
        let bar_area = cols.saturating_sub(NAME_COLS + VALUE_COLS).max(10) as usize;

        let mut buf = Vec::with_capacity(2048);
        queue!(
            buf,
            Print(format!("== {:.2} ==\n", frame.decimal_year)),
        )?;
        for bar in &frame.bars {
            let color = parse_hex_rgb(&bar.meta.color)
                .map(|(r, g, b)| Color::Rgb { r, g, b })
                .unwrap_or(Color::White);
            let name = clip(bar.meta.display_name(self.lang), NAME_COLS as usize - 4);
            let filled = if frame.axis_max > 0.0 {
                ((bar.value / frame.axis_max) * bar_area as f64).round() as usize
            } else {
                0
            }
            .clamp(1, bar_area);

            queue!(
                buf,
                Print(format!("{:>2} {name:<w$} ", bar.rank + 1, w = NAME_COLS as usize - 4)),
                SetForegroundColor(color),
                Print("█".repeat(filled)),
                ResetColor,
                Print(format!(" {}\n", format_value(bar.value, self.lang))),
            )?;
        }
        Ok(buf)
    }

    fn render_event(&self, event: &HistoryEvent) -> io::Result<Vec<u8>> {
        let (cols, rows) = self.size();
        let box_w = (cols / 2).clamp(30, 70);
        let inner = box_w as usize - 4;
        let (desc_label, impact_label) = match self.lang {
            Lang::En => ("Description", "Impact"),
            Lang::Zh => ("事件描述", "历史影响"),
        };

        let mut lines = Vec::new();
        lines.push(format!("{} · {}", event.year, event.title(self.lang)));
        lines.push(event.title(self.lang.other()).to_owned());
        lines.push(String::new());
        lines.push(format!("{desc_label}:"));
        lines.extend(wrap(event.description(self.lang), inner));
        lines.push(String::new());
        lines.push(format!("{impact_label}:"));
        lines.extend(wrap(event.impact(self.lang), inner));

        let box_h = lines.len() as u16 + 2;
        let left = cols.saturating_sub(box_w) / 2;
        let top = rows.saturating_sub(box_h) / 2;

        let mut buf = Vec::with_capacity(2048);
        if self.interactive {
            queue!(
                buf,
                MoveTo(left, top),
                Print(format!("┌{}┐", "─".repeat(box_w as usize - 2))),
            )?;
            for (i, line) in lines.iter().enumerate() {
                queue!(
                    buf,
                    MoveTo(left, top + 1 + i as u16),
                    Print(format!("│ {} │", pad(line, box_w as usize - 4))),
                )?;
            }
            queue!(
                buf,
                MoveTo(left, top + box_h - 1),
                Print(format!("└{}┘", "─".repeat(box_w as usize - 2))),
            )?;
        } else {
            for line in &lines {
                queue!(buf, Print(format!("{line}\n")))?;
            }
        }
        Ok(buf)
    }

    fn flush_buf(&mut self, buf: Vec<u8>) -> io::Result<()> {
        self.out.write_all(&buf)?;
        self.out.flush()
    }
}

impl RenderSurface for TermSurface {
    fn draw_frame(&mut self, frame: &BarFrame<'_>) -> RaceResult<()> {
        let buf = if self.interactive {
            self.render_interactive(frame)
        } else {
            self.render_inline(frame)
        }
        .map_err(|e| RaceError::animation(format!("failed to render frame: {e}")))?;
        self.flush_buf(buf)
            .map_err(|e| RaceError::animation(format!("failed to draw frame: {e}")))
    }

    fn show_event(&mut self, event: &HistoryEvent) -> RaceResult<()> {
        let buf = self
            .render_event(event)
            .map_err(|e| RaceError::animation(format!("failed to render event: {e}")))?;
        self.event_visible = true;
        self.flush_buf(buf)
            .map_err(|e| RaceError::animation(format!("failed to draw event: {e}")))
    }

    fn hide_event(&mut self) -> RaceResult<()> {
        if !self.event_visible {
            return Ok(());
        }
        self.event_visible = false;
        if self.interactive {
            // Next frame repaints everything; just drop the overlay.
            execute!(self.out, Clear(ClearType::All))
                .map_err(|e| RaceError::animation(format!("failed to clear overlay: {e}")))?;
        }
        Ok(())
    }
}

impl Drop for TermSurface {
    fn drop(&mut self) {
        if self.interactive {
            self.restore();
        }
    }
}

/// Non-blocking check for a quit key: `q`, Esc, or Ctrl+C (raw mode eats the
/// usual SIGINT).
pub fn quit_requested() -> RaceResult<bool> {
    loop {
        let pending = event::poll(Duration::ZERO)
            .map_err(|e| RaceError::animation(format!("failed to poll terminal events: {e}")))?;
        if !pending {
            return Ok(false);
        }
        let ev = event::read()
            .map_err(|e| RaceError::animation(format!("failed to read terminal event: {e}")))?;
        if let Event::Key(key) = ev {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(true);
                }
                _ => {}
            }
        }
    }
}

fn clip(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn pad(s: &str, width: usize) -> String {
    let clipped = clip(s, width);
    let shortfall = width.saturating_sub(clipped.chars().count());
    format!("{clipped}{}", " ".repeat(shortfall))
}

fn wrap(s: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in s.chars() {
        current.push(ch);
        count += 1;
        if count >= width {
            lines.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// `$1,234.56 B USD` with thousands grouping, unit per language.
fn format_value(v: f64, lang: Lang) -> String {
    let unit = match lang {
        Lang::En => "B USD",
        Lang::Zh => "10亿美元",
    };
    format!("${} {unit}", group_thousands(v))
}

fn group_thousands(v: f64) -> String {
    let formatted = format!("{v:.2}");
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{frac_part}")
}

/// Compact axis label: billions below a trillion, `$xT` above.
fn format_tick(v: f64) -> String {
    if v >= 1000.0 {
        let t = v / 1000.0;
        if (t - t.round()).abs() < 1e-9 {
            format!("${t:.0}T")
        } else {
            format!("${t:.1}T")
        }
    } else {
        format!("${v:.0}B")
    }
}
