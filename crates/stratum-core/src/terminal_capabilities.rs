#![forbid(unsafe_code)]

//! Terminal capability detection.
//!
//! The renderer only needs to know two things about the terminal: how many
//! colors it can show and whether synchronized output (DEC 2026) is safe.
//! Both are decided from environment variables, never by probing the
//! terminal, so detection is deterministic for a given environment.
//!
//! | Variable | Effect |
//! |---|---|
//! | `NO_COLOR` | forces [`ColorDepth::NoColor`] |
//! | `TERM` | `dumb`/empty disables everything; `*256*` enables 256 colors |
//! | `COLORTERM` | `truecolor`/`24bit` enables RGB |
//! | `TERM_PROGRAM` | known modern terminals enable RGB and sync output |
//! | `TMUX`, `STY`, `ZELLIJ` | multiplexer: sync output is disabled |
//! | `WT_SESSION` | Windows Terminal: RGB even without `TERM` |
//!
//! Inside a multiplexer, sync-output sequences are unreliable through
//! passthrough, so [`TerminalCapabilities::use_sync_output`] is false there
//! regardless of the host terminal.

use std::env;
use std::fmt;
use std::str::FromStr;

/// Number of colors the output may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ColorDepth {
    /// No color sequences at all; attributes only.
    NoColor,
    /// The 16 ANSI colors (SGR 30-37, 90-97).
    Ansi16,
    /// The xterm 256-color palette (SGR 38;5;n).
    Ansi256,
    /// 24-bit RGB (SGR 38;2;r;g;b).
    #[default]
    TrueColor,
}

impl ColorDepth {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoColor => "none",
            Self::Ansi16 => "16",
            Self::Ansi256 => "256",
            Self::TrueColor => "truecolor",
        }
    }
}

impl fmt::Display for ColorDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized color depth name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorDepthError(pub String);

impl fmt::Display for ParseColorDepthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown color depth {:?} (expected none, 16, 256, or truecolor)",
            self.0
        )
    }
}

impl std::error::Error for ParseColorDepthError {}

impl FromStr for ColorDepth {
    type Err = ParseColorDepthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "mono" | "0" | "off" => Ok(Self::NoColor),
            "16" | "ansi" | "ansi16" => Ok(Self::Ansi16),
            "256" | "ansi256" => Ok(Self::Ansi256),
            "truecolor" | "24bit" | "rgb" => Ok(Self::TrueColor),
            _ => Err(ParseColorDepthError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct DetectInputs {
    no_color: bool,
    term: String,
    term_program: String,
    colorterm: String,
    in_tmux: bool,
    in_screen: bool,
    in_zellij: bool,
    wt_session: bool,
}

impl DetectInputs {
    fn from_env() -> Self {
        Self {
            no_color: env::var("NO_COLOR").is_ok(),
            term: env::var("TERM").unwrap_or_default(),
            term_program: env::var("TERM_PROGRAM").unwrap_or_default(),
            colorterm: env::var("COLORTERM").unwrap_or_default(),
            in_tmux: env::var("TMUX").is_ok(),
            in_screen: env::var("STY").is_ok(),
            in_zellij: env::var("ZELLIJ").is_ok(),
            wt_session: env::var("WT_SESSION").is_ok(),
        }
    }
}

const MODERN_TERMINALS: &[&str] = &[
    "iTerm.app",
    "WezTerm",
    "Alacritty",
    "Ghostty",
    "kitty",
    "Rio",
    "Hyper",
    "Contour",
    "vscode",
];

const SYNC_OUTPUT_TERMINALS: &[&str] = &["WezTerm", "Alacritty", "Ghostty", "kitty", "Contour"];

/// What the output terminal can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalCapabilities {
    pub true_color: bool,
    pub colors_256: bool,
    /// Basic 16-color support. False only for dumb terminals and `NO_COLOR`.
    pub colors_16: bool,
    pub sync_output: bool,
    pub in_tmux: bool,
    pub in_screen: bool,
    pub in_zellij: bool,
}

impl Default for TerminalCapabilities {
    fn default() -> Self {
        Self::basic()
    }
}

impl TerminalCapabilities {
    /// Detect from the process environment.
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_from_inputs(&DetectInputs::from_env())
    }

    fn detect_from_inputs(env: &DetectInputs) -> Self {
        let term = env.term.as_str();
        let term_program = env.term_program.as_str();
        let colorterm = env.colorterm.as_str();

        let is_dumb = term == "dumb" || (term.is_empty() && !env.wt_session);
        let is_kitty = term.contains("kitty");
        let is_modern = env.wt_session
            || MODERN_TERMINALS
                .iter()
                .any(|t| term_program.contains(t) || term.contains(&t.to_lowercase()));

        let colors_16 = !env.no_color && !is_dumb;
        let true_color = colors_16
            && (colorterm.contains("truecolor")
                || colorterm.contains("24bit")
                || is_modern
                || is_kitty);
        let colors_256 = colors_16 && (true_color || term.contains("256"));
        let sync_output = !is_dumb
            && (is_kitty || SYNC_OUTPUT_TERMINALS.iter().any(|t| term_program.contains(t)));

        Self {
            true_color,
            colors_256,
            colors_16,
            sync_output,
            in_tmux: env.in_tmux,
            in_screen: env.in_screen,
            in_zellij: env.in_zellij,
        }
    }

    /// Safe on any terminal: no color, no sync output.
    #[must_use]
    pub const fn basic() -> Self {
        Self {
            true_color: false,
            colors_256: false,
            colors_16: false,
            sync_output: false,
            in_tmux: false,
            in_screen: false,
            in_zellij: false,
        }
    }

    /// Everything on, no multiplexer.
    #[must_use]
    pub const fn modern() -> Self {
        Self {
            true_color: true,
            colors_256: true,
            colors_16: true,
            sync_output: true,
            in_tmux: false,
            in_screen: false,
            in_zellij: false,
        }
    }

    #[inline]
    pub const fn in_any_mux(&self) -> bool {
        self.in_tmux || self.in_screen || self.in_zellij
    }

    /// Best color depth this terminal supports.
    pub const fn color_depth(&self) -> ColorDepth {
        if self.true_color {
            ColorDepth::TrueColor
        } else if self.colors_256 {
            ColorDepth::Ansi256
        } else if self.colors_16 {
            ColorDepth::Ansi16
        } else {
            ColorDepth::NoColor
        }
    }

    /// Whether to wrap frames in DEC 2026 begin/end.
    #[inline]
    pub const fn use_sync_output(&self) -> bool {
        if self.in_any_mux() {
            return false;
        }
        self.sync_output
    }
}

/// Current terminal size as `(columns, rows)`, falling back to 80x24 when
/// there is no terminal attached.
pub fn terminal_size() -> (u16, u16) {
    #[cfg(not(target_arch = "wasm32"))]
    {
        match crossterm::terminal::size() {
            Ok((cols, rows)) if cols > 0 && rows > 0 => (cols, rows),
            _ => (80, 24),
        }
    }
    #[cfg(target_arch = "wasm32")]
    {
        (80, 24)
    }
}
