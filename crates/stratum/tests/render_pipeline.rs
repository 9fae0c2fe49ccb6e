//! Whole-pipeline checks: node trees rendered frame after frame, with the
//! emitted bytes replayed into a text-only terminal model.
//!
//! After every frame the model must show the same characters as the
//! session's composite grid, whether the frame went out as a full repaint
//! or as a diff.

use proptest::prelude::*;
use stratum::prelude::*;
use stratum::{CellGrid, ColorDepth, FrameStats, LayerId, WrapMode};
use stratum_core::text_width::char_width;

/// A terminal that tracks characters and the cursor, ignoring colors.
struct TextScreen {
    width: u16,
    height: u16,
    rows: Vec<Vec<char>>,
    cursor: (u16, u16),
}

impl TextScreen {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            rows: vec![vec![' '; width as usize]; height as usize],
            cursor: (0, 0),
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        *self = Self::new(width, height);
    }

    fn feed(&mut self, bytes: &[u8]) {
        let text = std::str::from_utf8(bytes).expect("output is utf-8");
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch != '\x1b' {
                self.print(ch);
                continue;
            }
            assert_eq!(chars.next(), Some('['));
            let private = chars.next_if_eq(&'?').is_some();
            let mut raw = String::new();
            let final_byte = loop {
                let c = chars.next().expect("unterminated CSI");
                if c.is_ascii_digit() || c == ';' {
                    raw.push(c);
                } else {
                    break c;
                }
            };
            if private {
                continue;
            }
            let params: Vec<u16> = raw.split(';').filter_map(|p| p.parse().ok()).collect();
            match final_byte {
                'H' => {
                    let row = params.first().copied().unwrap_or(1).max(1) - 1;
                    let col = params.get(1).copied().unwrap_or(1).max(1) - 1;
                    self.cursor = (col, row);
                }
                'J' => {
                    for row in &mut self.rows {
                        row.fill(' ');
                    }
                }
                'K' => {
                    let (x, y) = self.cursor;
                    if let Some(row) = self.rows.get_mut(y as usize) {
                        row[x as usize..].fill(' ');
                    }
                }
                'm' => {}
                other => panic!("unexpected CSI {other:?}"),
            }
        }
    }

    fn print(&mut self, ch: char) {
        let w = char_width(ch) as u16;
        let (x, y) = self.cursor;
        if w > 0 && y < self.height && x + w <= self.width {
            self.rows[y as usize][x as usize] = ch;
            if w == 2 {
                self.rows[y as usize][x as usize + 1] = '\0';
            }
        }
        self.cursor.0 = x.saturating_add(w);
    }

    fn assert_matches(&self, grid: &CellGrid) {
        assert_eq!((self.width, self.height), (grid.width(), grid.height()));
        for y in 0..self.height {
            for x in 0..self.width {
                let Some(cell) = grid.get_cell(x, y) else {
                    continue;
                };
                if cell.is_continuation() {
                    continue;
                }
                assert_eq!(
                    self.rows[y as usize][x as usize],
                    cell.display_char(),
                    "mismatch at ({x}, {y}):\n{}",
                    self.text()
                );
            }
        }
    }

    fn text(&self) -> String {
        self.rows
            .iter()
            .map(|r| r.iter().filter(|c| **c != '\0').collect::<String>().trim_end().to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn row(&self, y: usize) -> String {
        self.rows[y].iter().filter(|c| **c != '\0').collect::<String>().trim_end().to_string()
    }
}

struct Harness {
    session: RenderSession,
    screen: TextScreen,
}

impl Harness {
    fn new(width: u16, height: u16) -> Self {
        let config = RenderConfig::default().color_depth(ColorDepth::TrueColor).sync_output(true);
        Self {
            session: RenderSession::with_config(config, width, height),
            screen: TextScreen::new(width, height),
        }
    }

    fn frame(&mut self, root: &Node) -> FrameStats {
        let mut out = Vec::new();
        let stats = self.session.render(root, &mut out).expect("write to Vec");
        self.screen.feed(&out);
        self.screen.assert_matches(self.session.composite_grid());
        stats
    }

    fn resize(&mut self, width: u16, height: u16) {
        self.session.resize(width, height);
        self.screen.resize(width, height);
    }
}

fn app(count: u32, show_popup: bool) -> Node {
    let header = Node::new(NodeId(2))
        .with_style(
            Style::new()
                .flex_direction(FlexDirection::Row)
                .justify_content(JustifyContent::SpaceBetween)
                .border(BorderStyle::Rounded),
        )
        .child(Node::text(NodeId(20), "stratum"))
        .child(Node::text(NodeId(21), format!("count {count}")));

    let body = Node::new(NodeId(3))
        .with_style(Style::new().padding(Sides::horizontal(1)))
        .with_children((0..3).map(|i| {
            Node::text(NodeId(30 + i), format!("row {i}: {}", "#".repeat((count as usize + i as usize) % 12)))
                .with_style(Style::new().text_wrap(WrapMode::Char))
        }));

    let mut popup_style = Style::new()
        .position(Position::Absolute)
        .top(2)
        .left(4)
        .z_index(5)
        .border(BorderStyle::Single)
        .bg(PackedRgba::rgb(30, 30, 60));
    if !show_popup {
        popup_style = popup_style.display(Display::None);
    }
    let popup = Node::text(NodeId(9), "saved!").with_style(popup_style);

    Node::new(NodeId(1))
        .with_style(Style::new().position(Position::Relative))
        .child(header)
        .child(body)
        .child(popup)
}

#[test]
fn header_and_body_reach_the_terminal() {
    let mut h = Harness::new(30, 8);
    let stats = h.frame(&app(3, false));
    assert!(stats.full_repaint);
    assert_eq!(h.screen.row(0), "╭────────────────────────────╮");
    assert_eq!(h.screen.row(1), "│stratum              count 3│");
    assert_eq!(h.screen.row(3), " row 0: ###");
}

#[test]
fn counter_updates_go_out_as_diffs() {
    let mut h = Harness::new(30, 8);
    h.frame(&app(1, false));
    let stats = h.frame(&app(2, false));
    assert!(!stats.full_repaint);
    assert!(stats.cells_changed > 0);
    assert!(h.screen.row(1).ends_with("count 2│"));
}

#[test]
fn popup_layer_comes_and_goes() {
    let mut h = Harness::new(30, 8);
    h.frame(&app(1, false));
    let with_popup = h.frame(&app(1, true));
    assert_eq!(with_popup.layers, 2);
    assert_eq!(h.screen.row(2), "╰───┌──────┐─────────────────╯");
    assert_eq!(h.screen.row(3), " row│saved!│");

    h.frame(&app(1, false));
    assert_eq!(h.screen.row(3), " row 0: #");
    let popup_layer = h.session.layers().get(LayerId::for_node(NodeId(9)));
    assert_eq!(popup_layer.map(|l| l.is_visible()), Some(false));
}

#[test]
fn resize_repaints_everything() {
    let mut h = Harness::new(30, 8);
    h.frame(&app(1, true));
    h.resize(40, 10);
    let stats = h.frame(&app(1, true));
    assert!(stats.full_repaint);
    assert_eq!(h.screen.row(1).chars().count(), 40);
}

#[test]
fn narrow_screens_still_match() {
    let mut h = Harness::new(12, 10);
    h.frame(&app(7, true));
    h.frame(&app(8, true));
    h.resize(9, 12);
    h.frame(&app(8, false));
}

proptest! {
    #[test]
    fn any_frame_sequence_keeps_the_terminal_in_sync(
        frames in proptest::collection::vec((0u32..40, any::<bool>()), 1..12),
        width in 10u16..50,
        height in 4u16..14,
    ) {
        let mut h = Harness::new(width, height);
        for (count, popup) in frames {
            h.frame(&app(count, popup));
        }
    }
}
