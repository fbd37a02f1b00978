// Copyright 2025 Tomoki Hayashi
// MIT License (https://opensource.org/licenses/MIT)

//! Interactive wallpaper grid.
//!
//! `Grid` owns every piece of mutable state and drives the event loop:
//! - selection and viewport tracking
//! - per-cell render cache (keyed by item index, re-keyed on deletion)
//! - background page fetching, delivered over a capacity-1 channel
//! - selective redraw: full repaint only when the viewport or item count
//!   changed, otherwise just the two cells whose selection state flipped
//!
//! Background threads never touch grid state. The stdin reader and the page
//! fetcher communicate by value through channels, so no locking is needed.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::{Read, Write as _, stdout};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use crossterm::{cursor, execute, terminal};
use rayon::prelude::*;
use tempfile::TempDir;

use crate::api::{Client, SearchOptions, Wallpaper};
use crate::input::{self, Action};
use crate::layout::{LABEL_HEIGHT, Layout};
use crate::render::{CellRenderer, center_pad, placeholder_block};
use crate::transfer;

const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

struct LoadResult {
    wallpapers: Vec<Wallpaper>,
    thumb_paths: Vec<PathBuf>,
    next_page: u32,
}

/// How the loop iteration ended.
enum Outcome {
    Continue,
    Quit,
    Selected(PathBuf),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Repaint {
    Full,
    Selection,
    None,
}

/// Classify the next redraw from the last-rendered snapshot. Any scroll or
/// item-count change needs a full repaint; a bare selection move repaints
/// only the two affected cells; otherwise nothing is written.
fn classify_repaint(
    prev_selected: Option<usize>,
    prev_scroll_row: usize,
    prev_count: usize,
    selected: usize,
    scroll_row: usize,
    count: usize,
) -> Repaint {
    match prev_selected {
        None => Repaint::Full,
        Some(_) if scroll_row != prev_scroll_row || count != prev_count => Repaint::Full,
        Some(prev) if prev != selected => Repaint::Selection,
        _ => Repaint::None,
    }
}

pub struct Grid {
    wallpapers: Vec<Wallpaper>,
    thumb_paths: Vec<PathBuf>,
    rendered: HashMap<usize, String>,
    renderer: Box<dyn CellRenderer>,
    download_dir: PathBuf,
    script: String,
    thumb_dir: TempDir,

    layout: Layout,
    selected: usize,
    scroll_row: usize,

    // last-rendered snapshot for redraw classification
    prev_selected: Option<usize>,
    prev_scroll_row: usize,
    prev_count: usize,

    show_help: bool,
    verbose: bool,

    client: Client,
    search_opts: SearchOptions,
    next_page: u32,
    last_page: u32,
    loading: bool,
    load_tx: Sender<LoadResult>,
    load_rx: Receiver<LoadResult>,
}

impl Grid {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        wallpapers: Vec<Wallpaper>,
        renderer: Box<dyn CellRenderer>,
        download_dir: PathBuf,
        script: String,
        client: Client,
        search_opts: SearchOptions,
        last_page: u32,
        verbose: bool,
    ) -> Result<Self> {
        let thumb_dir =
            TempDir::with_prefix("tapet-thumbs-").context("creating thumbnail dir")?;
        let (term_w, term_h) = terminal::size().unwrap_or((80, 24));
        let (load_tx, load_rx) = bounded(1);
        let thumb_paths = vec![PathBuf::new(); wallpapers.len()];

        Ok(Self {
            wallpapers,
            thumb_paths,
            rendered: HashMap::new(),
            renderer,
            download_dir,
            script,
            thumb_dir,
            layout: Layout::compute(term_w, term_h),
            selected: 0,
            scroll_row: 0,
            prev_selected: None,
            prev_scroll_row: 0,
            prev_count: 0,
            show_help: false,
            verbose,
            client,
            search_opts,
            next_page: 2,
            last_page,
            loading: false,
            load_tx,
            load_rx,
        })
    }

    /// Run the interactive UI. Returns the applied wallpaper's path if the
    /// user confirmed a selection, `None` if they quit.
    pub fn run(&mut self) -> Result<Option<PathBuf>> {
        terminal::enable_raw_mode().context("entering raw mode")?;
        let _guard = TerminalGuard;
        execute!(stdout(), cursor::Hide).context("hiding cursor")?;

        // First page thumbnails are fetched up front so the initial draw
        // shows images, not a wall of placeholders.
        self.prime_thumbs();

        // Read stdin in a thread so the loop can also wait on load results.
        let (input_tx, input_rx) = bounded::<Vec<u8>>(10);
        thread::spawn(move || {
            let mut stdin = std::io::stdin();
            let mut buf = [0u8; 16];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if input_tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.draw()?;
        self.maybe_load_more();

        let load_rx = self.load_rx.clone();
        loop {
            let outcome = select! {
                recv(input_rx) -> chunk => match chunk {
                    Ok(chunk) => self.handle_action(input::parse_chunk(&chunk))?,
                    // stdin is gone; nothing more can be selected
                    Err(_) => Outcome::Quit,
                },
                recv(load_rx) -> result => {
                    if let Ok(result) = result {
                        self.apply_load(result);
                    }
                    Outcome::Continue
                }
            };

            match outcome {
                Outcome::Continue => {}
                Outcome::Quit => {
                    clear_screen()?;
                    return Ok(None);
                }
                Outcome::Selected(path) => return Ok(Some(path)),
            }

            self.draw()?;
            self.maybe_load_more();
        }
    }

    fn handle_action(&mut self, action: Action) -> Result<Outcome> {
        match action {
            Action::Quit => return Ok(Outcome::Quit),

            Action::Up | Action::Down | Action::Left | Action::Right => {
                self.move_selection(action);
            }

            Action::Apply => {
                let Some(wp) = self.wallpapers.get(self.selected).cloned() else {
                    return Ok(Outcome::Continue);
                };
                clear_screen()?;
                restore_terminal();

                if self.verbose {
                    println!("Applying {}...", wp.id);
                }
                let path = transfer::download(&wp.path, &self.download_dir)
                    .context("downloading wallpaper")?;
                if self.verbose {
                    println!("Setting wallpaper: {}", path.display());
                }
                transfer::apply(&path, &self.script).context("setting wallpaper")?;
                return Ok(Outcome::Selected(path));
            }

            Action::ApplyStay => {
                if let Some(wp) = self.wallpapers.get(self.selected) {
                    let path = wp.path.clone();
                    let download_dir = self.download_dir.clone();
                    let script = self.script.clone();
                    // Best-effort; the grid stays interactive either way.
                    thread::spawn(move || {
                        if let Ok(local) = transfer::download(&path, &download_dir) {
                            let _ = transfer::apply(&local, &script);
                        }
                    });
                }
            }

            Action::Delete => {
                let Some(wp) = self.wallpapers.get(self.selected) else {
                    return Ok(Outcome::Continue);
                };
                // Only history items (local files) can be deleted.
                if Path::new(&wp.path).is_absolute() {
                    let _ = fs::remove_file(&wp.path);
                    self.remove_at(self.selected);
                    if self.wallpapers.is_empty() {
                        return Ok(Outcome::Quit);
                    }
                }
            }

            Action::Open => {
                if let Some(wp) = self.wallpapers.get(self.selected)
                    && !wp.url.is_empty()
                {
                    transfer::open_in_browser(&wp.url);
                }
            }

            Action::Help => {
                self.show_help = !self.show_help;
                self.prev_selected = None; // force full redraw
            }

            Action::None => {}
        }
        Ok(Outcome::Continue)
    }

    fn move_selection(&mut self, action: Action) {
        let count = self.wallpapers.len();
        let columns = self.layout.columns;
        match action {
            Action::Up if self.selected >= columns => self.selected -= columns,
            Action::Down if self.selected + columns < count => self.selected += columns,
            Action::Left if self.selected > 0 => self.selected -= 1,
            Action::Right if self.selected + 1 < count => self.selected += 1,
            _ => return,
        }
        self.ensure_visible();
    }

    /// Adjust `scroll_row` so the selected cell is on screen.
    fn ensure_visible(&mut self) {
        let vr = self.layout.visible_rows();
        let selected_row = self.layout.row_of(self.selected);
        if selected_row < self.scroll_row {
            self.scroll_row = selected_row;
        } else if selected_row >= self.scroll_row + vr {
            self.scroll_row = selected_row - vr + 1;
        }
    }

    /// Remove the item at `index`, shifting the render cache and thumbnail
    /// list so surviving entries keep matching their items.
    fn remove_at(&mut self, index: usize) {
        let old = std::mem::take(&mut self.rendered);
        for (k, v) in old {
            if k < index {
                self.rendered.insert(k, v);
            } else if k > index {
                self.rendered.insert(k - 1, v);
            }
        }
        self.wallpapers.remove(index);
        self.thumb_paths.remove(index);
        self.selected = self.selected.min(self.wallpapers.len().saturating_sub(1));
        self.ensure_visible();
        self.prev_selected = None; // item count changed; repaint everything
    }

    /// Whether a background page fetch should start now.
    fn should_load(&self) -> bool {
        if self.loading || self.next_page > self.last_page {
            return false;
        }
        let vr = self.layout.visible_rows();
        let loaded_rows = self.wallpapers.len().div_ceil(self.layout.columns);
        let selected_row = self.layout.row_of(self.selected);
        // Load when the content doesn't fill the screen, or the selection is
        // within one screenful of the end of loaded content.
        loaded_rows < vr || selected_row + vr >= loaded_rows
    }

    fn maybe_load_more(&mut self) {
        if !self.should_load() {
            return;
        }
        self.loading = true;
        let client = self.client.clone();
        let opts = self.search_opts.clone();
        let page = self.next_page;
        let thumb_dir = self.thumb_dir.path().to_path_buf();
        let tx = self.load_tx.clone();
        thread::spawn(move || fetch_page(client, opts, page, thumb_dir, tx));
    }

    fn apply_load(&mut self, result: LoadResult) {
        self.loading = false;
        self.wallpapers.extend(result.wallpapers);
        self.thumb_paths.extend(result.thumb_paths);
        self.next_page = result.next_page;
    }

    /// Download thumbnails for items that don't have one yet (first page).
    fn prime_thumbs(&mut self) {
        let dir = self.thumb_dir.path().to_path_buf();
        let fetched: Vec<(usize, PathBuf)> = self
            .wallpapers
            .par_iter()
            .enumerate()
            .filter(|(i, _)| self.thumb_paths[*i].as_os_str().is_empty())
            .map(|(i, wp)| (i, fetch_thumb(wp, &dir)))
            .collect();
        for (i, path) in fetched {
            self.thumb_paths[i] = path;
        }
    }

    fn draw(&mut self) -> Result<()> {
        let vr = self.layout.visible_rows();
        let mut buf = String::new();

        if self.show_help {
            // Images bleed through overlays drawn on top of them, so the help
            // screen starts from a blank canvas.
            buf.push_str(CLEAR_SCREEN);
            self.write_help(&mut buf);
        } else {
            match classify_repaint(
                self.prev_selected,
                self.prev_scroll_row,
                self.prev_count,
                self.selected,
                self.scroll_row,
                self.wallpapers.len(),
            ) {
                Repaint::Full => {
                    // Accumulate into one buffer and write in a single shot to
                    // minimise the visible blank-screen window.
                    buf.push_str(CLEAR_SCREEN);
                    for index in 0..self.wallpapers.len() {
                        self.write_cell(&mut buf, index, vr);
                    }
                }
                Repaint::Selection => {
                    // No screen clear, so there is no flash at all.
                    if let Some(prev) = self.prev_selected {
                        self.write_cell(&mut buf, prev, vr);
                    }
                    self.write_cell(&mut buf, self.selected, vr);
                }
                Repaint::None => {}
            }
        }

        if !buf.is_empty() {
            // Park the cursor below the grid, then flush everything at once.
            let park_row = vr * usize::from(self.layout.cell_h + LABEL_HEIGHT) + 1;
            let _ = write!(buf, "\x1b[{park_row};1H");
            let mut out = stdout();
            out.write_all(buf.as_bytes())?;
            out.flush()?;
        }

        self.prev_selected = Some(self.selected);
        self.prev_scroll_row = self.scroll_row;
        self.prev_count = self.wallpapers.len();
        Ok(())
    }

    /// Render one cell (image + selection border + label) into `buf`.
    /// No-op for cells outside the current viewport.
    fn write_cell(&mut self, buf: &mut String, index: usize, vr: usize) {
        if index >= self.wallpapers.len() {
            return;
        }
        let row = self.layout.row_of(index);
        if row < self.scroll_row || row >= self.scroll_row + vr {
            return;
        }
        let col = self.layout.col_of(index);

        // terminal coordinates are 1-based
        let start_row = (row - self.scroll_row) * usize::from(self.layout.cell_h + LABEL_HEIGHT) + 1;
        let start_col = col * usize::from(self.layout.cell_w) + 1;

        // Character-art output is repositioned line by line. Pixel-protocol
        // output has no raw newlines, so this reduces to a single write at the
        // cell origin; splitting such a payload would corrupt it.
        let image = self.image_str(index);
        for (i, line) in image.trim_end_matches('\n').split('\n').enumerate() {
            let _ = write!(buf, "\x1b[{};{}H{}", start_row + i, start_col, line);
        }

        // Selection top border, drawn after the image so it always sits on top.
        if index == self.selected {
            let bar = "═".repeat(usize::from(self.layout.cell_w).saturating_sub(2));
            let _ = write!(
                buf,
                "\x1b[{};{}H\x1b[1;96m╔{}╗\x1b[0m",
                start_row, start_col, bar
            );
        }

        // Label at a fixed offset below the cell origin, independent of where
        // the image write left the cursor.
        let label_row = start_row + usize::from(self.layout.cell_h);
        let _ = write!(buf, "\x1b[{};{}H{}", label_row, start_col, self.label(index));
    }

    /// Rendered image block for a cell, memoized per index. Render failures
    /// degrade to a placeholder; a missing thumbnail is not cached so a
    /// late-arriving file still gets rendered.
    fn image_str(&mut self, index: usize) -> String {
        let w = usize::from(self.layout.cell_w);
        let h = usize::from(self.layout.cell_h);

        let thumb = &self.thumb_paths[index];
        if thumb.as_os_str().is_empty() {
            return placeholder_block(w, h);
        }
        if let Some(cached) = self.rendered.get(&index) {
            return cached.clone();
        }
        let rendered = self
            .renderer
            .render(thumb, self.layout.cell_w, self.layout.cell_h)
            .unwrap_or_else(|_| placeholder_block(w, h));
        self.rendered.insert(index, rendered.clone());
        rendered
    }

    fn label(&self, index: usize) -> String {
        let resolution = &self.wallpapers[index].resolution;
        let w = usize::from(self.layout.cell_w);
        if index == self.selected {
            // ╚═  1920x1080  ═╝ — bottom half of the selection box
            format!(
                "\x1b[1;96m╚═{}═╝\x1b[0m",
                center_pad(resolution, w.saturating_sub(4))
            )
        } else {
            format!(" {} ", center_pad(resolution, w.saturating_sub(2)))
        }
    }

    fn write_help(&self, buf: &mut String) {
        // Dark background keeps the box opaque over character-art cells.
        const BORDER: &str = "\x1b[48;5;235m\x1b[1;96m";
        const TEXT: &str = "\x1b[48;5;235m\x1b[97m";
        const RESET: &str = "\x1b[0m";

        let title = " KEYS ";
        let rows = [
            "arrows / hjkl   navigate",
            "enter           download + set",
            "s               set (stay open)",
            "o               open in browser",
            "d               delete (history)",
            "?               toggle help",
            "q               quit",
        ];

        let max_w = rows
            .iter()
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
            .max(title.len());
        // inner = content width plus one space of padding each side
        let inner = max_w + 2;
        let box_h = rows.len() + 2;

        let start_row = usize::from(self.layout.term_h).saturating_sub(box_h) / 2 + 1;
        let start_col = usize::from(self.layout.term_w).saturating_sub(inner + 2) / 2 + 1;

        let title_pad = inner - title.len();
        let left = title_pad / 2;
        let right = title_pad - left;
        let _ = write!(
            buf,
            "\x1b[{};{}H{}╔{}{}{}╗{}",
            start_row,
            start_col,
            BORDER,
            "═".repeat(left),
            title,
            "═".repeat(right),
            RESET
        );
        for (i, row) in rows.iter().enumerate() {
            let _ = write!(
                buf,
                "\x1b[{};{}H{}║{} {:<max_w$} {}║{}",
                start_row + 1 + i,
                start_col,
                BORDER,
                TEXT,
                row,
                BORDER,
                RESET
            );
        }
        let _ = write!(
            buf,
            "\x1b[{};{}H{}╚{}╝{}",
            start_row + 1 + rows.len(),
            start_col,
            BORDER,
            "═".repeat(inner),
            RESET
        );
    }
}

/// Fetch one result page and its thumbnails, then deliver everything as a
/// single message. On API failure the page number still advances so the
/// scheduler skips the bad page instead of retrying it forever.
fn fetch_page(
    client: Client,
    opts: SearchOptions,
    page: u32,
    thumb_dir: PathBuf,
    tx: Sender<LoadResult>,
) {
    let wallpapers = match client.search_page(&opts, page) {
        Ok((wallpapers, _meta)) => wallpapers,
        Err(_) => {
            let _ = tx.send(LoadResult {
                wallpapers: Vec::new(),
                thumb_paths: Vec::new(),
                next_page: page + 1,
            });
            return;
        }
    };

    let thumb_paths = wallpapers
        .par_iter()
        .map(|wp| fetch_thumb(wp, &thumb_dir))
        .collect();

    let _ = tx.send(LoadResult {
        wallpapers,
        thumb_paths,
        next_page: page + 1,
    });
}

/// Thumbnail source for an item: the small remote thumb when the API provides
/// one, otherwise the item's own path (history items render from the file
/// itself). An empty path marks a failed download; the cell shows a
/// placeholder.
fn fetch_thumb(wp: &Wallpaper, thumb_dir: &Path) -> PathBuf {
    let source = if wp.thumbs.small.is_empty() {
        wp.path.as_str()
    } else {
        wp.thumbs.small.as_str()
    };
    if source.is_empty() {
        return PathBuf::new();
    }
    transfer::download(source, thumb_dir).unwrap_or_default()
}

fn clear_screen() -> Result<()> {
    let mut out = stdout();
    out.write_all(CLEAR_SCREEN.as_bytes())?;
    out.flush()?;
    Ok(())
}

fn restore_terminal() {
    let _ = terminal::disable_raw_mode();
    let _ = execute!(stdout(), cursor::Show);
}

/// Restores the terminal on every exit path, including error returns.
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        restore_terminal();
    }
}
