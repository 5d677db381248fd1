// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tablenav_core::{Activation, Document, Navigator, NodeId, Selector, TableTree};
use tracing::{debug, info};

const COLUMN_SPACING: u16 = 1;
const MIN_COLUMN_WIDTH: u16 = 4;
const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfo {
    pub node: NodeId,
    pub label: String,
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    Continue(String),
    Quit,
}

/// What the host does when the user activates a link.
pub trait LinkRuntime {
    fn activate(&mut self, link: &LinkInfo) -> Result<ActivationOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavCommand {
    NextRow,
    PrevRow,
    NextLink,
    PrevLink,
    Activate,
    Stop,
    FocusNext,
    FocusPrev,
    HideCurrent,
    UnhideAll,
    RemoveCurrent,
    ToggleHelp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NavEvent {
    Moved,
    Status(String),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    status_line: Option<String>,
    status_token: u64,
    help_visible: bool,
    hidden_by_user: Vec<NodeId>,
    screen: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RowLayout {
    row: NodeId,
    links: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TableLayout {
    table: NodeId,
    index: usize,
    area: Rect,
    header: Vec<String>,
    widths: Vec<u16>,
    rows: Vec<RowLayout>,
}

pub fn run_app<R: LinkRuntime>(navigator: &mut Navigator<Document>, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    navigator.attach_focus_observer();
    info!(
        selector = navigator.selector(),
        tables = navigator.tables().len(),
        "terminal session started"
    );
    if navigator.tables().is_empty() {
        emit_status(
            &mut view_data,
            &internal_tx,
            format!("no tables match {:?}", navigator.selector()),
        );
    }

    let mut result = Ok(());
    loop {
        process_internal_events(&mut view_data, &internal_rx);

        let mut screen = view_data.screen;
        if let Err(error) = terminal.draw(|frame| {
            screen = frame.area();
            render(frame, navigator, &view_data);
        }) {
            result = Err(error).context("draw frame");
            break;
        }
        view_data.screen = screen;

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(navigator, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse_event(navigator, &mut view_data, &internal_tx, mouse);
                }
                _ => {}
            }
        }
    }

    navigator.stop();
    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        terminal::LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("leave alternate screen")?;
    info!("terminal session ended");
    result
}

fn process_internal_events(view_data: &mut ViewData, rx: &Receiver<InternalEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                view_data.status_line = None;
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    view_data.status_line = Some(message.into());
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: LinkRuntime>(
    navigator: &mut Navigator<Document>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if key.code == KeyCode::Char('q') && key.modifiers == KeyModifiers::NONE {
        return true;
    }

    let Some(command) = nav_command_for_key(key) else {
        return false;
    };
    debug!(?command, "key command");
    match apply_nav_command(navigator, runtime, view_data, command) {
        NavEvent::Moved => false,
        NavEvent::Status(message) => {
            emit_status(view_data, internal_tx, message);
            false
        }
        NavEvent::Quit => true,
    }
}

fn nav_command_for_key(key: KeyEvent) -> Option<NavCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(NavCommand::NextRow),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(NavCommand::PrevRow),
        (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(NavCommand::NextLink),
        (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(NavCommand::PrevLink),
        (KeyCode::Enter, _) => Some(NavCommand::Activate),
        (KeyCode::Esc, _) => Some(NavCommand::Stop),
        (KeyCode::Tab, _) => Some(NavCommand::FocusNext),
        (KeyCode::BackTab, _) => Some(NavCommand::FocusPrev),
        (KeyCode::Char('x'), KeyModifiers::NONE) => Some(NavCommand::HideCurrent),
        (KeyCode::Char('X'), _) => Some(NavCommand::UnhideAll),
        (KeyCode::Char('d'), KeyModifiers::NONE) => Some(NavCommand::RemoveCurrent),
        (KeyCode::Char('?'), _) => Some(NavCommand::ToggleHelp),
        _ => None,
    }
}

fn apply_nav_command<R: LinkRuntime>(
    navigator: &mut Navigator<Document>,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: NavCommand,
) -> NavEvent {
    match command {
        NavCommand::NextRow => {
            navigator.next_row();
            NavEvent::Moved
        }
        NavCommand::PrevRow => {
            navigator.prev_row();
            NavEvent::Moved
        }
        NavCommand::NextLink => {
            navigator.next_link();
            NavEvent::Moved
        }
        NavCommand::PrevLink => {
            navigator.prev_link();
            NavEvent::Moved
        }
        NavCommand::Activate => activate(navigator, runtime),
        NavCommand::Stop => {
            navigator.stop();
            NavEvent::Status("selection cleared".to_owned())
        }
        NavCommand::FocusNext => move_focus(navigator, 1),
        NavCommand::FocusPrev => move_focus(navigator, -1),
        NavCommand::HideCurrent => {
            if !navigator.position().is_set() {
                return NavEvent::Status("nothing selected".to_owned());
            }
            let Some(link) = navigator.resolve_current_link() else {
                return NavEvent::Status("nothing selected".to_owned());
            };
            let label = navigator.tree().label(link).to_owned();
            if let Err(error) = navigator.tree_mut().set_hidden(link, true) {
                return NavEvent::Status(format!("hide failed: {error:#}"));
            }
            view_data.hidden_by_user.push(link);
            navigator.refresh_ui();
            NavEvent::Status(format!("hid {label}; X shows hidden links again"))
        }
        NavCommand::UnhideAll => {
            let mut shown = 0;
            let mut last_error = None;
            let mut still_hidden = Vec::new();
            for link in view_data.hidden_by_user.drain(..) {
                match navigator.tree_mut().set_hidden(link, false) {
                    Ok(()) => shown += 1,
                    Err(error) => {
                        still_hidden.push(link);
                        last_error = Some(error);
                    }
                }
            }
            view_data.hidden_by_user = still_hidden;
            navigator.refresh_ui();
            match last_error {
                Some(error) => NavEvent::Status(format!(
                    "{shown} hidden links shown; {} failed: {error:#}",
                    view_data.hidden_by_user.len()
                )),
                None => NavEvent::Status(format!("{shown} hidden links shown")),
            }
        }
        NavCommand::RemoveCurrent => {
            if !navigator.position().is_set() {
                return NavEvent::Status("nothing selected".to_owned());
            }
            let Some(link) = navigator.resolve_current_link() else {
                return NavEvent::Status("nothing selected".to_owned());
            };
            let label = navigator.tree().label(link).to_owned();
            let target = navigator
                .tree()
                .closest(&link, &Selector::tag("td"))
                .unwrap_or(link);
            if let Err(error) = navigator.tree_mut().detach(target) {
                return NavEvent::Status(format!("remove failed: {error:#}"));
            }
            navigator.refresh_ui();
            NavEvent::Status(format!("removed {label}"))
        }
        NavCommand::ToggleHelp => {
            view_data.help_visible = !view_data.help_visible;
            NavEvent::Moved
        }
    }
}

fn activate<R: LinkRuntime>(navigator: &mut Navigator<Document>, runtime: &mut R) -> NavEvent {
    let node = match navigator.activate_current_link() {
        Activation::Activated(node) => node,
        Activation::NothingToActivate => {
            return NavEvent::Status("nothing to activate".to_owned());
        }
    };
    let document = navigator.tree();
    let info = LinkInfo {
        node,
        label: document.label(node).to_owned(),
        action: document
            .element(node)
            .and_then(|element| element.action.clone()),
    };
    match runtime.activate(&info) {
        Ok(ActivationOutcome::Continue(message)) => NavEvent::Status(message),
        Ok(ActivationOutcome::Quit) => NavEvent::Quit,
        Err(error) => NavEvent::Status(format!("activation failed: {error:#}")),
    }
}

/// Emulate tab order: focus the next visible focusable in document order and
/// let the navigator's focus observer pick it up.
fn move_focus(navigator: &mut Navigator<Document>, delta: isize) -> NavEvent {
    let focusable = match Selector::parse(&navigator.config().focusable_selector) {
        Ok(selector) => selector,
        Err(error) => return NavEvent::Status(format!("focus unavailable: {error:#}")),
    };
    let document = navigator.tree();
    let order: Vec<NodeId> = document
        .select(&focusable)
        .into_iter()
        .filter(|node| document.is_visible(node))
        .collect();
    if order.is_empty() {
        return NavEvent::Status("nothing focusable".to_owned());
    }

    let len = order.len() as isize;
    let next = match document
        .focused()
        .and_then(|focused| order.iter().position(|node| *node == focused))
    {
        Some(current) => (current as isize + delta).rem_euclid(len) as usize,
        None if delta >= 0 => 0,
        None => order.len() - 1,
    };
    let target = order[next];

    navigator.tree_mut().focus(&target);
    if navigator.observe_focus(&target) {
        NavEvent::Moved
    } else {
        navigator.clear_ui();
        let label = navigator.tree().label(target).to_owned();
        NavEvent::Status(format!("focus on {label} (outside navigable tables)"))
    }
}

fn handle_mouse_event(
    navigator: &mut Navigator<Document>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    mouse: MouseEvent,
) {
    if view_data.help_visible || mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }
    let (tables_area, _) = split_screen(view_data.screen);
    let layouts = layout_tables(navigator, tables_area);
    let Some(link) = hit_test(&layouts, mouse.column, mouse.row) else {
        return;
    };
    navigator.tree_mut().focus(&link);
    if !navigator.observe_focus(&link) {
        emit_status(view_data, internal_tx, "that cell is not navigable");
    }
}

fn split_screen(area: Rect) -> (Rect, Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(area);
    (layout[0], layout[1])
}

fn table_height(rows: usize) -> u16 {
    // borders + header + body
    u16::try_from(rows).unwrap_or(u16::MAX).saturating_add(3)
}

/// Index of the first table to draw so that `current` stays on screen.
fn first_visible_table(heights: &[u16], current: usize, available: u16) -> usize {
    let mut first = 0;
    let Some(last) = current.checked_add(1).filter(|end| *end <= heights.len()) else {
        return first;
    };
    while first < current {
        let used: u32 = heights[first..last].iter().map(|h| u32::from(*h)).sum();
        if used <= u32::from(available) {
            break;
        }
        first += 1;
    }
    first
}

fn layout_tables(navigator: &Navigator<Document>, area: Rect) -> Vec<TableLayout> {
    let document = navigator.tree();
    let header_cells = Selector::descendants(&["thead", "th"]);

    let planned: Vec<TableLayout> = navigator
        .tables()
        .into_iter()
        .enumerate()
        .map(|(index, table)| {
            let header: Vec<String> = document
                .find(&table, &header_cells)
                .into_iter()
                .filter(|cell| document.closest(cell, &Selector::tag("table")) == Some(table))
                .map(|cell| document.label(cell).to_owned())
                .collect();
            let rows: Vec<RowLayout> = navigator
                .rows_of(&table)
                .into_iter()
                .map(|row| RowLayout {
                    links: navigator.visible_links(&row),
                    row,
                })
                .collect();

            let columns = rows
                .iter()
                .map(|row| row.links.len())
                .max()
                .unwrap_or(0)
                .max(header.len());
            let widths = (0..columns)
                .map(|column| {
                    let header_width = header.get(column).map_or(0, |label| label.chars().count());
                    let link_width = rows
                        .iter()
                        .filter_map(|row| row.links.get(column))
                        .map(|link| document.label(*link).chars().count())
                        .max()
                        .unwrap_or(0);
                    u16::try_from(header_width.max(link_width))
                        .unwrap_or(u16::MAX)
                        .max(MIN_COLUMN_WIDTH)
                })
                .collect();

            TableLayout {
                table,
                index,
                area: Rect::default(),
                header,
                widths,
                rows,
            }
        })
        .collect();

    let heights: Vec<u16> = planned.iter().map(|table| table_height(table.rows.len())).collect();
    let current = if navigator.position().is_set() {
        navigator.current_table_index()
    } else {
        0
    };
    let first = first_visible_table(&heights, current, area.height);

    let mut y = area.y;
    let bottom = area.y.saturating_add(area.height);
    let mut placed = Vec::new();
    for (mut table, height) in planned.into_iter().zip(heights).skip(first) {
        if y >= bottom {
            break;
        }
        let height = height.min(bottom - y);
        table.area = Rect::new(area.x, y, area.width, height);
        y = y.saturating_add(height);
        placed.push(table);
    }
    placed
}

fn hit_test(layouts: &[TableLayout], column: u16, row: u16) -> Option<NodeId> {
    for layout in layouts {
        let inner_x = layout.area.x.saturating_add(1);
        let first_row_y = layout.area.y.saturating_add(2);
        let last_y = layout.area.y.saturating_add(layout.area.height.saturating_sub(1));
        if row < first_row_y || row >= last_y {
            continue;
        }
        let row_layout = layout.rows.get(usize::from(row - first_row_y))?;

        let mut cursor = inner_x;
        for (index, width) in layout.widths.iter().enumerate() {
            if column >= cursor && column < cursor.saturating_add(*width) {
                return row_layout.links.get(index).copied();
            }
            cursor = cursor.saturating_add(*width).saturating_add(COLUMN_SPACING);
        }
        return None;
    }
    None
}

fn render(frame: &mut ratatui::Frame<'_>, navigator: &Navigator<Document>, view_data: &ViewData) {
    let (tables_area, status_area) = split_screen(frame.area());

    let layouts = layout_tables(navigator, tables_area);
    if layouts.is_empty() {
        let empty = Paragraph::new("no navigable tables").block(
            Block::default()
                .borders(Borders::ALL)
                .title(navigator.selector().to_owned()),
        );
        frame.render_widget(empty, tables_area);
    }
    for layout in &layouts {
        render_table(frame, navigator, layout);
    }

    let status_widget = Paragraph::new(status_text(navigator, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, status_area);

    if view_data.help_visible {
        let area = centered_rect(70, 50, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(frame: &mut ratatui::Frame<'_>, navigator: &Navigator<Document>, layout: &TableLayout) {
    let document = navigator.tree();
    let config = navigator.config();

    let header = Row::new(layout.header.iter().map(|label| {
        Cell::from(label.clone()).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = layout.rows.iter().map(|row| {
        let active_row = document
            .element(row.row)
            .is_some_and(|element| element.has_class(&config.active_row_class));
        let cells = (0..layout.widths.len())
            .map(|column| {
                let Some(link) = row.links.get(column) else {
                    return Cell::from(String::new());
                };
                let mut style = Style::default().fg(Color::Blue);
                if active_row {
                    style = style.bg(Color::DarkGray);
                }
                let active_link = document
                    .element(*link)
                    .is_some_and(|element| element.has_class(&config.active_link_class));
                if active_link {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(document.label(*link).to_owned()).style(style)
            })
            .collect::<Vec<_>>();
        let row_style = if active_row {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        Row::new(cells).style(row_style)
    });

    let widths = layout
        .widths
        .iter()
        .map(|width| Constraint::Length(*width))
        .collect::<Vec<_>>();
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(COLUMN_SPACING)
        .flex(Flex::Start)
        .block(
            Block::default()
                .title(table_title(navigator, layout))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, layout.area);
}

fn table_title(navigator: &Navigator<Document>, layout: &TableLayout) -> String {
    let name = navigator
        .tree()
        .element(layout.table)
        .and_then(|element| element.id.clone())
        .unwrap_or_else(|| format!("table {}", layout.index + 1));
    let is_current =
        navigator.position().is_set() && navigator.current_table_index() == layout.index;
    if is_current {
        format!("{name} ●")
    } else {
        name
    }
}

fn status_text(navigator: &Navigator<Document>, view_data: &ViewData) -> String {
    let position = navigator.position();
    let location = match navigator.resolve_current_link() {
        Some(link) if position.is_set() => format!(
            "{} | table {} col {}",
            navigator.tree().label(link),
            navigator.current_table_index() + 1,
            position.column() + 1
        ),
        _ => "no selection".to_owned(),
    };
    let default = "j/k rows | h/l links | tab focus | enter open | esc clear | ? help | q quit";
    match &view_data.status_line {
        Some(status) => format!("{location} | {status} | {default}"),
        None => format!("{location} | {default}"),
    }
}

fn help_overlay_text() -> &'static str {
    "rows: j/down next | k/up previous (wraps across tables)\n\
links: l/right next | h/left previous (wraps within the row)\n\
focus: tab/shift+tab move focus in document order | click a cell\n\
enter activate | esc clear selection\n\
x hide current link | X show hidden links | d remove current cell\n\
? toggle help | q or ctrl+q quit"
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        ActivationOutcome, LinkInfo, LinkRuntime, NavCommand, ViewData, first_visible_table,
        handle_key_event, handle_mouse_event, hit_test, layout_tables, nav_command_for_key,
        process_internal_events, status_text,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{
        KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    };
    use ratatui::layout::Rect;
    use std::sync::mpsc;
    use tablenav_core::{Document, Navigator, TableTree};
    use tablenav_testkit::{GridBuilder, scenario_grid};

    #[derive(Debug, Default)]
    struct TestRuntime {
        activated: Vec<LinkInfo>,
        quit_on: Option<String>,
        fail: bool,
    }

    impl LinkRuntime for TestRuntime {
        fn activate(&mut self, link: &LinkInfo) -> Result<ActivationOutcome> {
            if self.fail {
                bail!("runtime refused {}", link.label);
            }
            self.activated.push(link.clone());
            if self.quit_on.as_deref() == Some(link.label.as_str()) {
                return Ok(ActivationOutcome::Quit);
            }
            Ok(ActivationOutcome::Continue(format!("opened {}", link.label)))
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(
        navigator: &mut Navigator<Document>,
        runtime: &mut TestRuntime,
        view_data: &mut ViewData,
        keys: &[KeyEvent],
    ) -> bool {
        let (tx, _rx) = mpsc::channel();
        let mut quit = false;
        for key in keys {
            quit = handle_key_event(navigator, runtime, view_data, &tx, *key);
        }
        quit
    }

    fn current_label(navigator: &Navigator<Document>) -> String {
        navigator
            .resolve_current_link()
            .map(|link| navigator.tree().label(link).to_owned())
            .unwrap_or_default()
    }

    fn scenario_navigator() -> Result<Navigator<Document>> {
        let grid = scenario_grid()?;
        let mut navigator = Navigator::with_defaults(grid.document);
        navigator.attach_focus_observer();
        Ok(navigator)
    }

    #[test]
    fn movement_keys_map_to_commands() {
        assert_eq!(nav_command_for_key(key(KeyCode::Char('j'))), Some(NavCommand::NextRow));
        assert_eq!(nav_command_for_key(key(KeyCode::Up)), Some(NavCommand::PrevRow));
        assert_eq!(nav_command_for_key(key(KeyCode::Right)), Some(NavCommand::NextLink));
        assert_eq!(nav_command_for_key(key(KeyCode::Char('h'))), Some(NavCommand::PrevLink));
        assert_eq!(nav_command_for_key(key(KeyCode::Enter)), Some(NavCommand::Activate));
        assert_eq!(nav_command_for_key(key(KeyCode::BackTab)), Some(NavCommand::FocusPrev));
        assert_eq!(nav_command_for_key(key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn keys_drive_the_navigator() -> Result<()> {
        let mut navigator = scenario_navigator()?;
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('j')), key(KeyCode::Down), key(KeyCode::Char('j'))],
        );
        assert_eq!(current_label(&navigator), "c1");

        press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('l')), key(KeyCode::Char('l')), key(KeyCode::Right)],
        );
        assert_eq!(current_label(&navigator), "c1");

        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('k'))]);
        assert_eq!(current_label(&navigator), "b1");
        Ok(())
    }

    #[test]
    fn enter_activates_through_the_runtime() -> Result<()> {
        let mut navigator = scenario_navigator()?;
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Enter)]);
        assert!(runtime.activated.is_empty());
        assert_eq!(view_data.status_line.as_deref(), Some("nothing to activate"));

        press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('j')), key(KeyCode::Char('l')), key(KeyCode::Enter)],
        );
        assert_eq!(runtime.activated.len(), 1);
        assert_eq!(runtime.activated[0].label, "a2");
        assert_eq!(view_data.status_line.as_deref(), Some("opened a2"));
        assert_eq!(navigator.tree().activations().len(), 1);
        Ok(())
    }

    #[test]
    fn activation_can_quit_or_fail() -> Result<()> {
        let mut navigator = scenario_navigator()?;
        let mut runtime = TestRuntime {
            quit_on: Some("a1".to_owned()),
            ..TestRuntime::default()
        };
        let mut view_data = ViewData::default();
        let quit = press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('j')), key(KeyCode::Enter)],
        );
        assert!(quit);

        let mut failing = TestRuntime {
            fail: true,
            ..TestRuntime::default()
        };
        let quit = press(&mut navigator, &mut failing, &mut view_data, &[key(KeyCode::Enter)]);
        assert!(!quit);
        let status = view_data.status_line.clone().unwrap_or_default();
        assert!(status.contains("activation failed"), "got {status}");
        Ok(())
    }

    #[test]
    fn quit_keys_and_help_overlay() -> Result<()> {
        let mut navigator = scenario_navigator()?;
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        assert!(!press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('?'))]));
        assert!(view_data.help_visible);
        // movement is swallowed while help is open
        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('j'))]);
        assert!(!navigator.position().is_set());
        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Esc)]);
        assert!(!view_data.help_visible);

        assert!(press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('q'))]));
        assert!(press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL)],
        ));
        Ok(())
    }

    #[test]
    fn tab_moves_focus_and_syncs_position() -> Result<()> {
        let mut navigator = scenario_navigator()?;
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Tab)]);
        assert_eq!(current_label(&navigator), "a1");
        press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Tab), key(KeyCode::Tab), key(KeyCode::Tab)],
        );
        assert_eq!(current_label(&navigator), "c1");
        assert_eq!(navigator.position().column(), 0);

        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::BackTab)]);
        assert_eq!(current_label(&navigator), "b1");
        Ok(())
    }

    #[test]
    fn tab_onto_links_outside_tables_clears_feedback() -> Result<()> {
        let grid = GridBuilder::new()
            .table(&[&["in"]])
            .untracked_table(&[&["out"]])
            .build()?;
        let inside = grid.link("in")?;
        let mut navigator = Navigator::with_defaults(grid.document);
        navigator.attach_focus_observer();
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Tab), key(KeyCode::Tab)],
        );
        let status = view_data.status_line.clone().unwrap_or_default();
        assert!(status.contains("outside navigable tables"), "got {status}");
        assert_eq!(current_label(&navigator), "in");
        let active = navigator
            .tree()
            .select(&tablenav_core::Selector::any_class(["btn-info"]));
        assert!(active.is_empty());

        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::BackTab)]);
        let active = navigator
            .tree()
            .select(&tablenav_core::Selector::any_class(["btn-info"]));
        assert_eq!(active, vec![inside]);
        Ok(())
    }

    #[test]
    fn unhide_keeps_links_it_could_not_show() -> Result<()> {
        let mut navigator = scenario_navigator()?;
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('j')), key(KeyCode::Char('x'))],
        );
        let a1 = view_data.hidden_by_user[0];

        // an id from a larger document does not exist in this one
        let mut other = Document::new();
        let mut foreign = other.root();
        for _ in 0..100 {
            foreign = other.create_element("a");
        }
        view_data.hidden_by_user.insert(0, foreign);

        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('X'))]);
        assert_eq!(view_data.hidden_by_user, vec![foreign]);
        assert!(navigator.tree().is_visible(&a1));
        let status = view_data.status_line.clone().unwrap_or_default();
        assert!(status.starts_with("1 hidden links shown; 1 failed"), "got {status}");
        Ok(())
    }

    #[test]
    fn hide_and_remove_keys_exercise_repair() -> Result<()> {
        let mut navigator = scenario_navigator()?;
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();

        press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('j')), key(KeyCode::Char('x'))],
        );
        assert_eq!(view_data.hidden_by_user.len(), 1);
        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('l'))]);
        assert_eq!(current_label(&navigator), "a2");

        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('X'))]);
        assert!(view_data.hidden_by_user.is_empty());
        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('h'))]);
        assert_eq!(current_label(&navigator), "a1");

        press(&mut navigator, &mut runtime, &mut view_data, &[key(KeyCode::Char('d'))]);
        assert_eq!(current_label(&navigator), "a2");
        assert_eq!(view_data.status_line.as_deref(), Some("removed a1"));
        Ok(())
    }

    #[test]
    fn esc_clears_the_selection() -> Result<()> {
        let mut navigator = scenario_navigator()?;
        let mut runtime = TestRuntime::default();
        let mut view_data = ViewData::default();
        press(
            &mut navigator,
            &mut runtime,
            &mut view_data,
            &[key(KeyCode::Char('j')), key(KeyCode::Esc)],
        );
        assert!(!navigator.position().is_set());
        assert!(status_text(&navigator, &view_data).starts_with("no selection"));
        Ok(())
    }

    #[test]
    fn first_visible_table_keeps_current_on_screen() {
        assert_eq!(first_visible_table(&[5, 5, 5], 0, 6), 0);
        assert_eq!(first_visible_table(&[5, 5, 5], 2, 10), 1);
        assert_eq!(first_visible_table(&[5, 5, 5], 2, 4), 2);
        assert_eq!(first_visible_table(&[5, 5, 5], 2, 20), 0);
        assert_eq!(first_visible_table(&[], 3, 20), 0);
    }

    #[test]
    fn layout_and_hit_test_find_cells() -> Result<()> {
        let grid = scenario_grid()?;
        let navigator = Navigator::with_defaults(grid.document.clone());
        let layouts = layout_tables(&navigator, Rect::new(0, 0, 40, 20));
        assert_eq!(layouts.len(), 2);
        assert_eq!(layouts[0].area, Rect::new(0, 0, 40, 5));
        assert_eq!(layouts[1].area, Rect::new(0, 5, 40, 4));
        assert_eq!(layouts[0].header, vec!["col 0", "col 1"]);
        assert_eq!(layouts[0].widths, vec![5, 5]);

        // a2 sits in the first body row, second column
        assert_eq!(hit_test(&layouts, 7, 2), Some(grid.link("a2")?));
        assert_eq!(hit_test(&layouts, 1, 3), Some(grid.link("b1")?));
        assert_eq!(hit_test(&layouts, 7, 3), None);
        assert_eq!(hit_test(&layouts, 13, 7), Some(grid.link("c3")?));
        assert_eq!(hit_test(&layouts, 1, 1), None, "header row is not clickable");
        assert_eq!(hit_test(&layouts, 1, 4), None, "bottom border");
        Ok(())
    }

    #[test]
    fn click_focuses_the_cell_under_the_cursor() -> Result<()> {
        let grid = scenario_grid()?;
        let mut navigator = Navigator::with_defaults(grid.document.clone());
        navigator.attach_focus_observer();
        let mut view_data = ViewData {
            screen: Rect::new(0, 0, 40, 23),
            ..ViewData::default()
        };
        let (tx, _rx) = mpsc::channel();

        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 13,
            row: 7,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse_event(&mut navigator, &mut view_data, &tx, click);
        assert_eq!(current_label(&navigator), "c3");
        assert_eq!(navigator.position().column(), 2);
        assert_eq!(navigator.tree().focused(), Some(grid.link("c3")?));
        Ok(())
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let (tx, rx) = mpsc::channel();
        let mut view_data = ViewData {
            status_line: Some("hello".to_owned()),
            status_token: 2,
            ..ViewData::default()
        };
        tx.send(super::InternalEvent::ClearStatus { token: 1 })
            .expect("send");
        process_internal_events(&mut view_data, &rx);
        assert_eq!(view_data.status_line.as_deref(), Some("hello"));

        tx.send(super::InternalEvent::ClearStatus { token: 2 })
            .expect("send");
        process_internal_events(&mut view_data, &rx);
        assert_eq!(view_data.status_line, None);
    }
}
