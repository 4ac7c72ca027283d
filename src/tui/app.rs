//! Main application logic for the terminal dashboard.
//!
//! The `App` borrows the open [`Session`] for the lifetime of the dashboard.
//! Every change goes through the session's reducers, so edits made here are
//! queued for saving exactly like CLI edits.

use std::io;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Tabs, Wrap},
    Frame, Terminal,
};

use crate::assistant::Assistant;
use crate::calendar;
use crate::catalog;
use crate::dashboard::{self, SectionFilter};
use crate::fields::*;
use crate::mutation;
use crate::session::Session;
use crate::stage;
use crate::subproject::SubProject;
use crate::tui::{
    colors::{group_color, DARK_RED, GOLD},
    enums::{AppState, DashboardRow, PendingAction},
    input::InputField,
    utils::centered_rect,
};

/// Fields of the add-task popup.
struct TaskForm {
    content: InputField,
    category: InputField,
    group: TaskGroup,
    /// 0 = content, 1 = category, 2 = group
    focus: usize,
}

impl TaskForm {
    fn new(group: TaskGroup) -> Self {
        let mut content = InputField::new();
        content.active = true;
        TaskForm {
            content,
            category: InputField::new(),
            group,
            focus: 0,
        }
    }

    fn focused_input(&mut self) -> Option<&mut InputField> {
        match self.focus {
            0 => Some(&mut self.content),
            1 => Some(&mut self.category),
            _ => None,
        }
    }

    fn next_focus(&mut self) {
        self.focus = (self.focus + 1) % 3;
        self.content.active = self.focus == 0;
        self.category.active = self.focus == 1;
    }

    fn cycle_group(&mut self, forward: bool) {
        let all = TaskGroup::ALL;
        let idx = all.iter().position(|g| *g == self.group).unwrap_or(0);
        let next = if forward { (idx + 1) % all.len() } else { (idx + all.len() - 1) % all.len() };
        self.group = all[next];
    }
}

/// Main application state for the terminal dashboard.
pub struct App<'a> {
    state: AppState,
    session: &'a mut Session,
    assistant: &'a Assistant,
    view_stage: DesignStage,
    filter: SectionFilter,
    table_state: TableState,
    rows: Vec<DashboardRow>,
    status_message: String,
    pending: Option<PendingAction>,
    answer: Option<(String, String)>,
    form: TaskForm,
}

impl<'a> App<'a> {
    pub fn new(session: &'a mut Session, assistant: &'a Assistant) -> Self {
        let view_stage = session
            .current_sub()
            .map(|sp| sp.stage)
            .unwrap_or(DesignStage::Schematic);
        let mut app = App {
            state: AppState::Dashboard,
            session,
            assistant,
            view_stage,
            filter: SectionFilter::default(),
            table_state: TableState::default(),
            rows: Vec::new(),
            status_message: String::new(),
            pending: None,
            answer: None,
            form: TaskForm::new(TaskGroup::Deliverable),
        };
        app.refresh_rows();
        app
    }

    fn refresh_rows(&mut self) {
        self.rows = match self.session.current_sub() {
            Some(sp) => build_rows(sp, self.view_stage, self.filter),
            None => Vec::new(),
        };
        let selected = self.table_state.selected().unwrap_or(0);
        if self.rows.is_empty() {
            self.table_state.select(None);
        } else {
            let first_task = self
                .rows
                .iter()
                .position(|r| matches!(r, DashboardRow::Task { .. }))
                .unwrap_or(0);
            self.table_state.select(Some(selected.max(first_task).min(self.rows.len() - 1)));
        }
    }

    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    fn selected_task_id(&self) -> Option<String> {
        match self.table_state.selected().and_then(|i| self.rows.get(i)) {
            Some(DashboardRow::Task { id }) => Some(id.clone()),
            _ => None,
        }
    }

    fn read_only(&self) -> bool {
        self.session
            .current_sub()
            .map(|sp| sp.is_read_only(self.view_stage))
            .unwrap_or(true)
    }

    fn move_selection(&mut self, down: bool) {
        if self.rows.is_empty() {
            return;
        }
        let len = self.rows.len();
        let current = self.table_state.selected().unwrap_or(0);
        let next = if down { (current + 1) % len } else { (current + len - 1) % len };
        self.table_state.select(Some(next));
    }

    fn cycle_stage(&mut self) {
        let Some(sp) = self.session.current_sub() else { return };
        let stages = sp.visited_stages();
        let idx = stages.iter().position(|s| *s == self.view_stage).unwrap_or(0);
        self.view_stage = stages[(idx + 1) % stages.len()];
        self.table_state.select(Some(0));
        self.refresh_rows();
    }

    fn cycle_group_filter(&mut self) {
        self.filter.group = match self.filter.group {
            None => Some(TaskGroup::InterfaceCoordination),
            Some(TaskGroup::InterfaceCoordination) => Some(TaskGroup::RiskControl),
            Some(TaskGroup::RiskControl) => Some(TaskGroup::Deliverable),
            Some(TaskGroup::Deliverable) => None,
        };
        self.refresh_rows();
    }

    fn apply(&mut self, f: impl FnOnce(&SubProject) -> SubProject) {
        if let Err(e) = self.session.update_current_sub(f) {
            self.set_status_message(format!("Error: {}", e));
        }
        self.refresh_rows();
    }

    fn toggle_selected(&mut self) {
        if self.read_only() {
            self.set_status_message(format!("{} is read-only", format_stage(self.view_stage)));
            return;
        }
        if let Some(id) = self.selected_task_id() {
            self.apply(|sp| mutation::toggle_complete(sp, &id));
        }
    }

    fn request_delete(&mut self) {
        if self.read_only() {
            self.set_status_message(format!("{} is read-only", format_stage(self.view_stage)));
            return;
        }
        let Some(id) = self.selected_task_id() else { return };
        let content = self
            .session
            .current_sub()
            .and_then(|sp| sp.task(&id))
            .map(|t| t.content.clone())
            .unwrap_or_default();
        self.pending = Some(PendingAction::DeleteTask { id, content });
        self.state = AppState::Confirm;
    }

    fn request_advance(&mut self) {
        match self.session.current_sub() {
            Some(sp) if stage::can_advance(sp) => {
                self.pending = Some(PendingAction::AdvanceStage);
                self.state = AppState::Confirm;
            }
            Some(sp) => {
                let msg = format!("Already at the final stage ({})", format_stage(sp.stage));
                self.set_status_message(msg);
            }
            None => {}
        }
    }

    fn run_pending(&mut self) {
        match self.pending.take() {
            Some(PendingAction::DeleteTask { id, .. }) => {
                self.apply(|sp| mutation::delete_task(sp, &id));
                self.set_status_message("Task deleted".to_string());
            }
            Some(PendingAction::AdvanceStage) => {
                self.apply(stage::advance_stage);
                if let Some(sp) = self.session.current_sub() {
                    self.view_stage = sp.stage;
                    let msg = format!("Advanced to {}", format_stage(sp.stage));
                    self.table_state.select(Some(0));
                    self.refresh_rows();
                    self.set_status_message(msg);
                }
            }
            None => {}
        }
    }

    fn open_task_form(&mut self) {
        if self.read_only() {
            self.set_status_message(format!("{} is read-only", format_stage(self.view_stage)));
            return;
        }
        let group = self.filter.group.unwrap_or(TaskGroup::Deliverable);
        self.form = TaskForm::new(group);
        self.state = AppState::AddTask;
    }

    fn submit_task_form(&mut self) {
        let content = self.form.content.value.trim().to_string();
        let category = self.form.category.value.trim().to_string();
        if content.is_empty() || category.is_empty() {
            self.set_status_message("Task text and category are required".to_string());
            return;
        }
        let group = self.form.group;
        let stage_now = self.view_stage;
        let category_id = self
            .session
            .current_sub()
            .and_then(|sp| {
                catalog::categories(sp.project_type, stage_now)
                    .iter()
                    .find(|c| c.name == category && c.group == group)
            })
            .map(|c| c.id.to_string())
            .unwrap_or_else(|| format!("custom-{}", crate::project::sanitize_name(&category)));
        self.apply(|sp| mutation::add_ad_hoc_task(sp, group, &category, &category_id, &content, stage_now));
        self.state = AppState::Dashboard;
        self.set_status_message(format!("Added task to {}", category));
    }

    async fn ask_question(&mut self) {
        let category = self
            .selected_task_id()
            .and_then(|id| self.session.current_sub().and_then(|sp| sp.task(&id)).map(|t| t.category.clone()))
            .unwrap_or_else(|| format_stage(self.view_stage).to_string());
        self.set_status_message("Asking the assistant...".to_string());
        let answer = self.assistant.workflow_question(&category).await;
        self.answer = Some((format!("Check-up: {}", category), answer));
        self.state = AppState::Answer;
    }

    async fn review_input(&mut self) {
        let text = self
            .session
            .current_sub()
            .map(|sp| sp.design_input_content.clone())
            .unwrap_or_default();
        if text.trim().is_empty() {
            self.set_status_message("No design input to review".to_string());
            return;
        }
        let answer = self.assistant.review_design_input(&text).await;
        self.answer = Some(("Design input review".to_string(), answer));
        self.state = AppState::Answer;
    }

    /// Returns true if the application should quit.
    async fn handle_dashboard_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_selected(),
            KeyCode::Tab => self.cycle_stage(),
            KeyCode::Char('g') => self.cycle_group_filter(),
            KeyCode::Char('m') => {
                self.filter.minimal = !self.filter.minimal;
                self.refresh_rows();
            }
            KeyCode::Char('n') => self.request_advance(),
            KeyCode::Char('d') => self.request_delete(),
            KeyCode::Char('+') => self.open_task_form(),
            KeyCode::Char('a') => self.ask_question().await,
            KeyCode::Char('r') => self.review_input().await,
            KeyCode::Char('h') | KeyCode::F(1) => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    fn handle_confirm_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.state = AppState::Dashboard;
                self.run_pending();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state = AppState::Dashboard;
                self.pending = None;
            }
            _ => {}
        }
    }

    fn handle_form_input(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.state = AppState::Dashboard,
            KeyCode::Enter => self.submit_task_form(),
            KeyCode::Tab => self.form.next_focus(),
            KeyCode::Left if self.form.focus == 2 => self.form.cycle_group(false),
            KeyCode::Right if self.form.focus == 2 => self.form.cycle_group(true),
            KeyCode::Left => {
                if let Some(field) = self.form.focused_input() {
                    field.move_cursor_left();
                }
            }
            KeyCode::Right => {
                if let Some(field) = self.form.focused_input() {
                    field.move_cursor_right();
                }
            }
            KeyCode::Backspace => {
                if let Some(field) = self.form.focused_input() {
                    field.handle_backspace();
                }
            }
            KeyCode::Delete => {
                if let Some(field) = self.form.focused_input() {
                    field.handle_delete();
                }
            }
            KeyCode::Char(c) => {
                if let Some(field) = self.form.focused_input() {
                    field.handle_char(c);
                }
            }
            _ => {}
        }
    }

    /// Poll for and handle keyboard events based on current application state.
    ///
    /// Returns true if the application should quit.
    async fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    return Ok(false);
                }
                self.clear_status_message();
                match self.state {
                    AppState::Dashboard => return Ok(self.handle_dashboard_input(key.code, key.modifiers).await),
                    AppState::Confirm => self.handle_confirm_input(key.code),
                    AppState::AddTask => self.handle_form_input(key.code),
                    AppState::Help | AppState::Answer => {
                        self.answer = None;
                        self.state = AppState::Dashboard;
                    }
                }
            }
        }
        Ok(false)
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let (project, sub) = match (self.session.current_project(), self.session.current_sub()) {
            (Some(p), Some(sp)) => (
                format!("{} ({})", p.name, p.code),
                format!("{} ({}) - {}", sp.name, sp.code, format_project_type(sp.project_type)),
            ),
            _ => ("-".to_string(), "-".to_string()),
        };
        let next_plan = self
            .session
            .current_sub()
            .and_then(|sp| calendar::upcoming(&sp.plans, Local::now().date_naive(), 1).first().map(|p| format!("  Next: {} {}", p.date, p.name)))
            .unwrap_or_default();
        let header_text = vec![Line::from(vec![
            Span::styled("HVAC DESIGN TRACKER", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("{}  /  {}{}", project, sub, next_plan),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];
        let header = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_tabs(&self, f: &mut Frame, area: Rect, sp: &SubProject) {
        let tabs_data = dashboard::stage_tabs(sp);
        let titles: Vec<Line> = tabs_data
            .iter()
            .map(|(s, read_only)| {
                let label = if *read_only {
                    format!("{} (read-only)", format_stage(*s))
                } else {
                    format_stage(*s).to_string()
                };
                Line::from(label)
            })
            .collect();
        let selected = tabs_data.iter().position(|(s, _)| *s == self.view_stage).unwrap_or(0);
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("Stages (Tab to switch)"))
            .select(selected)
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        f.render_widget(tabs, area);
    }

    fn render_gauges(&self, f: &mut Frame, area: Rect, sp: &SubProject) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);
        let overall = dashboard::stage_progress(sp, self.view_stage);
        let mut gauges: Vec<(String, Color, dashboard::Progress)> = dashboard::group_progress(sp, self.view_stage)
            .into_iter()
            .map(|g| (format_group(g.group).to_string(), group_color(g.group), g.progress))
            .collect();
        gauges.push(("Overall".to_string(), Color::Blue, overall));

        for ((title, color, progress), chunk) in gauges.into_iter().zip(chunks.iter()) {
            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL).title(title))
                .gauge_style(Style::default().fg(color))
                .percent(progress.percent())
                .label(format!("{}/{}", progress.done, progress.total));
            f.render_widget(gauge, *chunk);
        }
    }

    fn render_dashboard(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(area);

        self.render_header(f, chunks[0]);
        let Some(sp) = self.session.current_sub() else {
            let empty = Paragraph::new("No sub-project selected. Create one with `hvt new sub`.")
                .block(Block::default().borders(Borders::ALL));
            f.render_widget(empty, chunks[3]);
            return;
        };
        self.render_tabs(f, chunks[1], sp);
        self.render_gauges(f, chunks[2], sp);

        let read_only = sp.is_read_only(self.view_stage);
        let rows: Vec<Row> = self
            .rows
            .iter()
            .map(|row| match row {
                DashboardRow::Section { name, group, orphan } => {
                    let label = if *orphan { format!("{} (not in template)", name) } else { name.clone() };
                    Row::new(vec![Cell::from(""), Cell::from(label), Cell::from(format_group(*group))])
                        .style(Style::default().bg(group_color(*group)).fg(Color::White).add_modifier(Modifier::BOLD))
                }
                DashboardRow::Task { id } => match sp.task(id) {
                    Some(t) => {
                        let mark = if t.is_completed { "[x]" } else { "[ ]" };
                        let versions = t.versions.first().map(|v| format!("v{}", v.version)).unwrap_or_default();
                        let style = if t.is_completed || read_only {
                            Style::default().fg(Color::DarkGray)
                        } else {
                            Style::default().fg(Color::White)
                        };
                        Row::new(vec![Cell::from(mark), Cell::from(t.content.clone()), Cell::from(versions)]).style(style)
                    }
                    None => Row::new(vec![Cell::from(""), Cell::from(""), Cell::from("")]),
                },
            })
            .collect();

        let title = format!(
            "{}{}{} - Press 'h' for help",
            format_stage(self.view_stage),
            self.filter.group.map(|g| format!(" / {}", format_group(g))).unwrap_or_default(),
            if self.filter.minimal { " / key items" } else { "" }
        );
        let table = Table::new(rows, [Constraint::Length(4), Constraint::Min(30), Constraint::Length(24)])
            .block(Block::default().borders(Borders::ALL).title(title))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, chunks[3], &mut self.table_state);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::from(vec![Span::styled("Dashboard Help", bold)]),
            Line::from(""),
            Line::from(vec![Span::styled("Checklist:", bold)]),
            Line::from("  Up/k, Down/j   Move selection"),
            Line::from("  Space/Enter    Toggle task completion"),
            Line::from("  +              Add a task to the current stage"),
            Line::from("  d              Delete selected task"),
            Line::from("  n              Advance to the next design stage"),
            Line::from(""),
            Line::from(vec![Span::styled("View:", bold)]),
            Line::from("  Tab            Switch between visited stages"),
            Line::from("  g              Cycle group filter"),
            Line::from("  m              Toggle key items only"),
            Line::from(""),
            Line::from(vec![Span::styled("Assistant:", bold)]),
            Line::from("  a              Check-up question for the selected category"),
            Line::from("  r              Review the design-input note"),
            Line::from(""),
            Line::from("  h/F1           Show this help"),
            Line::from("  q/Ctrl+C/Esc   Quit"),
            Line::from(""),
            Line::from("Earlier stages are read-only."),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Press any key to return"))
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_confirm(&self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Action")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));

        let area = centered_rect(50, 20, area);
        f.render_widget(Clear, area);

        let action = match &self.pending {
            Some(PendingAction::DeleteTask { content, .. }) => format!("delete '{}'", content),
            Some(PendingAction::AdvanceStage) => {
                let next = self
                    .session
                    .current_sub()
                    .and_then(|sp| sp.stage.next())
                    .map(format_stage)
                    .unwrap_or("-");
                format!("advance to {}", next)
            }
            None => String::new(),
        };
        let text = vec![
            Line::from(""),
            Line::from(vec![Span::styled("Are you sure you want to:", Style::default().add_modifier(Modifier::BOLD))]),
            Line::from(action),
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_task_form(&self, f: &mut Frame, area: Rect) {
        let area = centered_rect(60, 40, area);
        f.render_widget(Clear, area);
        let block = Block::default().title("Add Task").borders(Borders::ALL);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)])
            .split(inner);

        let field_style = |focused: bool| {
            if focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            }
        };
        let content = Paragraph::new(self.form.content.value.as_str())
            .block(Block::default().borders(Borders::ALL).title("Task").border_style(field_style(self.form.focus == 0)));
        let category = Paragraph::new(self.form.category.value.as_str())
            .block(Block::default().borders(Borders::ALL).title("Category").border_style(field_style(self.form.focus == 1)));
        let group = Paragraph::new(format!("< {} >", format_group(self.form.group)))
            .style(Style::default().fg(group_color(self.form.group)))
            .block(Block::default().borders(Borders::ALL).title("Group").border_style(field_style(self.form.focus == 2)));
        f.render_widget(content, chunks[0]);
        f.render_widget(category, chunks[1]);
        f.render_widget(group, chunks[2]);
        f.render_widget(
            Paragraph::new("Tab next field  Left/Right change group  Enter save  Esc cancel").alignment(Alignment::Center),
            chunks[3],
        );

        let cursor_target = match self.form.focus {
            0 => Some((&self.form.content, chunks[0])),
            1 => Some((&self.form.category, chunks[1])),
            _ => None,
        };
        if let Some((field, rect)) = cursor_target {
            let width: usize = field
                .value
                .chars()
                .take(field.cursor)
                .map(|c| if c.is_ascii() { 1 } else { 2 })
                .sum();
            f.set_cursor_position((rect.x + 1 + width as u16, rect.y + 1));
        }
    }

    fn render_answer(&self, f: &mut Frame, area: Rect) {
        let Some((title, body)) = &self.answer else { return };
        let area = centered_rect(70, 50, area);
        f.render_widget(Clear, area);
        let paragraph = Paragraph::new(body.as_str())
            .block(Block::default().borders(Borders::ALL).title(format!("{} - Press any key to close", title)))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state {
                AppState::Dashboard => {
                    let mode = if self.assistant.is_online() { "online" } else { "offline" };
                    let task_count = self.rows.iter().filter(|r| matches!(r, DashboardRow::Task { .. })).count();
                    format!("Tasks: {} | Assistant: {} | Press 'h' for help", task_count, mode)
                }
                AppState::Help => "Help".to_string(),
                AppState::Confirm => "Confirm Action".to_string(),
                AppState::AddTask => "Add Task".to_string(),
                AppState::Answer => "Assistant".to_string(),
            }
        };
        let (bg, fg) = if self.read_only() {
            (GOLD, Color::Rgb(20, 20, 20))
        } else {
            (Color::Blue, Color::White)
        };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(bg).fg(fg))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Main render function that dispatches to appropriate view renderers.
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::Help => self.render_help(f, chunks[0]),
            AppState::Dashboard => self.render_dashboard(f, chunks[0]),
            AppState::Confirm => {
                self.render_dashboard(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
            AppState::AddTask => {
                self.render_dashboard(f, chunks[0]);
                self.render_task_form(f, chunks[0]);
            }
            AppState::Answer => {
                self.render_dashboard(f, chunks[0]);
                self.render_answer(f, chunks[0]);
            }
        }
        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop for the dashboard.
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input().await? {
                break;
            }
        }
        Ok(())
    }
}

/// Flatten category sections into table rows: one heading then its tasks.
pub fn build_rows(sp: &SubProject, stage: DesignStage, filter: SectionFilter) -> Vec<DashboardRow> {
    let mut rows = Vec::new();
    for section in dashboard::sections(sp, stage, filter) {
        rows.push(DashboardRow::Section {
            name: section.name,
            group: section.group,
            orphan: section.orphan,
        });
        rows.extend(section.tasks.iter().map(|t| DashboardRow::Task { id: t.id.clone() }));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::ProjectType;

    #[test]
    fn test_build_rows_heading_then_tasks() {
        let sp = SubProject::new("Lab", "L1", ProjectType::Other, DesignStage::Schematic);
        let rows = build_rows(&sp, DesignStage::Schematic, SectionFilter::default());
        assert!(matches!(rows.first(), Some(DashboardRow::Section { orphan: false, .. })));
        let tasks = rows.iter().filter(|r| matches!(r, DashboardRow::Task { .. })).count();
        assert_eq!(tasks, sp.tasks_for_stage(DesignStage::Schematic).count());
    }

    #[test]
    fn test_build_rows_group_filter() {
        let sp = SubProject::new("Lab", "L1", ProjectType::NuclearIsland, DesignStage::Schematic);
        let filter = SectionFilter { group: Some(TaskGroup::RiskControl), minimal: false };
        let rows = build_rows(&sp, DesignStage::Schematic, filter);
        assert!(rows.iter().all(|r| match r {
            DashboardRow::Section { group, .. } => *group == TaskGroup::RiskControl,
            DashboardRow::Task { .. } => true,
        }));
        assert_eq!(rows.iter().filter(|r| matches!(r, DashboardRow::Section { .. })).count(), 1);
    }

    #[test]
    fn test_task_form_focus_and_group_cycle() {
        let mut form = TaskForm::new(TaskGroup::Deliverable);
        assert!(form.content.active);
        form.next_focus();
        assert!(form.category.active && !form.content.active);
        form.next_focus();
        assert!(form.focused_input().is_none());
        form.cycle_group(true);
        assert_eq!(form.group, TaskGroup::ALL[(TaskGroup::ALL.iter().position(|g| *g == TaskGroup::Deliverable).unwrap() + 1) % 3]);
        form.cycle_group(false);
        assert_eq!(form.group, TaskGroup::Deliverable);
    }
}
