//! TUI application state and event loop.
//!
//! The controller does all asynchronous work on the tokio runtime; this loop
//! only drains its event channel into the view model, draws, and turns key
//! presses into controller calls. Popups are modal: while one is open it gets
//! every key.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio::sync::mpsc::UnboundedReceiver;

use routerdash_core::{
    BackupOptions, BackupRequest, CommandHistory, DashboardConfig, DashboardController,
    DashboardEvent, DashboardModel, FactoryResetRequest, FirmwareUpdateRequest, HttpBackend,
    MaintenanceAction, MaintenanceKind, MaintenanceState, SimulatedMaintenance,
};

pub type Controller = DashboardController<HttpBackend, SimulatedMaintenance>;

// ---------------------------------------------------------------------------
// Tabs and popups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    Device,
}

impl Tab {
    pub fn next(self) -> Self {
        match self {
            Self::Dashboard => Self::Device,
            Self::Device => Self::Dashboard,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Device => "Device",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Popup {
    SpeedTest,
    Mqtt,
    ApiDocs,
    Maintenance(Dialog),
    Console(Console),
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// Input line of the device console.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Console {
    pub input: String,
    /// Steps back into the command history; 0 is the line being typed.
    recall: usize,
    draft: String,
    pub maximized: bool,
}

impl Console {
    pub fn type_char(&mut self, c: char) {
        self.input.push(c);
        self.recall = 0;
    }

    pub fn backspace(&mut self) {
        self.input.pop();
        self.recall = 0;
    }

    pub fn older(&mut self, history: &CommandHistory) {
        if let Some(cmd) = history.recall(self.recall + 1) {
            if self.recall == 0 {
                self.draft = std::mem::take(&mut self.input);
            }
            self.recall += 1;
            self.input = cmd.to_string();
        }
    }

    pub fn newer(&mut self, history: &CommandHistory) {
        match self.recall {
            0 => {}
            1 => {
                self.recall = 0;
                self.input = std::mem::take(&mut self.draft);
            }
            n => {
                self.recall = n - 1;
                if let Some(cmd) = history.recall(self.recall) {
                    self.input = cmd.to_string();
                }
            }
        }
    }

    /// Clear the line after it was sent.
    pub fn sent(&mut self) {
        self.input.clear();
        self.draft.clear();
        self.recall = 0;
    }
}

// ---------------------------------------------------------------------------
// Maintenance dialogs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text { value: String, masked: bool },
    Check(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub label: &'static str,
    pub value: FieldValue,
}

impl Field {
    fn text(label: &'static str, masked: bool) -> Self {
        Self {
            label,
            value: FieldValue::Text {
                value: String::new(),
                masked,
            },
        }
    }

    fn check(label: &'static str, on: bool) -> Self {
        Self {
            label,
            value: FieldValue::Check(on),
        }
    }

    /// What the field shows; masked text is replaced with bullets.
    pub fn display(&self) -> String {
        match &self.value {
            FieldValue::Text { value, masked: true } => "•".repeat(value.chars().count()),
            FieldValue::Text { value, .. } => value.clone(),
            FieldValue::Check(true) => "[x]".to_string(),
            FieldValue::Check(false) => "[ ]".to_string(),
        }
    }
}

/// Form state of one maintenance dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub kind: MaintenanceKind,
    pub fields: Vec<Field>,
    pub focus: usize,
}

impl Dialog {
    pub fn new(kind: MaintenanceKind) -> Self {
        let fields = match kind {
            MaintenanceKind::FactoryReset => vec![Field::check(
                "I understand all settings will be lost",
                false,
            )],
            MaintenanceKind::Backup => vec![
                Field::check("Network settings", true),
                Field::check("Security settings", true),
                Field::check("User accounts", true),
                Field::check("Applications", true),
                Field::text("Password (optional)", true),
                Field::text("Confirm password", true),
            ],
            MaintenanceKind::FirmwareUpdate => vec![
                Field::text("Firmware image path", false),
                Field::check("I understand the device will restart", false),
            ],
        };
        Self {
            kind,
            fields,
            focus: 0,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.fields.len();
    }

    pub fn focus_prev(&mut self) {
        self.focus = (self.focus + self.fields.len() - 1) % self.fields.len();
    }

    /// Space toggles a focused checkbox; on a text field it is typed.
    pub fn input(&mut self, c: char) {
        match &mut self.fields[self.focus].value {
            FieldValue::Check(on) if c == ' ' => *on = !*on,
            FieldValue::Check(_) => {}
            FieldValue::Text { value, .. } => value.push(c),
        }
    }

    pub fn backspace(&mut self) {
        if let FieldValue::Text { value, .. } = &mut self.fields[self.focus].value {
            value.pop();
        }
    }

    fn check(&self, i: usize) -> bool {
        matches!(self.fields.get(i), Some(Field { value: FieldValue::Check(true), .. }))
    }

    fn text(&self, i: usize) -> String {
        match self.fields.get(i) {
            Some(Field {
                value: FieldValue::Text { value, .. },
                ..
            }) => value.clone(),
            _ => String::new(),
        }
    }

    /// Build the request this form describes. Validation is left to the
    /// controller.
    pub fn to_action(&self) -> MaintenanceAction {
        match self.kind {
            MaintenanceKind::FactoryReset => MaintenanceAction::FactoryReset(FactoryResetRequest {
                acknowledged: self.check(0),
            }),
            MaintenanceKind::Backup => MaintenanceAction::Backup(BackupRequest {
                options: BackupOptions {
                    network: self.check(0),
                    security: self.check(1),
                    users: self.check(2),
                    applications: self.check(3),
                },
                password: self.text(4),
                confirm_password: self.text(5),
            }),
            MaintenanceKind::FirmwareUpdate => {
                let path = self.text(0);
                let path = path.trim();
                MaintenanceAction::FirmwareUpdate(FirmwareUpdateRequest {
                    image: (!path.is_empty()).then(|| PathBuf::from(path)),
                    acknowledged: self.check(1),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    controller: Controller,
    events: UnboundedReceiver<DashboardEvent>,
    model: DashboardModel,
    base_url: String,
    poll_interval: Duration,
    tab: Tab,
    popup: Option<Popup>,
    running: bool,
}

impl App {
    pub fn new(
        controller: Controller,
        events: UnboundedReceiver<DashboardEvent>,
        model: DashboardModel,
        config: &DashboardConfig,
    ) -> Self {
        Self {
            controller,
            events,
            model,
            base_url: config.base_url.clone(),
            poll_interval: config.poll_interval,
            tab: Tab::Dashboard,
            popup: None,
            running: true,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        // Restore the terminal before a panic message is printed.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        self.controller.dispose();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        self.controller.enter_dashboard();
        self.controller.refresh_mqtt();

        while self.running {
            self.drain_events();
            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(Duration::from_millis(50))?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
            {
                self.handle_key(key.code);
            }
        }

        Ok(())
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.model.apply(event);
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match self.popup.take() {
            Some(popup) => self.popup = self.handle_popup_key(popup, key),
            None => self.handle_main_key(key),
        }
    }

    fn handle_main_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            KeyCode::Tab => self.switch_tab(self.tab.next()),
            KeyCode::Char('1') => self.switch_tab(Tab::Dashboard),
            KeyCode::Char('2') => self.switch_tab(Tab::Device),
            KeyCode::Char('b') => {
                self.controller.reset_speed_test();
                self.model.open_speed_test();
                self.popup = Some(Popup::SpeedTest);
            }
            KeyCode::Char('m') => {
                self.controller.refresh_mqtt();
                self.popup = Some(Popup::Mqtt);
            }
            KeyCode::Char('a') => self.popup = Some(Popup::ApiDocs),
            KeyCode::Char('t') => self.popup = Some(Popup::Console(Console::default())),
            KeyCode::Char('f') => self.open_dialog(MaintenanceKind::FactoryReset),
            KeyCode::Char('k') => self.open_dialog(MaintenanceKind::Backup),
            KeyCode::Char('u') => self.open_dialog(MaintenanceKind::FirmwareUpdate),
            KeyCode::Char('r') => {
                if self.tab == Tab::Device {
                    self.controller.refresh_device_info();
                }
            }
            _ => {}
        }
    }

    /// Returns the popup to keep open, or `None` to close it.
    fn handle_popup_key(&mut self, popup: Popup, key: KeyCode) -> Option<Popup> {
        match popup {
            Popup::SpeedTest => match key {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('b') => {
                    self.controller.cancel_speed_test();
                    self.model.close_speed_test();
                    None
                }
                KeyCode::Enter | KeyCode::Char('s') => {
                    if self.model.speed_test.start_enabled() {
                        self.controller.start_speed_test();
                    }
                    Some(Popup::SpeedTest)
                }
                _ => Some(Popup::SpeedTest),
            },
            Popup::Mqtt => match key {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('m') => None,
                KeyCode::Char('s') if self.model.mqtt.start_enabled() => {
                    self.controller.start_mqtt();
                    Some(Popup::Mqtt)
                }
                KeyCode::Char('x') if self.model.mqtt.stop_enabled() => {
                    self.controller.stop_mqtt();
                    Some(Popup::Mqtt)
                }
                KeyCode::Char('r') => {
                    self.controller.refresh_mqtt();
                    Some(Popup::Mqtt)
                }
                _ => Some(Popup::Mqtt),
            },
            Popup::ApiDocs => match key {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('a') => None,
                _ => Some(Popup::ApiDocs),
            },
            Popup::Console(mut console) => {
                match key {
                    KeyCode::Esc => return None,
                    KeyCode::Enter => {
                        if self.controller.run_command(&console.input).is_some() {
                            console.sent();
                        }
                    }
                    KeyCode::Up => console.older(&self.model.terminal.history),
                    KeyCode::Down => console.newer(&self.model.terminal.history),
                    KeyCode::Tab => console.maximized = !console.maximized,
                    KeyCode::Backspace => console.backspace(),
                    KeyCode::Char(c) => console.type_char(c),
                    _ => {}
                }
                Some(Popup::Console(console))
            }
            Popup::Maintenance(mut dialog) => {
                match key {
                    KeyCode::Esc => return None,
                    KeyCode::Tab | KeyCode::Down => dialog.focus_next(),
                    KeyCode::BackTab | KeyCode::Up => dialog.focus_prev(),
                    KeyCode::Backspace => dialog.backspace(),
                    KeyCode::Enter => self.submit(&dialog),
                    KeyCode::Char(c) => dialog.input(c),
                    _ => {}
                }
                Some(Popup::Maintenance(dialog))
            }
        }
    }

    fn open_dialog(&mut self, kind: MaintenanceKind) {
        if self.model.maintenance_state(kind) != &MaintenanceState::InProgress {
            self.model.maintenance.remove(&kind);
        }
        self.popup = Some(Popup::Maintenance(Dialog::new(kind)));
    }

    fn submit(&mut self, dialog: &Dialog) {
        if self.model.maintenance_state(dialog.kind) == &MaintenanceState::InProgress {
            return;
        }
        if let Err(e) = self.controller.run_maintenance(dialog.to_action()) {
            self.model.reject_maintenance(dialog.kind, &e);
        }
    }

    fn switch_tab(&mut self, tab: Tab) {
        if tab == self.tab {
            return;
        }
        self.tab = tab;
        match tab {
            Tab::Dashboard => self.controller.enter_dashboard(),
            Tab::Device => {
                self.controller.leave_dashboard();
                self.controller.refresh_device_info();
            }
        }
    }

    // -- accessors for the renderer --

    pub fn model(&self) -> &DashboardModel {
        &self.model
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn is_polling(&self) -> bool {
        self.controller.is_polling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routerdash_core::ValidationError;

    fn type_str(d: &mut Dialog, s: &str) {
        for c in s.chars() {
            d.input(c);
        }
    }

    #[test]
    fn tab_cycles() {
        assert_eq!(Tab::default(), Tab::Dashboard);
        assert_eq!(Tab::Dashboard.next(), Tab::Device);
        assert_eq!(Tab::Device.next(), Tab::Dashboard);
    }

    #[test]
    fn factory_reset_needs_checkbox() {
        let mut d = Dialog::new(MaintenanceKind::FactoryReset);
        assert_eq!(
            d.to_action().validate(),
            Err(ValidationError::ResetNotAcknowledged)
        );
        d.input(' ');
        assert!(d.to_action().validate().is_ok());
    }

    #[test]
    fn backup_password_fields_are_masked() {
        let mut d = Dialog::new(MaintenanceKind::Backup);
        d.focus = 4;
        type_str(&mut d, "hunter22");
        assert_eq!(d.fields[4].display(), "••••••••");
        d.focus_next();
        type_str(&mut d, "hunter23");
        assert_eq!(
            d.to_action().validate(),
            Err(ValidationError::PasswordMismatch)
        );
        d.backspace();
        d.input('2');
        assert!(d.to_action().validate().is_ok());
    }

    #[test]
    fn backup_options_toggle() {
        let mut d = Dialog::new(MaintenanceKind::Backup);
        d.focus_next();
        d.input(' ');
        let MaintenanceAction::Backup(req) = d.to_action() else {
            panic!("expected backup");
        };
        assert!(req.options.network);
        assert!(!req.options.security);
    }

    #[test]
    fn firmware_dialog_builds_request() {
        let mut d = Dialog::new(MaintenanceKind::FirmwareUpdate);
        assert_eq!(d.to_action().validate(), Err(ValidationError::NoFirmwareImage));
        type_str(&mut d, "/tmp/fw.bin");
        d.focus_next();
        d.input(' ');
        let MaintenanceAction::FirmwareUpdate(req) = d.to_action() else {
            panic!("expected firmware update");
        };
        assert_eq!(req.image, Some(PathBuf::from("/tmp/fw.bin")));
        assert!(req.acknowledged);
    }

    #[test]
    fn console_walks_history_and_restores_draft() {
        let mut history = CommandHistory::default();
        history.push("uptime".into());
        history.push("ifconfig".into());
        let mut c = Console::default();
        for ch in "ps".chars() {
            c.type_char(ch);
        }
        c.older(&history);
        assert_eq!(c.input, "ifconfig");
        c.older(&history);
        assert_eq!(c.input, "uptime");
        c.older(&history);
        assert_eq!(c.input, "uptime", "stops at the oldest entry");
        c.newer(&history);
        assert_eq!(c.input, "ifconfig");
        c.newer(&history);
        assert_eq!(c.input, "ps");
        c.newer(&history);
        assert_eq!(c.input, "ps");
    }

    #[test]
    fn console_sent_clears_line() {
        let mut c = Console::default();
        c.type_char('l');
        c.type_char('s');
        c.backspace();
        assert_eq!(c.input, "l");
        c.sent();
        assert_eq!(c.input, "");
    }

    #[test]
    fn focus_wraps_both_ways() {
        let mut d = Dialog::new(MaintenanceKind::FirmwareUpdate);
        d.focus_prev();
        assert_eq!(d.focus, 1);
        d.focus_next();
        assert_eq!(d.focus, 0);
    }
}
