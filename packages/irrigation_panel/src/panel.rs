use std::time::Duration;

use irrigation_protocol::{
    Command, CommandError, LineAssembler, LogBuffer, LogEntry, PanelEvent, SensorId, Severity,
    route_chunk,
};
use serial_session::{PortInfo, PortOpener, SerialSession, SessionError, SessionEvent};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PanelOptions;
use crate::input::UserAction;
use crate::state::PanelState;

/// The control panel: one serial session, the routed view of what the
/// device says, and the user-visible log.
///
/// Every operation catches its own errors and reports them as log entries;
/// nothing here returns an error to the caller.
pub struct Panel<O: PortOpener> {
    session: SerialSession<O>,
    state: PanelState,
    log: LogBuffer,
    unseen: usize,
    assembler: Option<LineAssembler>,
}

impl<O: PortOpener> Panel<O> {
    pub fn new(session: SerialSession<O>, options: PanelOptions) -> Self {
        Self {
            session,
            state: PanelState::new(),
            log: LogBuffer::with_capacity(options.log_capacity),
            unseen: 0,
            assembler: options.reassemble_lines.then(LineAssembler::new),
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    pub fn session(&self) -> &SerialSession<O> {
        &self.session
    }

    fn push_log(&mut self, severity: Severity, message: impl Into<String>) {
        self.log.push(severity, message);
        self.unseen = (self.unseen + 1).min(self.log.capacity());
    }

    /// Entries added since the last call, oldest first
    pub fn take_new_entries(&mut self) -> Vec<LogEntry> {
        let entries = self.log.recent(self.unseen).cloned().collect();
        self.unseen = 0;
        entries
    }

    /// Check for serial support once at startup
    pub fn startup(&mut self) {
        match self.session.probe() {
            Ok(()) => {
                self.push_log(Severity::Success, "System ready - waiting for connection");
            }
            Err(e) => {
                warn!("Serial support unavailable: {}", e);
                self.state.connect_enabled = false;
                self.push_log(
                    Severity::Warning,
                    format!("Serial ports are not available on this system ({e})"),
                );
                self.push_log(
                    Severity::Warning,
                    "Attach a USB serial adapter or check device permissions for full functionality",
                );
            }
        }
    }

    /// Connect when disconnected, disconnect otherwise
    pub async fn toggle_connection(&mut self) {
        if self.session.is_connected() {
            self.disconnect().await;
        } else {
            self.connect().await;
        }
    }

    pub async fn connect(&mut self) {
        if !self.state.connect_enabled {
            self.push_log(Severity::Error, "Serial ports are not available on this system");
            return;
        }

        match self.session.connect().await {
            Ok(id) => {
                self.flush_partial_line();
                self.state.set_connected();
                let port = self.session.port_name().unwrap_or("serial port").to_string();
                info!("Panel connected ({}) on {}", id, port);
                self.push_log(Severity::Success, format!("Connected to ESP32 on {port}"));
            }
            Err(SessionError::AlreadyConnected) => {
                debug!("Connect requested while already connected");
            }
            Err(e) => {
                self.push_log(Severity::Error, format!("Failed to connect: {e}"));
            }
        }
    }

    /// Tear down the connection and reset the panel. Safe to call at any time.
    pub async fn disconnect(&mut self) {
        for failure in self.session.disconnect().await {
            self.push_log(Severity::Error, format!("Error while disconnecting: {failure}"));
        }
        self.flush_partial_line();
        self.state.set_disconnected();
        self.push_log(Severity::Info, "Disconnected from ESP32");
    }

    /// Best-effort teardown on exit
    pub async fn shutdown(&mut self) {
        if self.session.is_connected() {
            self.disconnect().await;
        }
    }

    /// Choose the device for the next connect
    pub fn select_port(&mut self, path: String) {
        if self.session.is_connected() {
            self.push_log(Severity::Warning, "Disconnect before choosing another port");
            return;
        }
        self.push_log(Severity::Info, format!("Next connection will use {path}"));
        self.session.set_port_path(Some(path));
    }

    /// Visible serial ports, or the reason they cannot be listed
    pub fn list_ports(&mut self) -> Vec<PortInfo> {
        match self.session.list_ports() {
            Ok(ports) => ports,
            Err(e) => {
                self.push_log(Severity::Error, format!("Cannot list serial ports: {e}"));
                Vec::new()
            }
        }
    }

    /// Write a command to the device. Returns whether it was written.
    pub async fn send_command(&mut self, command: &Command) -> bool {
        if !self.session.is_connected() {
            self.push_log(Severity::Error, "Not connected to ESP32");
            return false;
        }

        let text = command.to_string();
        match self.session.send(&text).await {
            Ok(_) => {
                self.push_log(Severity::Command, format!("Command sent: {text}"));
                true
            }
            Err(e) => {
                self.push_log(Severity::Error, format!("Failed to send command: {e}"));
                false
            }
        }
    }

    /// Water a plant and keep its control busy for the watering time
    pub async fn irrigate(&mut self, plant: SensorId, seconds: u32) {
        if self.state.is_irrigating(plant) {
            self.push_log(
                Severity::Warning,
                format!("Plant {} is already being watered", plant.number()),
            );
            return;
        }

        let command = Command::Irrigate {
            plant: plant.number(),
            seconds,
        };
        if self.send_command(&command).await {
            let until = Instant::now() + Duration::from_secs(u64::from(seconds));
            self.state.start_irrigation(plant, until);
        }
    }

    /// Send the dry threshold; `None` uses the dry limit field
    pub async fn calibrate_dry(&mut self, value: Option<String>) {
        if let Some(value) = value {
            self.state.config.dry_limit = value;
        }
        let field = self.state.config.dry_limit.clone();
        match Command::parse_arg("dry limit", &field) {
            Ok(value) => {
                self.send_command(&Command::CalibrateDry(value)).await;
            }
            Err(e) => self.report_invalid(e),
        }
    }

    /// Send the wet threshold; `None` uses the wet limit field
    pub async fn calibrate_wet(&mut self, value: Option<String>) {
        if let Some(value) = value {
            self.state.config.wet_limit = value;
        }
        let field = self.state.config.wet_limit.clone();
        match Command::parse_arg("wet limit", &field) {
            Ok(value) => {
                self.send_command(&Command::CalibrateWet(value)).await;
            }
            Err(e) => self.report_invalid(e),
        }
    }

    /// Send the read interval; `None` uses the interval field
    pub async fn set_interval(&mut self, value: Option<String>) {
        if let Some(value) = value {
            self.state.config.read_interval = value;
        }
        let field = self.state.config.read_interval.clone();
        match Command::parse_arg("read interval", &field) {
            Ok(value) => {
                self.send_command(&Command::Interval(value)).await;
            }
            Err(e) => self.report_invalid(e),
        }
    }

    /// Send free text typed by the user. Blank input is ignored.
    pub async fn send_custom(&mut self, text: &str) {
        match Command::custom(text) {
            Ok(command) => {
                self.send_command(&command).await;
            }
            Err(CommandError::Empty) => {}
            Err(e) => self.report_invalid(e),
        }
    }

    fn report_invalid(&mut self, error: CommandError) {
        self.push_log(Severity::Error, format!("Invalid command: {error}"));
    }

    /// Run a panel action. View-only actions are left to the front-end.
    pub async fn perform(&mut self, action: UserAction) {
        match action {
            UserAction::Toggle => self.toggle_connection().await,
            UserAction::Connect => self.connect().await,
            UserAction::Disconnect => self.disconnect().await,
            UserAction::SelectPort(path) => self.select_port(path),
            UserAction::Test => {
                self.send_command(&Command::Test).await;
            }
            UserAction::Reset => {
                self.send_command(&Command::Reset).await;
            }
            UserAction::Irrigate { plant, seconds } => self.irrigate(plant, seconds).await,
            UserAction::CalibrateDry(value) => self.calibrate_dry(value).await,
            UserAction::CalibrateWet(value) => self.calibrate_wet(value).await,
            UserAction::Interval(value) => self.set_interval(value).await,
            UserAction::Send(text) => self.send_custom(&text).await,
            UserAction::ListPorts
            | UserAction::Status
            | UserAction::Log(_)
            | UserAction::Help
            | UserAction::Quit
            | UserAction::Nothing => {}
        }
    }

    /// React to the read loop
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        if self.session.connection() != Some(event.connection()) {
            debug!("Dropping event from closed connection {}", event.connection());
            return;
        }

        match event {
            SessionEvent::Chunk { text, .. } => self.on_chunk(&text),
            SessionEvent::Eof { .. } => {
                self.flush_partial_line();
                self.push_log(Severity::Warning, "Device closed the connection");
            }
            SessionEvent::ReadFailed { error, .. } => {
                self.flush_partial_line();
                self.push_log(Severity::Error, format!("Read error: {error}"));
            }
        }
    }

    /// Route a piece of decoded device output into the panel
    pub fn on_chunk(&mut self, text: &str) {
        let events = match self.assembler.as_mut() {
            Some(assembler) => route_chunk(&assembler.push(text)),
            None => route_chunk(text),
        };
        self.apply_events(events);
    }

    /// Route whatever unterminated text the assembler still holds
    fn flush_partial_line(&mut self) {
        if let Some(rest) = self.assembler.as_mut().map(LineAssembler::flush) {
            self.apply_events(route_chunk(&rest));
        }
    }

    fn apply_events(&mut self, events: Vec<PanelEvent>) {
        for event in events {
            match event {
                PanelEvent::Sensor(update) => self.state.apply_sensor(&update),
                PanelEvent::Config(update) => self.state.apply_config(&update),
                PanelEvent::Log { severity, message } => self.push_log(severity, message),
            }
        }
    }

    /// Release irrigation controls whose time is up
    pub fn tick(&mut self, now: Instant) {
        for plant in self.state.expire_irrigation(now) {
            debug!("Plant {} watering window elapsed", plant.number());
        }
    }
}

#[cfg(test)]
mod tests {
    use irrigation_protocol::StatusClass;
    use serial_session::{MemoryPortOpener, SerialConfig};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;
    use crate::state::SensorCard;

    fn panel_with(options: PanelOptions) -> (Panel<MemoryPortOpener>, mpsc::Receiver<SessionEvent>, MemoryPortOpener) {
        let opener = MemoryPortOpener::new();
        let (session, events) = SerialSession::new(opener.clone(), SerialConfig::default());
        (Panel::new(session, options), events, opener)
    }

    fn panel() -> (Panel<MemoryPortOpener>, mpsc::Receiver<SessionEvent>, MemoryPortOpener) {
        panel_with(PanelOptions::default())
    }

    async fn connected() -> (Panel<MemoryPortOpener>, mpsc::Receiver<SessionEvent>, DuplexStream) {
        let (mut panel, events, opener) = panel();
        panel.startup();
        panel.connect().await;
        assert!(panel.state().connected);
        let device = opener.take_device().unwrap();
        (panel, events, device)
    }

    fn last_message<O: PortOpener>(panel: &Panel<O>) -> (Severity, String) {
        let entry = panel.log().last().unwrap();
        (entry.severity.clone(), entry.message.clone())
    }

    async fn read_line(device: &mut DuplexStream) -> String {
        let mut line = Vec::new();
        loop {
            let byte = device.read_u8().await.unwrap();
            line.push(byte);
            if byte == b'\n' {
                return String::from_utf8(line).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_startup_ready() {
        let (mut panel, _events, _opener) = panel();
        panel.startup();
        assert!(panel.state().connect_enabled);
        assert_eq!(last_message(&panel).0, Severity::Success);
    }

    #[tokio::test]
    async fn test_startup_unsupported_disables_connect() {
        let (mut panel, _events, opener) = panel();
        opener.set_unsupported();
        panel.startup();

        assert!(!panel.state().connect_enabled);
        assert_eq!(panel.log().len(), 2);
        assert!(panel.log().iter().all(|e| e.severity == Severity::Warning));

        panel.connect().await;
        assert!(!panel.state().connected);
        assert_eq!(opener.open_count(), 0);
        assert_eq!(last_message(&panel).0, Severity::Error);
    }

    #[tokio::test]
    async fn test_connect_failure_logged() {
        let (mut panel, _events, opener) = panel();
        opener.fail_next_open("permission denied");
        panel.connect().await;

        assert!(!panel.state().connected);
        assert!(!panel.state().controls_enabled);
        let (severity, message) = last_message(&panel);
        assert_eq!(severity, Severity::Error);
        assert!(message.contains("permission denied"));
    }

    #[tokio::test]
    async fn test_send_without_connection_logs_error() {
        let (mut panel, _events, opener) = panel();
        assert!(!panel.send_command(&Command::Test).await);
        assert_eq!(
            last_message(&panel),
            (Severity::Error, "Not connected to ESP32".to_string())
        );
        assert_eq!(opener.open_count(), 0);
    }

    #[tokio::test]
    async fn test_commands_reach_device() {
        let (mut panel, _events, mut device) = connected().await;

        panel.perform(UserAction::Test).await;
        assert_eq!(read_line(&mut device).await, "TEST\n");
        assert_eq!(
            last_message(&panel),
            (Severity::Command, "Command sent: TEST".to_string())
        );

        panel.perform(UserAction::Reset).await;
        assert_eq!(read_line(&mut device).await, "RESET\n");

        panel.perform(UserAction::Send("  LIGAR BOMBA ".into())).await;
        assert_eq!(read_line(&mut device).await, "LIGAR BOMBA\n");
    }

    #[tokio::test]
    async fn test_blank_custom_ignored() {
        let (mut panel, _events, _device) = connected().await;
        let before = panel.log().len();
        panel.send_custom("   ").await;
        assert_eq!(panel.log().len(), before);
    }

    #[tokio::test]
    async fn test_calibration_uses_fields() {
        let (mut panel, _events, mut device) = connected().await;

        panel.on_chunk("{\"type\":\"config\",\"limiteSecoAtual\":3000,\"limiteUmidoAtual\":1200}\n");
        panel.calibrate_dry(None).await;
        assert_eq!(read_line(&mut device).await, "CALIBRAR:SECO:3000\n");

        panel.calibrate_wet(Some("1100".into())).await;
        assert_eq!(read_line(&mut device).await, "CALIBRAR:UMIDO:1100\n");
        assert_eq!(panel.state().config.wet_limit, "1100");

        // Interval field never reported
        panel.set_interval(None).await;
        let (severity, message) = last_message(&panel);
        assert_eq!(severity, Severity::Error);
        assert!(message.contains("read interval"));

        panel.set_interval(Some("45".into())).await;
        assert_eq!(read_line(&mut device).await, "INTERVALO:45\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrigation_busy_until_elapsed() {
        let (mut panel, _events, mut device) = connected().await;

        panel.irrigate(SensorId::One, 3).await;
        assert_eq!(read_line(&mut device).await, "IRRIGAR:1:3\n");
        assert!(!panel.state().can_irrigate(SensorId::One));
        assert!(panel.state().can_irrigate(SensorId::Two));

        panel.irrigate(SensorId::One, 3).await;
        assert_eq!(last_message(&panel).0, Severity::Warning);

        tokio::time::advance(Duration::from_secs(2)).await;
        panel.tick(Instant::now());
        assert!(panel.state().is_irrigating(SensorId::One));

        tokio::time::advance(Duration::from_secs(2)).await;
        panel.tick(Instant::now());
        assert!(panel.state().can_irrigate(SensorId::One));
    }

    #[tokio::test]
    async fn test_irrigate_while_disconnected_not_busy() {
        let (mut panel, _events, _opener) = panel();
        panel.irrigate(SensorId::Two, 5).await;
        assert!(!panel.state().is_irrigating(SensorId::Two));
        assert_eq!(last_message(&panel).0, Severity::Error);
    }

    #[tokio::test]
    async fn test_device_data_updates_cards() {
        let (mut panel, mut events, mut device) = connected().await;
        device
            .write_all(b"{\"type\":\"data\",\"sensor1\":42,\"humidity1\":55,\"status1\":\"OK\"}\n")
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        panel.handle_session_event(event);

        let card = &panel.state().sensor1;
        assert_eq!(card.value, "42");
        assert_eq!(card.humidity_percent, 55.0);
        assert_eq!(card.status, "OK");
        assert_eq!(card.class, StatusClass::Primary);
        assert_eq!(panel.state().sensor2, SensorCard::disconnected());
    }

    #[tokio::test]
    async fn test_split_record_reassembled() {
        let (mut panel, _events, _device) = connected().await;
        panel.on_chunk("{\"type\":\"data\",\"sen");
        assert_eq!(panel.state().sensor1.value, "--");
        panel.on_chunk("sor1\":7,\"status1\":\"Muito Seco\"}\n");
        assert_eq!(panel.state().sensor1.value, "7");
        assert_eq!(panel.state().sensor1.class, StatusClass::Danger);
    }

    #[tokio::test]
    async fn test_per_chunk_splitting_when_reassembly_off() {
        let (mut panel, _events, _opener) = panel_with(PanelOptions {
            reassemble_lines: false,
            ..Default::default()
        });
        panel.on_chunk("{\"type\":\"da");
        assert_eq!(
            last_message(&panel),
            (Severity::Raw, "ESP32: {\"type\":\"da".to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_json_shown_raw() {
        let (mut panel, _events, _device) = connected().await;
        panel.on_chunk("{not json}\n");
        assert_eq!(
            last_message(&panel),
            (Severity::Raw, "ESP32: {not json}".to_string())
        );
    }

    #[tokio::test]
    async fn test_device_log_uses_its_level() {
        let (mut panel, _events, _device) = connected().await;
        panel.on_chunk("{\"type\":\"log\",\"message\":\"Pump fault\",\"level\":\"error\"}\n");
        assert_eq!(
            last_message(&panel),
            (Severity::Error, "ESP32: Pump fault".to_string())
        );
    }

    #[tokio::test]
    async fn test_log_capped() {
        let (mut panel, _events, _device) = connected().await;
        for i in 0..150 {
            panel.on_chunk(&format!("line {i}\n"));
        }
        assert_eq!(panel.log().len(), 100);
        assert_eq!(panel.log().iter().next().unwrap().message, "ESP32: line 50");
    }

    #[tokio::test]
    async fn test_disconnect_twice() {
        let (mut panel, _events, _device) = connected().await;
        panel.on_chunk("{\"type\":\"data\",\"sensor2\":10}\n");

        panel.disconnect().await;
        panel.disconnect().await;

        let state = panel.state();
        assert!(!state.connected);
        assert!(!state.controls_enabled);
        assert_eq!(state.sensor2, SensorCard::disconnected());
        assert_eq!(
            last_message(&panel),
            (Severity::Info, "Disconnected from ESP32".to_string())
        );
        assert!(
            !panel
                .log()
                .iter()
                .any(|e| e.message.starts_with("Error while disconnecting"))
        );
    }

    #[tokio::test]
    async fn test_toggle() {
        let (mut panel, _events, opener) = panel();
        panel.toggle_connection().await;
        assert!(panel.state().connected);
        panel.toggle_connection().await;
        assert!(!panel.state().connected);
        assert_eq!(opener.open_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_events_ignored() {
        let (mut panel, mut events, mut device) = connected().await;
        device
            .write_all(b"{\"type\":\"data\",\"sensor1\":99}\n")
            .await
            .unwrap();
        let stale = events.recv().await.unwrap();

        panel.disconnect().await;
        panel.handle_session_event(stale);
        assert_eq!(panel.state().sensor1.value, "--");
    }

    #[tokio::test]
    async fn test_read_failure_logged() {
        let (mut panel, mut events, opener) = panel();
        opener.fail_reads("device reports readiness to read but returned no data");
        panel.startup();
        panel.connect().await;

        let event = timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, SessionEvent::ReadFailed { .. }));
        panel.handle_session_event(event);

        let (severity, message) = last_message(&panel);
        assert_eq!(severity, Severity::Error);
        assert!(message.starts_with("Read error: "), "{message}");
        // Connection is left as is until the user disconnects
        assert!(panel.state().connected);
    }

    #[tokio::test]
    async fn test_read_failure_flushes_partial_line() {
        let (mut panel, _events, _device) = connected().await;
        panel.on_chunk("Bomba lig");
        let id = panel.session().connection().unwrap();
        panel.handle_session_event(SessionEvent::ReadFailed {
            id,
            error: "broken pipe".into(),
        });

        let messages: Vec<_> = panel.log().iter().map(|e| e.message.clone()).collect();
        assert!(messages.contains(&"ESP32: Bomba lig".to_string()));
    }

    #[tokio::test]
    async fn test_partial_line_logged_on_disconnect() {
        let (mut panel, _events, _device) = connected().await;
        panel.on_chunk("Bomba ligada");
        assert!(!panel.log().iter().any(|e| e.message == "ESP32: Bomba ligada"));

        panel.disconnect().await;
        let messages: Vec<_> = panel.log().recent(2).map(|e| e.message.clone()).collect();
        assert_eq!(messages, vec!["ESP32: Bomba ligada", "Disconnected from ESP32"]);
    }

    #[tokio::test]
    async fn test_write_failure_logged() {
        let (mut panel, _events, opener) = panel();
        opener.fail_writes("device gone");
        panel.startup();
        panel.connect().await;

        assert!(!panel.send_command(&Command::Test).await);
        let (severity, message) = last_message(&panel);
        assert_eq!(severity, Severity::Error);
        assert!(message.starts_with("Failed to send command: "), "{message}");
        assert!(panel.state().connected);
    }

    #[tokio::test]
    async fn test_take_new_entries() {
        let (mut panel, _events, _opener) = panel();
        panel.startup();
        assert_eq!(panel.take_new_entries().len(), 1);
        assert!(panel.take_new_entries().is_empty());
        panel.on_chunk("a\nb\n");
        let new: Vec<_> = panel
            .take_new_entries()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(new, vec!["ESP32: a", "ESP32: b"]);
    }

    #[tokio::test]
    async fn test_shutdown_disconnects() {
        let (mut panel, _events, _device) = connected().await;
        panel.shutdown().await;
        assert!(!panel.session().is_connected());
        let count = panel.log().len();
        panel.shutdown().await;
        assert_eq!(panel.log().len(), count);
    }
}
