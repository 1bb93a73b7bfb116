//! Transport assembly and command execution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::{Result, WrapErr};
use serde_json::json;
use washcall_config::Config;
use washcall_core::{
    ClientError, Dashboard, DashboardEvent, LinkStatus, MachineId, MachineState, RealtimeSupervisor,
    Weekday,
};
use washcall_traits::{Backend, MonotonicClock, Realtime};
use washcall_transport::{HttpBackend, SimulatedServer, WsRealtime, ws_url};
use washcall_ui::{
    Locale, congestion_chart, no_tip_text, notification_text, render, reservation_text,
    untracked_notification_text,
};

/// Poll interval of the watch loop; bounds Ctrl-C latency.
const WATCH_POLL: Duration = Duration::from_millis(100);

pub struct Transport {
    backend: Box<dyn Backend>,
    realtime: Box<dyn Realtime>,
    simulated: bool,
}

impl Transport {
    pub fn network(cfg: &Config) -> Result<Self> {
        let timeout = Duration::from_millis(cfg.server.request_timeout_ms);
        let token = cfg.server.token.clone();
        let backend = HttpBackend::new(&cfg.server.base_url, token.clone(), timeout)
            .wrap_err("invalid server.base_url in config")?;
        let url = ws_url(&cfg.server.base_url, &cfg.realtime.path, token.as_deref())
            .wrap_err("invalid server.base_url in config")?;
        let realtime = WsRealtime::new(url, Duration::from_millis(cfg.realtime.read_timeout_ms));
        Ok(Self {
            backend: Box::new(backend),
            realtime: Box::new(realtime),
            simulated: false,
        })
    }

    pub fn simulated(cfg: &Config) -> Self {
        let server = SimulatedServer::new();
        Self {
            backend: Box::new(server.backend()),
            realtime: Box::new(server.realtime(Duration::from_millis(cfg.simulation.tick_ms))),
            simulated: true,
        }
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        if cfg.simulation.enabled {
            Ok(Self::simulated(cfg))
        } else {
            Self::network(cfg)
        }
    }
}

/// A loaded dashboard plus the realtime connector that belongs to the same server.
pub struct Session {
    pub dashboard: Dashboard<Box<dyn Backend>>,
    realtime: Box<dyn Realtime>,
    pub simulated: bool,
    pub dropped: usize,
}

impl Session {
    /// Build the transport and perform the initial load, switching to the
    /// simulation when the server is unreachable and the config allows it.
    pub fn open(cfg: &Config) -> Result<Self> {
        let transport = Transport::from_config(cfg)?;
        match Self::load(cfg, transport) {
            Ok(s) => Ok(s),
            Err(ClientError::Transport(reason))
                if cfg.simulation.fallback_on_network_error && !cfg.simulation.enabled =>
            {
                tracing::warn!(%reason, "server unreachable; falling back to simulated data");
                Ok(Self::load(cfg, Transport::simulated(cfg))?)
            }
            Err(e) => Err(e).wrap_err("initial machine load failed"),
        }
    }

    fn load(cfg: &Config, transport: Transport) -> std::result::Result<Self, ClientError> {
        let mut dashboard = Dashboard::new(transport.backend, cfg.ui.courses.clone());
        let report = dashboard.load()?;
        if report.dropped > 0 {
            tracing::warn!(dropped = report.dropped, "some machine records were unusable");
        }
        Ok(Self {
            dashboard,
            realtime: transport.realtime,
            simulated: transport.simulated,
            dropped: report.dropped,
        })
    }
}

pub struct Output {
    pub json: bool,
    pub locale: Locale,
}

impl Output {
    pub fn card(&self, state: &MachineState) -> Result<()> {
        let card = render(state, self.locale);
        if self.json {
            println!("{}", serde_json::to_string(&card)?);
        } else {
            println!("{}", card.to_line());
        }
        Ok(())
    }

    pub fn all(&self, dashboard: &Dashboard<Box<dyn Backend>>) -> Result<()> {
        for m in dashboard.registry().all() {
            self.card(m)?;
        }
        Ok(())
    }

    fn event(&self, dashboard: &Dashboard<Box<dyn Backend>>, ev: &DashboardEvent) -> Result<()> {
        match ev {
            DashboardEvent::Updated(id) => {
                if let Some(m) = dashboard.machine(*id) {
                    self.card(m)?;
                }
            }
            DashboardEvent::Notification { machine_id, status } => {
                let text = match dashboard.machine(*machine_id) {
                    Some(m) => {
                        let card = render(m, self.locale);
                        notification_text(&card.name, *status, m.machine_type(), self.locale)
                    }
                    None => untracked_notification_text(*machine_id, *status, self.locale),
                };
                if self.json {
                    println!(
                        "{}",
                        json!({ "event": "notification", "machine_id": machine_id, "status": status, "text": text })
                    );
                } else {
                    println!("** {text}");
                }
            }
            DashboardEvent::SubscriptionReleased(id) => {
                if self.json {
                    println!("{}", json!({ "event": "subscription_released", "machine_id": id }));
                }
            }
            DashboardEvent::Link(status) => {
                let label = match status {
                    LinkStatus::Connecting => "connecting",
                    LinkStatus::Connected => "connected",
                    LinkStatus::Disconnected => "disconnected",
                };
                if self.json {
                    println!("{}", json!({ "event": "link", "status": label }));
                } else {
                    println!("-- realtime {label}");
                }
            }
        }
        Ok(())
    }
}

pub fn list(session: &Session, out: &Output) -> Result<()> {
    out.all(&session.dashboard)
}

pub fn start(session: &mut Session, out: &Output, machine: MachineId, course: &str) -> Result<()> {
    let state = session
        .dashboard
        .start_course(machine, course)
        .wrap_err_with(|| format!("starting {course:?} on machine {machine}"))?
        .clone();
    out.card(&state)
}

pub fn notify(session: &mut Session, out: &Output, machine: MachineId, subscribe: bool) -> Result<()> {
    let state = session
        .dashboard
        .toggle_notify(machine, subscribe)
        .wrap_err_with(|| format!("updating notifications for machine {machine}"))?
        .clone();
    out.card(&state)
}

pub fn congestion(session: &mut Session, out: &Output, day: Option<Weekday>) -> Result<()> {
    let table = session
        .dashboard
        .congestion()
        .wrap_err("loading congestion statistics")?;
    let charts = congestion_chart(&table, day, out.locale);
    if charts.is_empty() {
        tracing::warn!(?day, "no congestion data for the requested day");
    }
    for chart in &charts {
        if out.json {
            println!("{}", serde_json::to_string(chart)?);
        } else {
            for line in chart.to_lines() {
                println!("{line}");
            }
        }
    }
    Ok(())
}

pub fn tip(session: &mut Session, out: &Output) -> Result<()> {
    let tip = session
        .dashboard
        .congestion_tip()
        .wrap_err("loading congestion tip")?;
    if out.json {
        println!("{}", json!({ "tip": tip }));
    } else {
        println!("{}", tip.as_deref().unwrap_or(no_tip_text(out.locale)));
    }
    Ok(())
}

pub fn reserve(session: &mut Session, out: &Output, room: u32, on: bool) -> Result<()> {
    let reserved = session
        .dashboard
        .reserve_room(room, on)
        .wrap_err_with(|| format!("updating alerts for room {room}"))?;
    if out.json {
        println!("{}", json!({ "room_id": room, "reserved": reserved }));
    } else {
        println!("{}", reservation_text(room, reserved, out.locale));
    }
    Ok(())
}

pub fn health(session: &Session, out: &Output) -> Result<()> {
    let machines = session.dashboard.registry().len();
    let backend = if session.simulated { "simulated" } else { "http" };
    if out.json {
        println!(
            "{}",
            json!({ "ok": true, "backend": backend, "machines": machines, "dropped": session.dropped })
        );
    } else {
        println!("ok: {machines} machines via {backend} backend");
    }
    Ok(())
}

pub struct WatchLimits {
    pub max_events: Option<usize>,
    pub duration: Option<Duration>,
}

pub fn watch(
    session: Session,
    out: &Output,
    limits: &WatchLimits,
    reconnect_delay: Duration,
    shutdown: &Arc<AtomicBool>,
) -> Result<()> {
    let Session {
        mut dashboard,
        realtime,
        ..
    } = session;
    out.all(&dashboard)?;

    let supervisor = RealtimeSupervisor::spawn(realtime, reconnect_delay, MonotonicClock::new());
    let deadline = limits.duration.map(|d| Instant::now() + d);
    let mut emitted = 0usize;

    while !shutdown.load(Ordering::Relaxed) {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::debug!("watch duration elapsed");
            break;
        }
        let Some(link_event) = supervisor.next_event(WATCH_POLL) else {
            continue;
        };
        for ev in dashboard.handle_link(&link_event) {
            if let DashboardEvent::SubscriptionReleased(id) = ev
                && let Err(e) = dashboard.release_subscription(id)
            {
                tracing::warn!(machine_id = id, error = %e, "could not release subscription on server");
            }
            out.event(&dashboard, &ev)?;
            emitted += 1;
            if limits.max_events.is_some_and(|n| emitted >= n) {
                tracing::debug!(emitted, "event limit reached");
                return Ok(());
            }
        }
    }
    Ok(())
}
