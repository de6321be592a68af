use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use insight_client::{
    ControllerOptions, DashboardController, HttpDashboardApi, Selection, Session, ViewState,
};
use insight_protocol::{FilterCatalog, FilterField, SelectedFilters};
use insight_shape::ZeroMetric;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

mod command;
mod render;

use command::Command;

#[derive(Debug, Parser)]
#[command(
    name = "insight-mini",
    version,
    about = "Terminal dashboard: filter records and print chart series as text bars"
)]
struct Args {
    #[arg(long, env = "INSIGHT_BASE", default_value = "http://127.0.0.1:5000")]
    base: String,
    /// Log in as this user before querying
    #[arg(long, env = "INSIGHT_USERNAME")]
    username: Option<String>,
    #[arg(long, env = "INSIGHT_PASSWORD", hide_env_values = true)]
    password: Option<String>,
    /// Create the account with this email instead of logging in
    #[arg(long, requires = "username")]
    signup_email: Option<String>,
    /// Initial selection, repeatable (e.g. --filter sector=Energy)
    #[arg(long = "filter", value_parser = command::parse_filter)]
    filters: Vec<(FilterField, String)>,
    /// Count zero measurements when averaging intensity
    #[arg(long, default_value_t = false)]
    count_zero_metrics: bool,
    /// Maximum bar width in characters
    #[arg(long, default_value_t = render::DEFAULT_WIDTH)]
    width: usize,
    /// Print each view as JSON instead of text bars
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Print the first view and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

impl Args {
    fn controller_options(&self) -> ControllerOptions {
        let mut initial_filters = SelectedFilters::new();
        for (field, value) in &self.filters {
            initial_filters.set(*field, value.clone());
        }
        ControllerOptions {
            zero_metric: if self.count_zero_metrics {
                ZeroMetric::Include
            } else {
                ZeroMetric::Skip
            },
            initial_filters,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    insight_telemetry::init();
    let args = Args::parse();

    let anon = HttpDashboardApi::new(args.base.clone());
    let session = open_session(&anon, &args).await?;
    let api = anon.clone().with_session(session.clone());
    let controller = DashboardController::start(api, args.controller_options()).await;

    let mut rx = controller.subscribe();
    let first = rx
        .wait_for(|state| !matches!(state, ViewState::Loading))
        .await
        .context("dashboard controller stopped")?
        .clone();
    emit(&first, &args);

    let outcome = if args.once {
        Ok(())
    } else {
        command_loop(&controller, &args).await
    };

    if let Some(session) = session {
        if let Err(err) = anon.logout(session).await {
            warn!(%err, "logout failed");
        }
    }
    outcome
}

async fn open_session(api: &HttpDashboardApi, args: &Args) -> Result<Option<Session>> {
    let Some(username) = args.username.as_deref() else {
        return Ok(None);
    };
    let password = args.password.as_deref().unwrap_or_default();
    let session = match args.signup_email.as_deref() {
        Some(email) => api
            .signup(username, email, password)
            .await
            .context("signing up")?,
        None => api
            .login(username, password)
            .await
            .context("logging in")?,
    };
    info!(user = %session.user.username, expires_at = %session.expires_at, "session opened");
    Ok(Some(session))
}

async fn command_loop(
    controller: &DashboardController<HttpDashboardApi>,
    args: &Args,
) -> Result<()> {
    println!("{}", command::HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            return Ok(());
        };
        let command = match command::parse(&line) {
            Ok(Some(Command::Quit)) => return Ok(()),
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                eprintln!("{message}");
                continue;
            }
        };
        let task = match command {
            Command::Set(field, value) => controller.set_filter(field, Selection::value(value)),
            Command::Clear(field) => controller.clear_filter(field),
            Command::Reset => controller.reset(),
            Command::Refresh => controller.refresh(),
            Command::Options(field) => {
                println!("{}", describe_options(controller.catalog(), field));
                continue;
            }
            Command::Filters => {
                println!("{}", describe_filters(&controller.filters()));
                continue;
            }
            Command::Help => {
                println!("{}", command::HELP);
                continue;
            }
            Command::Quit => return Ok(()),
        };
        task.await.context("dashboard query task")?;
        emit(&controller.current(), args);
    }
}

fn describe_options(catalog: &FilterCatalog, field: FilterField) -> String {
    let options = catalog.options(field);
    if options.is_empty() {
        format!("{}: (no options)", field.label())
    } else {
        format!("{}: {}", field.label(), options.join(", "))
    }
}

fn describe_filters(filters: &SelectedFilters) -> String {
    if filters.is_empty() {
        return "filters: (none)".to_string();
    }
    let pairs: Vec<String> = filters
        .iter()
        .map(|(field, value)| format!("{}={value}", field.as_str()))
        .collect();
    format!("filters: {}", pairs.join(" "))
}

fn emit(state: &ViewState, args: &Args) {
    if args.json {
        println!("{}", render::state_json(state));
    } else {
        let now = Local::now().format("%H:%M:%S");
        println!("[{now}] {}", render::render_state(state, args.width));
    }
}
