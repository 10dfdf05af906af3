//! [`Agent`]: one signed-in session wired to the SQLite backend.

use std::{collections::HashMap, sync::Arc};

use anyhow::{Context as _, anyhow};
use fieldline_core::{
  search::SearchResultSet,
  session::{Session, SessionIdentity},
  text::status_label,
};
use fieldline_realtime::{
  AlertEngine, LiveLocationReporter, ResultsListener, SearchAggregator,
};
use fieldline_store_sqlite::{NewClient, NewEquipment, NewWorkOrder, SqliteStore};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  command::{Command, HELP},
  config::AgentConfig,
  platform::{Console, ConsolePlatform, FixedSensor},
};

/// Whether the input loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
  Continue,
  Quit,
}

pub struct Agent {
  store:    Arc<SqliteStore>,
  session:  Session,
  console:  Console,
  engine:   AlertEngine<SqliteStore, ConsolePlatform>,
  reporter: LiveLocationReporter<FixedSensor, SqliteStore>,
  search:   SearchAggregator<SqliteStore>,
  _results: ResultsListener,
  /// Stand-in identities for `log @name`.
  authors:  HashMap<String, SessionIdentity>,
}

impl Agent {
  /// Start alerts, location reporting and search for the configured session.
  pub async fn start(
    config: &AgentConfig,
    store: Arc<SqliteStore>,
    console: Console,
  ) -> anyhow::Result<Self> {
    let session = config.session.session();
    let platform = Arc::new(ConsolePlatform::new(config.platform.clone(), console.clone()));
    let sensor = Arc::new(FixedSensor::new(&config.sensor));

    let mut engine = AlertEngine::new(store.clone(), platform, config.realtime.alerts.clone());
    if let Err(e) = engine.request_permission().await {
      warn!(error = %e, "notifications disabled");
      console.line(format_args!("notifications disabled: {e}"))?;
    }
    engine
      .start(session.identity.clone())
      .context("failed to start alert engine")?;

    let mut reporter =
      LiveLocationReporter::new(sensor, store.clone(), config.realtime.location.clone());
    reporter.start(&session.identity, session.role);

    let search = SearchAggregator::new(store.clone(), config.realtime.search.clone());
    let printer = console.clone();
    let results = search.on_results_changed(move |set| {
      if let Err(e) = print_results(&printer, set) {
        warn!(error = %e, "failed to print search results");
      }
    });

    info!(
      user_id = %session.identity.user_id,
      role = %session.role,
      "session started"
    );
    Ok(Self {
      store,
      session,
      console,
      engine,
      reporter,
      search,
      _results: results,
      authors: HashMap::new(),
    })
  }

  pub fn session(&self) -> &Session { &self.session }

  pub async fn execute(&mut self, command: Command) -> anyhow::Result<Flow> {
    match command {
      Command::Search(text) => self.search.set_query(&text),
      Command::OpenOrder { code, description } => {
        let order = self
          .store
          .insert_order(NewWorkOrder {
            code,
            client_name: None,
            description,
          })
          .await?;
        self.say(format_args!("opened {} ({})", order.code, order.id))?;
      }
      Command::SetStatus { code, status } => {
        let order = self.order_by_code(&code).await?;
        let order = self.store.set_order_status(order.id, status).await?;
        self.say(format_args!("{} is now {}", order.code, status_label(&order.status)))?;
      }
      Command::DeleteOrder { code } => {
        let order = self.order_by_code(&code).await?;
        self.store.delete_order(order.id).await?;
        self.say(format_args!("deleted {code}"))?;
      }
      Command::NewClient { name } => {
        let client = self
          .store
          .insert_client(NewClient {
            name,
            ..NewClient::default()
          })
          .await?;
        self.say(format_args!("added client {}", client.name))?;
      }
      Command::NewEquipment { serial, name } => {
        let equipment = self
          .store
          .insert_equipment(NewEquipment {
            name,
            serial_number: Some(serial),
            ..NewEquipment::default()
          })
          .await?;
        self.say(format_args!("added equipment {}", equipment.name))?;
      }
      Command::Log {
        order,
        author,
        text,
      } => {
        let order_id = match order {
          Some(code) => Some(self.order_by_code(&code).await?.id),
          None => None,
        };
        let author = match author {
          Some(name) => self.author(name),
          None => self.session.identity.clone(),
        };
        self.store.log_activity(&author, order_id, text).await?;
      }
      Command::Permission => match self.engine.request_permission().await {
        Ok(()) => self.say(format_args!("notifications enabled"))?,
        Err(e) => self.say(format_args!("{e}"))?,
      },
      Command::State => self.print_state().await?,
      Command::Help => self.say(format_args!("{HELP}"))?,
      Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
  }

  /// Stop every component and wait for their tasks.
  pub async fn shutdown(mut self) {
    self.search.cancel();
    self.engine.stop().await;
    self.reporter.stop().await;
    info!(user_id = %self.session.identity.user_id, "session ended");
  }

  async fn order_by_code(&self, code: &str) -> anyhow::Result<fieldline_core::records::WorkOrder> {
    self
      .store
      .find_order_by_code(code)
      .await?
      .ok_or_else(|| anyhow!("no work order {code}"))
  }

  fn author(&mut self, name: String) -> SessionIdentity {
    self
      .authors
      .entry(name.clone())
      .or_insert_with(|| SessionIdentity {
        user_id:      Uuid::new_v4(),
        display_name: name,
      })
      .clone()
  }

  async fn print_state(&self) -> anyhow::Result<()> {
    let identity = &self.session.identity;
    self.say(format_args!(
      "{} ({}) as {}",
      identity.display_name, identity.user_id, self.session.role
    ))?;
    self.say(format_args!("alerts: {:?}", self.engine.state()))?;
    let location = self.store.profile_location(identity.user_id).await?;
    match (self.reporter.is_running(), location) {
      (false, _) => self.say(format_args!("location: not reported for this role"))?,
      (true, None) => self.say(format_args!("location: waiting for first fix"))?,
      (true, Some(sample)) => self.say(format_args!(
        "location: {:.5}, {:.5} ({} accuracy at {})",
        sample.lat, sample.lng, sample.accuracy_tier, sample.captured_at
      ))?,
    }
    Ok(())
  }

  fn say(&self, args: std::fmt::Arguments<'_>) -> std::io::Result<()> {
    self.console.line(args)
  }
}

fn print_results(console: &Console, set: &SearchResultSet) -> std::io::Result<()> {
  if set.query.is_empty() {
    return Ok(());
  }
  console.line(format_args!(
    "search {:?}: {} order(s), {} client(s), {} equipment",
    set.query,
    set.orders.len(),
    set.clients.len(),
    set.equipments.len()
  ))?;
  for order in &set.orders {
    console.line(format_args!("  order {} [{}]", order.code, status_label(&order.status)))?;
  }
  for client in &set.clients {
    console.line(format_args!("  client {}", client.name))?;
  }
  for equipment in &set.equipments {
    let serial = equipment.serial_number.as_deref().unwrap_or("-");
    console.line(format_args!("  equipment {} ({serial})", equipment.name))?;
  }
  Ok(())
}
