use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use roulette_client::config::BROKER_URL_VAR;
use roulette_client::{
    BrokerConfig, BrokerConnection, Change, GameController, Publisher, Stream,
};
use roulette_types::RESULT_TOPIC;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// CLI flags (override ROULETTE_* environment variables)
#[derive(Parser, Debug)]
#[command(name = "roulette-terminal", about = "Roulette table over an MQTT broker")]
struct Args {
    /// Broker URL (ssl://host:8883, mqtts://, tcp:// or mqtt://)
    #[arg(long)]
    broker: Option<String>,

    /// MQTT client id
    #[arg(long)]
    client_id: Option<String>,

    /// Broker username
    #[arg(long)]
    username: Option<String>,

    /// Broker password
    #[arg(long)]
    password: Option<String>,

    /// Ask the broker to keep session state between connections
    #[arg(long)]
    persistent_session: bool,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,
}

struct CommandDef {
    name: &'static str,
    usage: &'static str,
    desc: &'static str,
    group: &'static str,
}

const fn cmd(name: &'static str, usage: &'static str, desc: &'static str, group: &'static str) -> CommandDef {
    CommandDef { name, usage, desc, group }
}

const COMMANDS: &[CommandDef] = &[
    // Table
    cmd("bet", "bet <0|00|1-36|red|black>", "Place and publish a bet", "Table"),
    cmd("status", "status", "Current bet, last spin and outcome", "Table"),
    cmd("history", "history", "Recent bets and results", "Table"),
    // Session
    cmd("reconnect", "reconnect", "Drop and re-establish the broker connection", "Session"),
    cmd("disconnect", "disconnect", "Close the broker connection", "Session"),
    cmd("help", "help", "Show this list", "Session"),
    cmd("quit", "quit", "Exit", "Session"),
];

#[derive(Debug, PartialEq, Eq)]
enum CommandAction {
    Bet(String),
    Status,
    History,
    Reconnect,
    Disconnect,
    Local(String),
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    info!(?config, "starting roulette terminal");

    let connection = BrokerConnection::new();
    let mut events = Stream::attach(&connection);
    let mut controller = GameController::new(connection.clone());
    let mut changes = controller.subscribe();

    connect_and_subscribe(&connection, &config).await;
    println!("{}", render_help());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        select! {
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    break;
                };
                match handle_line(&line) {
                    Ok(CommandAction::Quit) => break,
                    Ok(CommandAction::Bet(selection)) => {
                        if let Err(err) = controller.place_bet(&selection) {
                            println!("{err}");
                        }
                    }
                    Ok(CommandAction::Status) => println!("{}", render_status(&controller)),
                    Ok(CommandAction::History) => println!("{}", render_history(&controller)),
                    Ok(CommandAction::Reconnect) => {
                        connection.disconnect();
                        connect_and_subscribe(&connection, &config).await;
                    }
                    Ok(CommandAction::Disconnect) => connection.disconnect(),
                    Ok(CommandAction::Local(text)) => {
                        if !text.is_empty() {
                            println!("{text}");
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
            Some(event) = events.next() => {
                // Decode failures are already logged and surfaced as a change.
                let _ = controller.handle(event);
            }
            change = changes.recv() => {
                match change {
                    Ok(change) => println!("{}", render_change(&change)),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "display fell behind"),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    connection.disconnect();
    Ok(())
}

fn load_config(args: &Args) -> Result<BrokerConfig> {
    let broker = args.broker.clone();
    let mut config = BrokerConfig::from_vars(|key| {
        if key == BROKER_URL_VAR {
            if let Some(broker) = &broker {
                return Some(broker.clone());
            }
        }
        std::env::var(key).ok()
    })
    .context("load broker config (set --broker or ROULETTE_BROKER_URL)")?;

    if let Some(client_id) = &args.client_id {
        config.client_id = client_id.clone();
    }
    if let Some(username) = &args.username {
        config.username = Some(username.clone());
    }
    if let Some(password) = &args.password {
        config.password = Some(password.clone());
    }
    if args.persistent_session {
        config.clean_session = false;
    }
    config.validate()?;
    Ok(config)
}

async fn connect_and_subscribe(connection: &BrokerConnection, config: &BrokerConfig) {
    // A failed connect is reported through the connection listener; the table stays usable
    // offline and `reconnect` can be retried.
    if connection.connect(config).await.is_err() {
        return;
    }
    if let Err(err) = connection.subscribe(RESULT_TOPIC) {
        warn!(error = %err, topic = RESULT_TOPIC, "failed to subscribe");
    }
}

fn handle_line(line: &str) -> Result<CommandAction> {
    let line = line.trim();
    let line = line.strip_prefix('/').unwrap_or(line);
    let mut parts = line.split_whitespace();
    let Some(cmd) = parts.next() else {
        return Ok(CommandAction::Local(String::new()));
    };
    let args: Vec<&str> = parts.collect();
    match cmd.to_lowercase().as_str() {
        "quit" | "exit" => Ok(CommandAction::Quit),
        "help" => Ok(CommandAction::Local(render_help())),
        "status" => Ok(CommandAction::Status),
        "history" => Ok(CommandAction::History),
        "reconnect" => Ok(CommandAction::Reconnect),
        "disconnect" => Ok(CommandAction::Disconnect),
        "bet" => match args.as_slice() {
            [selection] => Ok(CommandAction::Bet(selection.to_string())),
            _ => Err(anyhow!("Usage: bet <0|00|1-36|red|black>")),
        },
        other => {
            let known: Vec<&str> = COMMANDS.iter().map(|c| c.name).collect();
            Err(anyhow!("Unknown command {other} (one of: {})", known.join(", ")))
        }
    }
}

fn render_help() -> String {
    let mut by_group: BTreeMap<&str, Vec<&CommandDef>> = BTreeMap::new();
    for c in COMMANDS {
        by_group.entry(c.group).or_default().push(c);
    }
    let mut out = String::new();
    for (group, cmds) in by_group {
        let _ = writeln!(out, "[{group}]");
        for c in cmds {
            let _ = writeln!(out, "  {:<28} {}", c.usage, c.desc);
        }
    }
    out.trim_end().to_string()
}

fn render_status<P: Publisher>(controller: &GameController<P>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Connection: {:?}", controller.connection_state());
    match controller.pending_bet() {
        Some(bet) => {
            let _ = writeln!(out, "Current Bet: {bet}");
        }
        None => out.push_str("Current Bet: none\n"),
    }
    match controller.last_result() {
        Some(result) => {
            let _ = writeln!(out, "Winning Number: {}, Color: {}", result.number, result.color);
        }
        None => out.push_str("Winning Number: none\n"),
    }
    match controller.outcome() {
        Some(outcome) => out.push_str(&outcome.message),
        None => out.push_str("No bet settled yet"),
    }
    out
}

fn render_history<P: Publisher>(controller: &GameController<P>) -> String {
    let mut out = String::from("Recent Results:\n");
    for result in controller.result_history().iter() {
        let _ = writeln!(out, "  {result}");
    }
    out.push_str("Recent Bets:\n");
    for bet in controller.bet_history().iter() {
        let _ = writeln!(out, "  {bet}");
    }
    let tallies: Vec<String> = controller
        .session()
        .tallies()
        .map(|(selection, count)| format!("{}x{count}", selection.label()))
        .collect();
    if tallies.is_empty() {
        out.push_str("Tally: none");
    } else {
        let _ = write!(out, "Tally: {}", tallies.join(", "));
    }
    out
}

fn render_change(change: &Change) -> String {
    match change {
        Change::BetPlaced(bet) => format!("Bet placed: {bet}"),
        Change::ResultReceived { result, outcome } => {
            let verdict = match outcome {
                Some(outcome) => outcome.message.clone(),
                None => "No bet was placed".to_string(),
            };
            format!(
                "Winning Number: {}, Color: {}\n{verdict}",
                result.number, result.color
            )
        }
        Change::MessageDropped { reason, .. } => format!("Dropped malformed result: {reason}"),
        Change::ConnectionChanged(true) => "Table online".to_string(),
        Change::ConnectionChanged(false) => "Table offline".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roulette_client::mocks::MockPublisher;
    use roulette_types::{SpinResult, RESULT_TOPIC};

    #[test]
    fn test_handle_line_commands() {
        assert_eq!(handle_line("bet 17").unwrap(), CommandAction::Bet("17".into()));
        assert_eq!(handle_line("/BET red").unwrap(), CommandAction::Bet("red".into()));
        assert_eq!(handle_line("  status ").unwrap(), CommandAction::Status);
        assert_eq!(handle_line("history").unwrap(), CommandAction::History);
        assert_eq!(handle_line("reconnect").unwrap(), CommandAction::Reconnect);
        assert_eq!(handle_line("exit").unwrap(), CommandAction::Quit);
        assert_eq!(handle_line("").unwrap(), CommandAction::Local(String::new()));
    }

    #[test]
    fn test_handle_line_rejects_bad_input() {
        assert!(handle_line("bet").is_err());
        assert!(handle_line("bet 1 2").is_err());
        assert!(handle_line("spin").is_err());
    }

    #[test]
    fn test_help_lists_every_command() {
        let help = render_help();
        for c in COMMANDS {
            assert!(help.contains(c.usage), "missing {}", c.name);
        }
    }

    #[test]
    fn test_status_and_history_rendering() {
        let mut controller = GameController::new(MockPublisher::connected());
        assert!(render_status(&controller).contains("Current Bet: none"));

        controller.place_bet("17").unwrap();
        controller.place_bet("17").unwrap();
        controller
            .on_result_payload(RESULT_TOPIC, br#"{"number":17,"color":"black"}"#)
            .unwrap();

        let status = render_status(&controller);
        assert!(status.contains("Connection: Connected"));
        assert!(status.contains("Current Bet: Number: 17, Color: black"));
        assert!(status.contains("Winning Number: 17, Color: black"));
        assert!(status.ends_with("Winner Winner Chicken Dinner! Winning Color: black"));

        let history = render_history(&controller);
        assert!(history.contains("  17 - black"));
        assert!(history.contains("  Number: 17, Color: black"));
        assert!(history.ends_with("Tally: 17x2"));
    }

    #[test]
    fn test_render_change_without_bet() {
        let change = Change::ResultReceived {
            result: SpinResult::new(0, "green"),
            outcome: None,
        };
        assert_eq!(
            render_change(&change),
            "Winning Number: 0, Color: green\nNo bet was placed"
        );
    }
}
