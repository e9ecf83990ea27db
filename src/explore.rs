use crate::{day_end_millis, day_start_millis};
use anyhow::Result;
use chrono::NaiveDate;
use insights_analytics::{Choice, ConversationStore, ReportGenerator};
use insights_core::config::AppConfig;
use insights_core::error::InsightsError;
use insights_core::event_bus::StoreEventType;
use insights_core::source::source_from_config;
use insights_core::types::{CallStatus, CallType};
use rustyline::error::ReadlineError;
use rustyline::{Config as RlConfig, DefaultEditor};

const BANNER: &str = r#"
  call-insights explorer

  Commands:
    /from <YYYY-MM-DD>     Set the first day to include
    /to <YYYY-MM-DD>       Set the last day to include
    /alltime               Cover every loaded call
    /agent [id]            Filter by agent (no id clears)
    /type <all|inbound|outbound>
    /status <all|success|busy|transfer|no_answer|dropped>
    /caller [text]         Caller contains text (no text clears)
    /callee [text]         Callee contains text (no text clears)
    /duration <min> <max>  Duration bounds in seconds
    /cost <min> <max>      Cost bounds
    /reset                 Restore default filters
    /reload                Fetch the data again
    /show                  Print the dashboard
    /recent [n]            Print the n most recent calls
    /agents                List agents
    /filters               Show active filters
    /json                  Print the metrics snapshot as JSON
    /help                  Show this help
    /exit                  Quit
"#;

#[derive(Debug, Clone, PartialEq)]
enum Command {
    From(NaiveDate),
    To(NaiveDate),
    AllTime,
    Agent(String),
    Type(Choice<CallType>),
    Status(Choice<CallStatus>),
    Caller(String),
    Callee(String),
    Duration(f64, f64),
    Cost(f64, f64),
    Reset,
    Reload,
    Show,
    Recent(Option<usize>),
    Agents,
    Filters,
    Json,
    Help,
    Exit,
}

fn invalid(message: impl Into<String>) -> InsightsError {
    InsightsError::InvalidArgument(message.into())
}

fn parse_date(arg: &str) -> Result<NaiveDate, InsightsError> {
    NaiveDate::parse_from_str(arg, "%Y-%m-%d")
        .map_err(|e| invalid(format!("bad date '{}': {}", arg, e)))
}

fn parse_bounds(rest: &str) -> Result<(f64, f64), InsightsError> {
    let mut parts = rest.split_whitespace();
    let (Some(min), Some(max), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid("expected <min> <max>"));
    };
    let min: f64 = min
        .parse()
        .map_err(|_| invalid(format!("bad number '{}'", min)))?;
    let max: f64 = max
        .parse()
        .map_err(|_| invalid(format!("bad number '{}'", max)))?;
    Ok((min, max))
}

fn parse_command(input: &str) -> Result<Command, InsightsError> {
    let (name, rest) = match input.split_once(' ') {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };

    let command = match name {
        "/from" => Command::From(parse_date(rest)?),
        "/to" => Command::To(parse_date(rest)?),
        "/alltime" => Command::AllTime,
        "/agent" => Command::Agent(rest.to_string()),
        "/type" => Command::Type(rest.parse()?),
        "/status" => Command::Status(rest.parse()?),
        "/caller" => Command::Caller(rest.to_string()),
        "/callee" => Command::Callee(rest.to_string()),
        "/duration" => {
            let (min, max) = parse_bounds(rest)?;
            Command::Duration(min, max)
        }
        "/cost" => {
            let (min, max) = parse_bounds(rest)?;
            Command::Cost(min, max)
        }
        "/reset" => Command::Reset,
        "/reload" => Command::Reload,
        "/show" => Command::Show,
        "/recent" if rest.is_empty() => Command::Recent(None),
        "/recent" => Command::Recent(Some(
            rest.parse()
                .map_err(|_| invalid(format!("bad count '{}'", rest)))?,
        )),
        "/agents" => Command::Agents,
        "/filters" => Command::Filters,
        "/json" => Command::Json,
        "/help" => Command::Help,
        "/exit" | "/quit" => Command::Exit,
        other => return Err(invalid(format!("unknown command '{}', try /help", other))),
    };
    Ok(command)
}

/// Apply a filter mutation. Returns false for commands that are not mutations.
fn apply_filter(store: &mut ConversationStore, command: &Command) -> bool {
    match command {
        Command::From(date) => store.set_date_start(day_start_millis(*date)),
        Command::To(date) => store.set_date_end(day_end_millis(*date)),
        Command::AllTime => match store.date_range() {
            Some(bounds) => store.set_date_range(bounds.min, bounds.max),
            None => println!("No data loaded"),
        },
        Command::Agent(agent) => store.set_agent(agent.clone()),
        Command::Type(call_type) => store.set_call_type(*call_type),
        Command::Status(status) => store.set_status(*status),
        Command::Caller(caller) => store.set_caller(caller.clone()),
        Command::Callee(callee) => store.set_callee(callee.clone()),
        Command::Duration(min, max) => store.set_duration_range(*min, *max),
        Command::Cost(min, max) => store.set_cost_range(*min, *max),
        Command::Reset => store.reset_filters(),
        _ => return false,
    }
    true
}

/// Run the interactive explorer over an already loaded store.
pub async fn run(config: AppConfig, mut store: ConversationStore) -> Result<()> {
    println!("{}", BANNER);
    let source = source_from_config(&config.source)?;
    println!("  Source: {}", source.describe());
    println!();

    let mut changes = store.event_bus().map(|bus| {
        bus.subscribe_filtered([
            StoreEventType::FiltersChanged,
            StoreEventType::FiltersReset,
            StoreEventType::RecordsLoaded,
        ])
    });

    println!("{}\n", ReportGenerator::text_summary(&store));

    // Set up rustyline.
    let rl_config = RlConfig::builder().auto_add_history(true).build();
    let history_path = AppConfig::data_dir().join("explore_history.txt");
    let mut rl = DefaultEditor::with_config(rl_config)?;
    let _ = rl.load_history(&history_path);

    loop {
        let prompt = if store.is_loading() {
            "\x1b[1;33mloading\x1b[0m \x1b[1;32m❯\x1b[0m ".to_string()
        } else {
            format!("\x1b[1;36m{} calls\x1b[0m \x1b[1;32m❯\x1b[0m ", store.total_calls())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                let command = match parse_command(input) {
                    Ok(command) => command,
                    Err(e) => {
                        println!("\x1b[1;31m{}\x1b[0m", e);
                        continue;
                    }
                };

                if !apply_filter(&mut store, &command) {
                    match command {
                        Command::Reload => {
                            store.load(&*source).await;
                        }
                        Command::Show => print!(
                            "{}",
                            ReportGenerator::dashboard(&store, config.dashboard.recent_calls)
                        ),
                        Command::Recent(limit) => print!(
                            "{}",
                            ReportGenerator::recent_calls_table(
                                &store,
                                limit.unwrap_or(config.dashboard.recent_calls)
                            )
                        ),
                        Command::Agents => {
                            for agent in store.sorted_agents() {
                                println!("  {}", agent);
                            }
                        }
                        Command::Filters => {
                            println!("{}", ReportGenerator::filter_summary(store.filters()))
                        }
                        Command::Json => {
                            println!("{}", serde_json::to_string_pretty(&store.snapshot())?)
                        }
                        Command::Help => println!("{}", BANNER),
                        Command::Exit => break,
                        _ => {}
                    }
                }

                // Re-read the store whenever it reports a change.
                if let Some(changes) = changes.as_mut() {
                    let mut changed = false;
                    while changes.try_recv().is_some() {
                        changed = true;
                    }
                    if changed {
                        println!("{}", ReportGenerator::text_summary(&store));
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                tracing::error!("Readline error: {}", e);
                break;
            }
        }
    }

    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use insights_core::types::{CallInfo, ConversationRecord};

    fn sample_record(id: &str, agent: &str) -> ConversationRecord {
        ConversationRecord {
            id: id.into(),
            agent: agent.into(),
            start_time: chrono::Utc::now().timestamp_millis() - 60 * 60 * 1000,
            duration: 42.0,
            cost: 0.3,
            status: CallStatus::Success,
            call_info: CallInfo {
                caller: "555-0100".into(),
                callee: "555-0199".into(),
                call_type: CallType::Inbound,
                stats: None,
            },
        }
    }

    #[test]
    fn test_parse_filter_commands() {
        assert_eq!(
            parse_command("/from 2024-05-01").unwrap(),
            Command::From(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
        );
        assert_eq!(
            parse_command("/status no_answer").unwrap(),
            Command::Status(Choice::Only(CallStatus::NoAnswer))
        );
        assert_eq!(
            parse_command("/type all").unwrap(),
            Command::Type(Choice::All)
        );
        assert_eq!(
            parse_command("/cost 0.5 10").unwrap(),
            Command::Cost(0.5, 10.0)
        );
        assert_eq!(parse_command("/agent").unwrap(), Command::Agent(String::new()));
        assert_eq!(parse_command("/agent all").unwrap(), Command::Agent("all".into()));
        assert_eq!(
            parse_command("/caller 555 01").unwrap(),
            Command::Caller("555 01".into())
        );
        assert_eq!(parse_command("/recent").unwrap(), Command::Recent(None));
        assert_eq!(parse_command("/recent 10").unwrap(), Command::Recent(Some(10)));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("/status lost").is_err());
        assert!(parse_command("/from yesterday").is_err());
        assert!(parse_command("/duration 10").is_err());
        assert!(parse_command("/duration 1 2 3").is_err());
        assert!(parse_command("/cost cheap 5").is_err());
        assert!(parse_command("/recent many").is_err());
        assert!(parse_command("/teleport").is_err());
    }

    #[test]
    fn test_apply_filter_mutates_store() {
        let mut store = ConversationStore::default();

        assert!(apply_filter(&mut store, &Command::Agent("agent_5".into())));
        assert_eq!(store.filters().agent, "agent_5");

        assert!(apply_filter(&mut store, &Command::Duration(10.0, 20.0)));
        assert_eq!(store.filters().duration_range.max, 20.0);

        assert!(apply_filter(&mut store, &Command::Reset));
        assert!(store.filters().agent.is_empty());
        assert_eq!(store.filters().duration_range.max, 3600.0);

        assert!(!apply_filter(&mut store, &Command::Show));
    }

    #[test]
    fn test_agent_named_all_is_selectable() {
        let mut store = ConversationStore::default();
        let ticket = store.begin_load();
        let records = vec![sample_record("c1", "all"), sample_record("c2", "agent_1")];
        store.finish_load(ticket, Ok(records));

        let command = parse_command("/agent all").unwrap();
        assert!(apply_filter(&mut store, &command));
        assert_eq!(store.filters().agent, "all");
        assert_eq!(store.total_calls(), 1);

        assert!(apply_filter(&mut store, &parse_command("/agent").unwrap()));
        assert!(store.filters().agent.is_empty());
        assert_eq!(store.total_calls(), 2);
    }

    #[test]
    fn test_invalid_status_leaves_filter_unchanged() {
        let mut store = ConversationStore::default();
        store.set_status(Choice::Only(CallStatus::Busy));

        if let Ok(command) = parse_command("/status lost") {
            apply_filter(&mut store, &command);
        }
        assert_eq!(store.filters().status, Choice::Only(CallStatus::Busy));
    }
}
