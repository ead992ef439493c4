// chat.rs — Line-oriented terminal conversation over any async reader/writer

use crate::service::{AgentService, Health};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELP: &str = "\
Ask anything, for example:
  • What's the weather in Nairobi this week?
  • Latest news about maize prices
  • Which crops suit loamy soil in Kisumu?
  • Generate a PyQGIS script for satellite NDVI processing

Commands:
  help        show this message
  clear, cls  clear the screen
  exit, quit  leave
";

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Help,
    Clear,
    Exit,
    Blank,
    Query(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => Command::Blank,
            "help" => Command::Help,
            "clear" | "cls" => Command::Clear,
            "exit" | "quit" => Command::Exit,
            _ => Command::Query(trimmed),
        }
    }
}

fn banner(service: &AgentService) -> String {
    let status = match (service.health(), service.current_provider()) {
        (Health::Healthy, Some(provider)) => format!("AI: {}", provider),
        _ => "AI: unavailable (no provider keys configured)".to_string(),
    };
    format!(
        "Regional Agent v{}\n{}\nType 'help' for examples, 'exit' to quit.\n",
        env!("CARGO_PKG_VERSION"),
        status
    )
}

/// Read queries line by line until `exit` or end of input. Query failures
/// are printed and the session continues.
pub async fn run<R, W>(service: &AgentService, input: R, mut output: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    output.write_all(banner(service).as_bytes()).await?;
    let mut lines = input.lines();

    loop {
        output.write_all(b"\nYou: ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            output.write_all(b"\nGoodbye!\n").await?;
            break;
        };

        match Command::parse(&line) {
            Command::Blank => continue,
            Command::Help => output.write_all(HELP.as_bytes()).await?,
            Command::Clear => output.write_all(CLEAR_SCREEN.as_bytes()).await?,
            Command::Exit => {
                output.write_all(b"Goodbye!\n").await?;
                break;
            }
            Command::Query(query) => {
                let reply = match service.process_query(query).await {
                    Ok(answer) => format!("\nAgent: {}\n", answer),
                    Err(e) => {
                        tracing::error!("Query failed: {}", e);
                        format!("\nError: {}\n", e)
                    }
                };
                output.write_all(reply.as_bytes()).await?;
            }
        }
    }

    output.flush().await
}
