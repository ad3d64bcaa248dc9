//! Interactive client: feed events go out as binary frames on one
//! connection, queries go out as CSV on a second one and the JSON answers
//! are printed.

use std::env;
use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use depth_protocol::csv_codec::{format_query, parse_feed_line, FeedLine};
use depth_protocol::encode_event_framed;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<()> {
    // Where to connect: env override or default.
    let addr = env::var("DEPTH_CLIENT_ADDR").unwrap_or_else(|_| "127.0.0.1:9100".to_string());

    println!("Connecting to {}...", addr);
    let mut feed = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("connect feed to {}", addr))?;
    let query = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("connect query to {}", addr))?;
    let (query_read, mut query_write) = query.into_split();
    let mut answers = BufReader::new(query_read).lines();
    println!("Connected.");
    println!("Type CSV lines like:");
    println!("  S, B:100:50, A:101:30, A:102:20");
    println!("  L, 101, A, 80");
    println!("  P, B, 100");
    println!("  R");
    println!("  Q, E | Q, B, A | Q, C, B | Q, V");
    println!("Type 'quit' or 'exit' to leave.\n");

    let stdin = io::stdin();

    loop {
        print!(">> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            println!("\nEOF on stdin, exiting client.");
            break;
        }

        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
            println!("Exiting client.");
            break;
        }

        match parse_feed_line(trimmed) {
            Ok(None) => {}
            Ok(Some(FeedLine::Event(event))) => {
                let mut frame = Vec::with_capacity(64);
                encode_event_framed(&event, &mut frame)?;
                feed.write_all(&frame).await?;
            }
            Ok(Some(FeedLine::Query(q))) => {
                query_write
                    .write_all(format!("{}\n", format_query(&q)).as_bytes())
                    .await?;
                match timeout(Duration::from_secs(1), answers.next_line()).await {
                    Ok(Ok(Some(answer))) => println!("<< {}", answer),
                    Ok(Ok(None)) => {
                        println!("Server closed the query connection.");
                        break;
                    }
                    Ok(Err(e)) => return Err(e).context("read answer"),
                    Err(_) => eprintln!("Timed out waiting for an answer."),
                }
            }
            Err(e) => eprintln!("Could not parse line: {}", e),
        }
    }

    Ok(())
}
