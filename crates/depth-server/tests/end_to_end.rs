// crates/depth-server/tests/end_to_end.rs
use std::time::Duration;

use depth_core::{FeedEvent, MaxLevel, PriceLevel, Side, ViewResponse};
use depth_protocol::encode_event_framed;
use depth_protocol::wire_types::MAX_LINE_LEN;
use depth_server::config::Config;
use depth_server::server;
use rust_decimal::Decimal;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

fn d(v: i64) -> Decimal {
    Decimal::from(v)
}

async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    let config = Config {
        bind_addr: "127.0.0.1".to_string(),
        port: 0,
        max_clients: 8,
        feed_queue_capacity: 64,
    };
    tokio::spawn(server::serve(listener, config));
    addr
}

struct QueryConn {
    lines: Lines<BufReader<OwnedReadHalf>>,
    write: OwnedWriteHalf,
}

impl QueryConn {
    async fn connect(addr: &str) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (read, write) = stream.into_split();
        QueryConn {
            lines: BufReader::new(read).lines(),
            write,
        }
    }

    async fn send(&mut self, line: &str) {
        self.write
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("write");
    }

    async fn ask(&mut self, query: &str) -> ViewResponse {
        self.send(query).await;
        let line = timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("answer in time")
            .expect("read")
            .expect("connection open");
        serde_json::from_str(&line).expect("valid json response")
    }

    /// Poll until the writer task has applied `version` events.
    async fn wait_for_version(&mut self, version: u64) -> ViewResponse {
        for _ in 0..100 {
            let response = self.ask("Q, E").await;
            if let ViewResponse::Extrema { version: v, .. } = &response {
                if *v >= version {
                    return response;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("engine never reached version {}", version);
    }
}

#[tokio::test]
async fn csv_feed_and_queries() {
    let addr = start_server().await;
    let mut conn = QueryConn::connect(&addr).await;

    conn.send("S, B:100:50, A:101:30, A:102:20").await;
    conn.send("this is not a feed line").await;
    conn.send("L, 100, B, 0").await;
    conn.send("L, 101, A, 80").await;

    match conn.wait_for_version(3).await {
        ViewResponse::Extrema { extrema, .. } => {
            assert_eq!(extrema.max_level, Some(MaxLevel { price: d(101), volume: d(80) }));
            assert_eq!(extrema.min_price_seen, Some(d(101)));
            assert_eq!(extrema.best_bid, None);
        }
        other => panic!("unexpected response: {:?}", other),
    }

    match conn.ask("Q, C, A").await {
        ViewResponse::Cumulative { side, curve, .. } => {
            assert_eq!(side, Side::Ask);
            assert_eq!(curve, vec![(d(101), d(80)), (d(102), d(100))]);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn binary_feed_with_csv_reader() {
    let addr = start_server().await;

    let mut feed = TcpStream::connect(&addr).await.expect("connect feed");
    let events = vec![
        FeedEvent::init_snapshot(vec![
            PriceLevel::from_ints(99, Side::Bid, 10),
            PriceLevel::from_ints(100, Side::Bid, 20),
            PriceLevel::from_ints(101, Side::Ask, 5),
        ]),
        FeedEvent::level_changed(d(98), Side::Bid, d(7)),
        FeedEvent::best_price_changed(Side::Ask, d(101)),
    ];
    let mut frames = Vec::new();
    for event in &events {
        encode_event_framed(event, &mut frames).expect("encode");
    }
    feed.write_all(&frames).await.expect("write frames");

    let mut reader = QueryConn::connect(&addr).await;
    reader.wait_for_version(3).await;

    match reader.ask("Q, V").await {
        ViewResponse::Full { view } => {
            assert_eq!(view.version, 3);
            assert_eq!(view.bids.len(), 3);
            assert_eq!(
                view.cumulative_bids,
                vec![(d(98), d(37)), (d(99), d(30)), (d(100), d(20))]
            );
            assert_eq!(view.extrema.best_ask, Some(d(101)));
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn overlong_csv_line_closes_connection() {
    let addr = start_server().await;

    let mut flood = TcpStream::connect(&addr).await.expect("connect flood");
    // The server may hang up mid-write.
    let _ = flood.write_all(&vec![b'x'; MAX_LINE_LEN + 1024]).await;

    let mut buf = [0u8; 64];
    let closed = timeout(Duration::from_secs(5), async {
        loop {
            match flood.read(&mut buf).await {
                Ok(0) | Err(_) => return true,
                Ok(_) => {}
            }
        }
    })
    .await
    .unwrap_or(false);
    assert!(closed, "server kept an overlong line open");

    // Other clients are unaffected.
    let mut conn = QueryConn::connect(&addr).await;
    conn.send("S, B:100:5").await;
    conn.wait_for_version(1).await;
}
