use std::io::{BufRead, BufReader};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use market_client::{ClientConfig, ConnectionState, MarketDataRequester};
use market_common::codec::write_frame;
use market_common::{ErrorKind, Frame, MarketData, MarketDataRequest, MarketError};
use market_server::{MarketDataRepository, MarketDataServer, ServerConfig};
use serde_json::json;

fn start_server() -> (u16, Arc<MarketDataRepository>) {
    let repository = Arc::new(MarketDataRepository::new());
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        ..ServerConfig::default()
    };
    let server = MarketDataServer::bind(config, Arc::clone(&repository)).unwrap();
    let port = server.local_addr().unwrap().port();
    thread::spawn(move || server.run());
    (port, repository)
}

fn config(port: u16) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".into(),
        port,
        reconnect_attempts: 2,
        reconnect_delay: Duration::from_millis(50),
        request_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    }
}

fn wait_for(check: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

fn unused_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[test]
fn collected_record_is_returned_as_current() {
    let (port, _) = start_server();
    let requester = MarketDataRequester::new(config(port));

    assert_eq!(requester.current_market_data("AAPL").unwrap(), None);
    requester
        .collect_market_data(&MarketData::new("AAPL", 150))
        .unwrap();
    assert_eq!(
        requester.current_market_data("AAPL").unwrap(),
        Some(MarketData::new("AAPL", 150))
    );
    assert_eq!(
        requester.connection().state().unwrap(),
        ConnectionState::Connected
    );
}

#[test]
fn feed_returns_only_matching_records_in_order() {
    let (port, _) = start_server();
    let requester = MarketDataRequester::new(config(port));
    for (symbol, price) in [("AAPL", 150), ("AAPL", 151), ("MSFT", 300)] {
        requester
            .collect_market_data(&MarketData::new(symbol, price))
            .unwrap();
    }

    let aapl: Vec<MarketData> = requester
        .feed_market_data("AAPL")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        aapl,
        vec![MarketData::new("AAPL", 150), MarketData::new("AAPL", 151)]
    );

    let goog: Vec<MarketData> = requester
        .feed_market_data("GOOG")
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(goog.is_empty());
}

#[test]
fn feed_longer_than_the_window_arrives_complete() {
    let (port, repository) = start_server();
    for price in 0..25 {
        repository.add(MarketData::new("NVDA", price)).unwrap();
    }
    let requester = MarketDataRequester::new(ClientConfig {
        stream_window: 4,
        ..config(port)
    });

    let prices: Vec<i32> = requester
        .feed_market_data("NVDA")
        .unwrap()
        .map(|item| item.unwrap().price)
        .collect();
    assert_eq!(prices, (0..25).collect::<Vec<_>>());
}

#[test]
fn dropping_a_stream_cancels_it_and_keeps_the_connection() {
    let (port, repository) = start_server();
    for price in 0..50 {
        repository.add(MarketData::new("TSLA", price)).unwrap();
    }
    let requester = MarketDataRequester::new(ClientConfig {
        stream_window: 2,
        ..config(port)
    });

    let first_three: Vec<i32> = requester
        .feed_market_data("TSLA")
        .unwrap()
        .take(3)
        .map(|item| item.unwrap().price)
        .collect();
    assert_eq!(first_three, vec![0, 1, 2]);

    assert_eq!(
        requester.current_market_data("TSLA").unwrap(),
        Some(MarketData::new("TSLA", 0))
    );
    assert_eq!(requester.feed_market_data("TSLA").unwrap().count(), 50);
}

#[test]
fn unknown_route_is_an_explicit_error() {
    let (port, _) = start_server();
    let requester = MarketDataRequester::new(config(port));

    let err = requester
        .request_response::<_, MarketData>("deleteMarketData", &MarketDataRequest::new("AAPL"))
        .unwrap_err();
    assert!(matches!(
        err,
        MarketError::Remote {
            kind: ErrorKind::UnknownRoute,
            ..
        }
    ));
}

#[test]
fn malformed_payload_is_an_explicit_error() {
    let (port, _) = start_server();
    let requester = MarketDataRequester::new(config(port));

    let err = requester
        .request_response::<_, MarketData>("currentMarketData", &json!({"ticker": 1}))
        .unwrap_err();
    match err {
        MarketError::Remote { kind, message } => {
            assert_eq!(kind, ErrorKind::InvalidPayload);
            assert!(!message.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
    // The failed call does not poison the connection.
    assert_eq!(requester.current_market_data("AAPL").unwrap(), None);
}

#[test]
fn wrong_mode_fails_the_stream() {
    let (port, _) = start_server();
    let requester = MarketDataRequester::new(config(port));

    let mut stream = requester
        .request_stream::<_, MarketData>("currentMarketData", &MarketDataRequest::new("AAPL"))
        .unwrap();
    assert!(matches!(
        stream.next(),
        Some(Err(MarketError::Remote {
            kind: ErrorKind::ModeMismatch,
            ..
        }))
    ));
    assert!(stream.next().is_none());
}

#[test]
fn mismatched_mime_type_is_rejected_without_retrying() {
    let (port, _) = start_server();
    let requester = MarketDataRequester::new(ClientConfig {
        data_mime_type: "application/cbor".into(),
        ..config(port)
    });

    requester.connect().unwrap();
    assert!(wait_for(|| {
        requester.connection().state().unwrap() == ConnectionState::Failed
    }));
    assert!(matches!(
        requester.current_market_data("AAPL"),
        Err(MarketError::Rejected(_))
    ));
}

#[test]
fn connects_once_server_comes_up_within_retry_window() {
    let port = unused_port();
    let starter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(150));
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port,
            ..ServerConfig::default()
        };
        let server = MarketDataServer::bind(config, Arc::new(MarketDataRepository::new())).unwrap();
        thread::spawn(move || server.run());
    });

    let requester = MarketDataRequester::new(ClientConfig {
        reconnect_attempts: 10,
        reconnect_delay: Duration::from_millis(100),
        ..config(port)
    });
    assert_eq!(requester.current_market_data("AAPL").unwrap(), None);
    starter.join().unwrap();
}

#[test]
fn gives_up_when_server_never_comes_up() {
    let requester = MarketDataRequester::new(config(unused_port()));
    assert!(matches!(
        requester.current_market_data("AAPL"),
        Err(MarketError::ConnectionFailed { attempts: 3, .. })
    ));
    assert_eq!(
        requester.connection().state().unwrap(),
        ConnectionState::Failed
    );
}

#[test]
fn reconnects_after_the_server_drops_the_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let fake = thread::spawn(move || {
        let (first, _) = listener.accept().unwrap();
        let mut line = String::new();
        BufReader::new(&first).read_line(&mut line).unwrap();
        drop(first);

        let (mut second, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(second.try_clone().unwrap());
        line.clear();
        reader.read_line(&mut line).unwrap();
        assert!(matches!(
            serde_json::from_str::<Frame>(&line).unwrap(),
            Frame::Setup { .. }
        ));
        line.clear();
        reader.read_line(&mut line).unwrap();
        let Frame::Request { stream_id, .. } = serde_json::from_str::<Frame>(&line).unwrap() else {
            panic!("expected a request, got {line}");
        };
        write_frame(
            &mut second,
            &Frame::Next {
                stream_id,
                data: json!({"stock": "AAPL", "currentPrice": 7}),
            },
        )
        .unwrap();
        write_frame(&mut second, &Frame::Complete { stream_id }).unwrap();
        thread::sleep(Duration::from_millis(200));
    });

    let requester = MarketDataRequester::new(config(port));
    requester.connect().unwrap();
    assert!(wait_for(|| {
        requester.connection().state().unwrap() == ConnectionState::Disconnected
    }));

    assert_eq!(
        requester.current_market_data("AAPL").unwrap(),
        Some(MarketData::new("AAPL", 7))
    );
    fake.join().unwrap();
}
