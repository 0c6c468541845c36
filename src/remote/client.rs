use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;

use super::protocol::{self, amount_value, Inbound, Outbound};
use super::worker::BetDispatcher;
use crate::utils::error::{BetclickError, BetclickResult};

#[derive(Clone, Debug)]
pub struct ControllerSettings {
    pub http_url: String,
    pub ws_url: String,
    pub username: String,
    pub password: String,
    pub reconnect_delay: Duration,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize, Debug)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    token: Option<String>,
    #[serde(default)]
    message: String,
}

/// Exchanges credentials for a session token.
pub async fn login(http: &reqwest::Client, settings: &ControllerSettings) -> BetclickResult<String> {
    let url = format!("{}/api/login", settings.http_url.trim_end_matches('/'));
    log::info!("logging in to {url} as {}", settings.username);
    let response: LoginResponse = http
        .post(&url)
        .json(&LoginRequest {
            username: &settings.username,
            password: &settings.password,
        })
        .send()
        .await?
        .json()
        .await?;

    match response.token {
        Some(token) if response.success => Ok(token),
        _ => Err(BetclickError::LoginRejected(response.message)),
    }
}

/// What the session loop should do after one inbound message.
#[derive(Debug, PartialEq)]
pub enum Step {
    Reply(Vec<Outbound>),
    Close,
}

/// Controller-side state that survives reconnects.
#[derive(Default)]
pub struct Session {
    pub pc: Option<String>,
}

impl Session {
    pub async fn handle(&mut self, message: Inbound, dispatcher: &dyn BetDispatcher) -> BetclickResult<Step> {
        let replies = match message {
            Inbound::Ping => vec![Outbound::Pong],
            Inbound::Assignment { pc: Some(pc) } => {
                log::info!("assigned pc {pc}");
                self.pc = Some(pc.clone());
                vec![Outbound::Register { pc }]
            }
            Inbound::Assignment { pc: None } => {
                log::warn!("assignment without pc ignored");
                Vec::new()
            }
            Inbound::Error { message } => {
                log::error!("controller error: {message}");
                return Ok(Step::Close);
            }
            Inbound::PlaceBet {
                amount,
                side,
                platform,
            } => {
                log::info!("placeBet {amount} on {side} ({platform})");
                let result = dispatcher.place_bet(amount_value(&amount), side.clone()).await?;
                vec![Outbound::placed(&result, &platform, &amount, &side)]
            }
            Inbound::CancelBet => {
                log::info!("cancelBet");
                let result = dispatcher.cancel_bet().await?;
                if let Ok(cancelled) = &result {
                    log::info!("bet cancelled after {} clicks", cancelled.clicks);
                }
                Outbound::cancelled(&result).into_iter().collect()
            }
            Inbound::Unknown => {
                log::debug!("ignoring unknown controller message");
                Vec::new()
            }
        };
        Ok(Step::Reply(replies))
    }

    fn encode(&self, message: &Outbound) -> BetclickResult<Message> {
        let text = protocol::encode(message, self.pc.as_deref(), chrono::Utc::now())?;
        Ok(Message::Text(text))
    }
}

/// Serves one websocket connection until it closes or fails.
async fn serve(
    settings: &ControllerSettings,
    token: &str,
    session: &mut Session,
    dispatcher: &dyn BetDispatcher,
) -> BetclickResult<()> {
    let (stream, _) = tokio_tungstenite::connect_async(settings.ws_url.as_str()).await?;
    log::info!("connected to {}", settings.ws_url);
    let (mut sink, mut stream) = stream.split();

    sink.send(session.encode(&Outbound::Hello {
        token: token.to_string(),
    })?)
    .await?;
    sink.send(session.encode(&Outbound::RequestAssignment)?).await?;

    'sesh: while let Some(frame) = stream.next().await {
        let text = match frame? {
            Message::Text(text) => text,
            Message::Ping(data) => {
                sink.send(Message::Pong(data)).await?;
                continue 'sesh;
            }
            Message::Close(_) => break 'sesh,
            _ => continue 'sesh,
        };
        let message = match protocol::decode(&text) {
            Ok(message) => message,
            Err(e) => {
                log::warn!("unreadable controller message: {e}");
                continue 'sesh;
            }
        };
        match session.handle(message, dispatcher).await? {
            Step::Reply(replies) => {
                for reply in &replies {
                    sink.send(session.encode(reply)?).await?;
                }
            }
            Step::Close => break 'sesh,
        }
    }
    log::warn!("controller connection closed");
    Ok(())
}

/// Logs in and keeps a controller session alive until Ctrl-C.
pub async fn run(settings: ControllerSettings, dispatcher: &dyn BetDispatcher) -> BetclickResult<()> {
    let http = reqwest::Client::new();
    let token = login(&http, &settings).await?;
    let mut session = Session::default();

    loop {
        tokio::select! {
            result = serve(&settings, &token, &mut session, dispatcher) => {
                if let Err(e) = result {
                    log::error!("controller session failed: {e}");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                return Ok(());
            }
        }
        log::info!("reconnecting in {:?}", settings.reconnect_delay);
        tokio::select! {
            _ = tokio::time::sleep(settings.reconnect_delay) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::{Cancelled, Placed};
    use crate::core::reason::Reason;
    use crate::core::resolver::Side;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockDispatcher {
        calls: Mutex<Vec<String>>,
        place: Result<(), Reason>,
        cancel: Result<(), Reason>,
    }

    impl MockDispatcher {
        fn new(place: Result<(), Reason>, cancel: Result<(), Reason>) -> Self {
            MockDispatcher {
                calls: Mutex::new(Vec::new()),
                place,
                cancel,
            }
        }
    }

    #[async_trait::async_trait]
    impl BetDispatcher for MockDispatcher {
        async fn place_bet(&self, amount: i64, side: String) -> BetclickResult<Result<Placed, Reason>> {
            self.calls.lock().unwrap().push(format!("place {amount} {side}"));
            Ok(self.place.clone().map(|()| Placed {
                amount: amount as u64,
                side: Side::parse(&side).unwrap_or(Side::Player),
                composition: vec![amount as u64],
                clicks: 2,
            }))
        }

        async fn cancel_bet(&self) -> BetclickResult<Result<Cancelled, Reason>> {
            self.calls.lock().unwrap().push("cancel".to_string());
            Ok(self.cancel.clone().map(|()| Cancelled { clicks: 3 }))
        }
    }

    #[tokio::test]
    async fn test_ping_and_assignment() {
        let dispatcher = MockDispatcher::new(Ok(()), Ok(()));
        let mut session = Session::default();

        assert_eq!(
            session.handle(Inbound::Ping, &dispatcher).await.unwrap(),
            Step::Reply(vec![Outbound::Pong])
        );
        let step = session
            .handle(Inbound::Assignment { pc: Some("PC-2".into()) }, &dispatcher)
            .await
            .unwrap();
        assert_eq!(step, Step::Reply(vec![Outbound::Register { pc: "PC-2".into() }]));
        assert_eq!(session.pc.as_deref(), Some("PC-2"));
        assert!(dispatcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_bet_success_echoes_request() {
        let dispatcher = MockDispatcher::new(Ok(()), Ok(()));
        let mut session = Session::default();
        let message = Inbound::PlaceBet {
            amount: json!("1250000"),
            side: "Banker".into(),
            platform: "Pragmatic".into(),
        };

        let step = session.handle(message, &dispatcher).await.unwrap();
        assert_eq!(
            step,
            Step::Reply(vec![Outbound::BetSuccess {
                platform: "Pragmatic".into(),
                amount: json!("1250000"),
                side: "Banker".into(),
            }])
        );
        assert_eq!(*dispatcher.calls.lock().unwrap(), vec!["place 1250000 Banker"]);
    }

    #[tokio::test]
    async fn test_place_bet_failure_carries_reason() {
        let dispatcher = MockDispatcher::new(Err(Reason::NotBettingTime), Ok(()));
        let mut session = Session::default();
        let message = Inbound::PlaceBet {
            amount: json!(100),
            side: "Player".into(),
            platform: "Evolution".into(),
        };

        let Step::Reply(replies) = session.handle(message, &dispatcher).await.unwrap() else {
            panic!("expected a reply");
        };
        assert_eq!(
            replies,
            vec![Outbound::BetError {
                message: Reason::NotBettingTime.message().to_string(),
                error_type: "not_betting_time".into(),
                platform: Some("Evolution".into()),
                amount: Some(json!(100)),
                side: Some("Player".into()),
            }]
        );
    }

    #[tokio::test]
    async fn test_cancel_replies_only_on_error() {
        let ok = MockDispatcher::new(Ok(()), Ok(()));
        let mut session = Session::default();
        assert_eq!(
            session.handle(Inbound::CancelBet, &ok).await.unwrap(),
            Step::Reply(vec![])
        );

        let failing = MockDispatcher::new(Ok(()), Err(Reason::CancelButtonNotConfigured));
        let Step::Reply(replies) = session.handle(Inbound::CancelBet, &failing).await.unwrap() else {
            panic!("expected a reply");
        };
        assert!(matches!(
            &replies[..],
            [Outbound::BetError { error_type, .. }] if error_type == "cancel_button_not_configured"
        ));
    }

    #[tokio::test]
    async fn test_error_closes_and_unknown_is_ignored() {
        let dispatcher = MockDispatcher::new(Ok(()), Ok(()));
        let mut session = Session::default();
        assert_eq!(
            session.handle(Inbound::Unknown, &dispatcher).await.unwrap(),
            Step::Reply(vec![])
        );
        assert_eq!(
            session
                .handle(Inbound::Error { message: "kicked".into() }, &dispatcher)
                .await
                .unwrap(),
            Step::Close
        );
    }

    #[test]
    fn test_encoded_frames_carry_pc() {
        let session = Session {
            pc: Some("PC-9".into()),
        };
        let Message::Text(text) = session.encode(&Outbound::Pong).unwrap() else {
            panic!("expected text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "pong");
        assert_eq!(value["pc"], "PC-9");
    }
}
