use crate::call::{CallContext, CallControl, CallControlError};
use crate::config::ScreenerConfig;
use crate::decision_engine::{CallState, DecisionEngine, NegativeRatings, Outcome};
use crate::normalization::normalize_with_country_code;
use crate::notify::NotificationDispatcher;
use crate::reputation::{LookupResult, ReputationClient};
use crate::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ScreenError {
    #[error(transparent)]
    CallControl(#[from] CallControlError),
}

/// Screens inbound calls: normalize, look up, decide, notify, hang up.
///
/// Holds configuration only, so one instance can serve concurrent calls.
pub struct CallScreener {
    country_code: String,
    reputation: ReputationClient,
    engine: DecisionEngine,
    dispatcher: NotificationDispatcher,
}

impl CallScreener {
    pub fn new(
        country_code: impl Into<String>,
        reputation: ReputationClient,
        engine: DecisionEngine,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            country_code: country_code.into(),
            reputation,
            engine,
            dispatcher,
        }
    }

    pub fn from_config(config: &ScreenerConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.http_timeout_seconds)?);
        Self::with_transport(config, transport)
    }

    pub fn with_transport(
        config: &ScreenerConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> anyhow::Result<Self> {
        let reputation = ReputationClient::new(
            transport.clone(),
            &config.api_base,
            config.bearer_token.clone(),
            config.country_code.clone(),
        )?;
        let engine = DecisionEngine::new(
            config.min_votes,
            NegativeRatings::new(&config.negative_ratings),
        );
        let dispatcher = NotificationDispatcher::from_endpoints(
            transport,
            config.rich_webhook.as_deref(),
            config.compact_webhook.as_deref(),
            &config.webhook_username,
        );

        Ok(Self::new(
            config.country_code.clone(),
            reputation,
            engine,
            dispatcher,
        ))
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Screen one call. Returns `true` only if the call was blocked and
    /// terminated; the platform continues its own routing otherwise.
    pub async fn handle_call(&self, ctx: &CallContext, call: &dyn CallControl) -> bool {
        self.screen_call(ctx, call).await.state.terminates_call()
    }

    /// Screen one call and return the outcome that was acted upon.
    ///
    /// Never fails: internal faults become an `error` outcome and the call
    /// is let through. Panics are not caught; a panicking `CallControl` or
    /// `HttpTransport` implementation unwinds to the caller.
    pub async fn screen_call(&self, ctx: &CallContext, call: &dyn CallControl) -> Outcome {
        match self.run(ctx, call).await {
            Ok(outcome) => outcome,
            Err(e) => {
                call.error(&format!("PhoneBlock exception: {e}"));
                let outcome = Outcome::error();
                self.dispatcher.notify(&outcome).await;
                outcome
            }
        }
    }

    async fn run(&self, ctx: &CallContext, call: &dyn CallControl) -> Result<Outcome, ScreenError> {
        let e164 = normalize_with_country_code(&ctx.caller_id, &self.country_code);
        call.info(&format!(
            "PhoneBlock START cli={} did={} e164={}",
            ctx.caller_id, ctx.called_number, e164
        ));

        let lookup = if ctx.is_inbound && !e164.is_empty() {
            self.reputation.lookup(&e164).await
        } else {
            LookupResult::failed()
        };

        let outcome = self.engine.decide(ctx, &e164, &lookup);
        match outcome.state {
            CallState::NoCalleridOrNotInbound => {
                log::debug!("Skipping lookup (inbound={}, e164='{e164}')", ctx.is_inbound);
            }
            CallState::LookupFailed => {
                call.info(&format!("PhoneBlock LOOKUP_FAIL {e164} body={}", lookup.raw_body));
            }
            CallState::Blocked => {
                call.info(&format!(
                    "PhoneBlock BLOCK {e164} rating={} votes={} -> terminate",
                    outcome.rating, outcome.votes
                ));
            }
            state => {
                call.info(&format!(
                    "PhoneBlock {} {e164} rating={} votes={}",
                    state.as_str().to_uppercase(),
                    outcome.rating,
                    outcome.votes
                ));
            }
        }

        // Notifications complete before the hangup
        self.dispatcher.notify(&outcome).await;

        if outcome.state.terminates_call() {
            call.terminate()?;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::testing::RecordingCall;
    use crate::transport::testing::{FakeTransport, Scripted};
    use serde_json::Value;

    const PLAIN_URL: &str = "https://api.test/api/num/49891234567?format=json";
    const NATIONAL_URL: &str = "https://api.test/api/num/0891234567?format=json";
    const COMPACT: &str = "https://hooks.test/phoneblock";
    const RICH: &str = "https://chat.test/webhook";

    fn config() -> ScreenerConfig {
        ScreenerConfig {
            api_base: "https://api.test/api".to_string(),
            bearer_token: "token".to_string(),
            rich_webhook: Some(RICH.to_string()),
            compact_webhook: Some(COMPACT.to_string()),
            ..ScreenerConfig::default()
        }
    }

    fn screener(transport: Arc<FakeTransport>) -> CallScreener {
        CallScreener::with_transport(&config(), transport).unwrap()
    }

    fn compact_states(transport: &FakeTransport) -> Vec<String> {
        transport
            .requests_to(COMPACT)
            .iter()
            .map(|r| {
                let body: Value = serde_json::from_str(r.body.as_deref().unwrap()).unwrap();
                body["state"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn test_built_from_config() {
        let screener = screener(Arc::new(FakeTransport::new()));
        assert_eq!(screener.engine().min_votes(), 4);
        assert!(screener.engine().negative_ratings().contains("g_fraud"));
        assert_eq!(
            screener.dispatcher().channel_names(),
            vec!["rich webhook", "generic webhook"]
        );

        let quiet = ScreenerConfig {
            rich_webhook: None,
            compact_webhook: None,
            negative_ratings: Vec::new(),
            ..config()
        };
        let screener = CallScreener::with_transport(&quiet, Arc::new(FakeTransport::new())).unwrap();
        assert!(screener.dispatcher().channel_names().is_empty());
        assert!(screener.engine().negative_ratings().is_empty());
    }

    #[tokio::test]
    async fn test_blocks_reported_number() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(PLAIN_URL, Scripted::Reply(200, r#"{"votes":12,"rating":"G_FRAUD"}"#));
        let call = RecordingCall::default();

        let handled = screener(transport.clone())
            .handle_call(&CallContext::inbound("089 1234567", "200"), &call)
            .await;

        assert!(handled);
        assert_eq!(call.termination_count(), 1);
        assert_eq!(compact_states(&transport), vec!["blocked"]);
        assert_eq!(transport.requests_to(RICH).len(), 1);
        assert!(call.info_lines()[0].starts_with("PhoneBlock START"));
        assert!(call
            .info_lines()
            .iter()
            .any(|l| l.starts_with("PhoneBlock BLOCK +49891234567")));
    }

    #[tokio::test]
    async fn test_fails_open_when_service_unreachable() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(PLAIN_URL, Scripted::Timeout);
        transport.script(NATIONAL_URL, Scripted::Refused);
        let call = RecordingCall::default();

        let outcome = screener(transport.clone())
            .screen_call(&CallContext::inbound("0891234567", "200"), &call)
            .await;

        assert_eq!(outcome.state, CallState::LookupFailed);
        assert_eq!(call.termination_count(), 0);
        assert_eq!(compact_states(&transport), vec!["lookup_failed"]);
    }

    #[tokio::test]
    async fn test_fails_open_on_error_statuses() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(PLAIN_URL, Scripted::Reply(401, "unauthorized"));
        transport.script(NATIONAL_URL, Scripted::Reply(500, "boom"));
        let call = RecordingCall::default();

        let handled = screener(transport.clone())
            .handle_call(&CallContext::inbound("0891234567", "200"), &call)
            .await;

        assert!(!handled);
        assert_eq!(call.termination_count(), 0);
    }

    #[tokio::test]
    async fn test_outbound_call_skips_lookup() {
        let transport = Arc::new(FakeTransport::new());
        let call = RecordingCall::default();
        let ctx = CallContext {
            caller_id: "0891234567".to_string(),
            called_number: "200".to_string(),
            is_inbound: false,
        };

        let outcome = screener(transport.clone()).screen_call(&ctx, &call).await;

        assert_eq!(outcome.state, CallState::NoCalleridOrNotInbound);
        assert!(transport.requests().iter().all(|r| r.method == "POST"));
        assert_eq!(compact_states(&transport), vec!["no_callerid_or_not_inbound"]);
    }

    #[tokio::test]
    async fn test_anonymous_caller() {
        let transport = Arc::new(FakeTransport::new());
        let call = RecordingCall::default();

        let outcome = screener(transport.clone())
            .screen_call(&CallContext::inbound("anonymous", "200"), &call)
            .await;

        assert_eq!(outcome.state, CallState::NoCalleridOrNotInbound);
        assert_eq!(outcome.number, "");
        assert_eq!(outcome.did, "200");
    }

    #[tokio::test]
    async fn test_listed_but_harmless_number_passes() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(PLAIN_URL, Scripted::Reply(200, r#"{"votes":2,"rating":"A_LEGITIMATE"}"#));
        let call = RecordingCall::default();

        let outcome = screener(transport.clone())
            .screen_call(&CallContext::inbound("+49 89 1234567", "200"), &call)
            .await;

        assert_eq!(outcome.state, CallState::AllowedListed);
        assert_eq!(call.termination_count(), 0);
        assert!(call
            .info_lines()
            .iter()
            .any(|l| l.starts_with("PhoneBlock ALLOWED_LISTED")));
    }

    #[tokio::test]
    async fn test_failed_terminate_becomes_error_outcome() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(PLAIN_URL, Scripted::Reply(200, r#"{"votes":30,"rating":"C_PING"}"#));
        let call = RecordingCall::failing_terminate();

        let outcome = screener(transport.clone())
            .screen_call(&CallContext::inbound("0891234567", "200"), &call)
            .await;

        assert_eq!(outcome, Outcome::error());
        assert_eq!(call.termination_count(), 1);
        assert_eq!(call.error_lines().len(), 1);
        assert_eq!(compact_states(&transport), vec!["blocked", "error"]);
    }

    #[tokio::test]
    async fn test_notification_failures_do_not_change_decision() {
        let transport = Arc::new(FakeTransport::new());
        transport.script(PLAIN_URL, Scripted::Reply(200, r#"{"votes":8,"rating":"D_POLL"}"#));
        transport.script(RICH, Scripted::Timeout);
        transport.script(COMPACT, Scripted::Reply(500, "down"));
        let call = RecordingCall::default();

        let handled = screener(transport.clone())
            .handle_call(&CallContext::inbound("0891234567", "200"), &call)
            .await;

        assert!(handled);
        assert_eq!(call.termination_count(), 1);
    }
}
