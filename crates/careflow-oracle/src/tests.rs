/// Behavioural tests for `ScriptedOracle` through the `Oracle` trait object,
/// the way the dispatcher holds it.
#[cfg(test)]
mod unit {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::{Oracle, OracleError, ScriptedOracle};

    fn shared(o: ScriptedOracle) -> Arc<dyn Oracle> {
        Arc::new(o)
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let oracle = shared(
            ScriptedOracle::new()
                .route("appointment", "CollectUserInfo: name=Alice")
                .route("appoint", "never reached"),
        );
        let text = oracle.invoke("an appointment please").await.unwrap();
        assert_eq!(text, "CollectUserInfo: name=Alice");
    }

    #[tokio::test]
    async fn default_used_when_no_route_matches() {
        let oracle = shared(
            ScriptedOracle::new()
                .route("guide", "MatchDoctor: department=Cardiology")
                .with_default("ProvideHealthAdvice: question=diet"),
        );
        let text = oracle.invoke("something else").await.unwrap();
        assert_eq!(text, "ProvideHealthAdvice: question=diet");
    }

    #[tokio::test]
    async fn no_route_and_no_default_is_error() {
        let oracle = shared(ScriptedOracle::new());
        let err = oracle.invoke("anything").await.unwrap_err();
        assert!(matches!(err, OracleError::Scripted(_)));
    }

    #[tokio::test]
    async fn fail_route_returns_error() {
        let oracle = shared(
            ScriptedOracle::new()
                .fail_on("consult", "backend down")
                .with_default("x"),
        );
        let err = oracle.invoke("consult me").await.unwrap_err();
        assert!(err.to_string().contains("backend down"));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn delay_is_applied_before_reply() {
        let oracle = shared(
            ScriptedOracle::new()
                .with_default("x")
                .with_delay(Duration::from_millis(200)),
        );
        let timed = tokio::time::timeout(Duration::from_millis(20), oracle.invoke("p")).await;
        assert!(timed.is_err(), "expected the delayed reply to time out");
    }

    #[test]
    fn label_is_stable() {
        assert_eq!(ScriptedOracle::new().label(), "scripted");
    }
}
