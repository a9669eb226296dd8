//! Prometheus counters served at `/metrics`.
use inspect_store::{FailureKind, Outcome};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    reports_saved: IntCounter,
    reports_rejected: IntCounterVec,
    agent_turns: IntCounterVec,
    transcriptions: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reports_saved = IntCounter::with_opts(Opts::new(
            "inspect_reports_saved_total",
            "Inspection reports written to the store",
        ))?;
        let reports_rejected = IntCounterVec::new(
            Opts::new(
                "inspect_reports_rejected_total",
                "Report saves that failed, by failure kind",
            ),
            &["kind"],
        )?;
        let agent_turns = IntCounterVec::new(
            Opts::new("inspect_agent_turns_total", "User turns handled, by agent"),
            &["agent"],
        )?;
        let transcriptions = IntCounter::with_opts(Opts::new(
            "inspect_transcriptions_total",
            "Audio clips sent for transcription",
        ))?;

        registry.register(Box::new(reports_saved.clone()))?;
        registry.register(Box::new(reports_rejected.clone()))?;
        registry.register(Box::new(agent_turns.clone()))?;
        registry.register(Box::new(transcriptions.clone()))?;

        Ok(Self {
            registry,
            reports_saved,
            reports_rejected,
            agent_turns,
            transcriptions,
        })
    }

    pub fn record_save<T>(&self, outcome: &Outcome<T>) {
        match outcome.kind() {
            None => self.reports_saved.inc(),
            Some(kind) => self.record_rejection(kind),
        }
    }

    fn record_rejection(&self, kind: FailureKind) {
        self.reports_rejected.with_label_values(&[kind.as_str()]).inc();
    }

    pub fn record_turn(&self, agent: &str) {
        self.agent_turns.with_label_values(&[agent]).inc();
    }

    pub fn record_transcription(&self) {
        self.transcriptions.inc();
    }

    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_exported() {
        let metrics = Metrics::new().unwrap();
        metrics.record_save::<()>(&Outcome::Success(()));
        metrics.record_save::<()>(&Outcome::Failure {
            kind: FailureKind::Validation,
            error: "Missing primary_status".to_string(),
        });
        metrics.record_turn("generator");

        let text = metrics.encode().unwrap();
        assert!(text.contains("inspect_reports_saved_total 1"));
        assert!(text.contains("inspect_reports_rejected_total{kind=\"validation\"} 1"));
        assert!(text.contains("inspect_agent_turns_total{agent=\"generator\"} 1"));
    }
}
