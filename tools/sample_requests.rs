//! Sample Request Generator
//!
//! Posts random transactions to a running service's `/predict` endpoint.
//! Falls back to printing the records when the service is unreachable.

use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use fraud_detection_service::RawTransaction;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Devices listed in the shipped preprocessing table
const DEVICES: &[&str] = &[
    "CQTUVBYIWWWBC",
    "EQYVNEGOFLAWK",
    "HIBGXBPMMHOIC",
    "ITUMJCKWEYNDD",
    "KIPFSCNUGOLDP",
    "NAUITBZFJKHWW",
    "QVPSPJUOCKZAR",
    "YSSKYOSJHPPLJ",
];

/// Transaction generator for testing
struct TransactionGenerator {
    rng: rand::rngs::ThreadRng,
    user_counter: i64,
}

impl TransactionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            user_counter: 100_000,
        }
    }

    /// Established account, daytime purchase, common device
    fn generate_legitimate(&mut self) -> RawTransaction {
        self.user_counter += 1;
        let purchase = Utc::now().naive_utc() - ChronoDuration::hours(self.rng.gen_range(1..72));
        let signup = purchase - ChronoDuration::days(self.rng.gen_range(30..365));

        RawTransaction {
            user_id: self.user_counter,
            purchase_value: self.rng.gen_range(9.0..120.0_f64).round(),
            device_id: self.random_device(),
            source: self.random_choice(&["SEO", "Ads", "Direct"]).to_string(),
            browser: self
                .random_choice(&["Chrome", "Safari", "FireFox", "IE"])
                .to_string(),
            sex: self.random_choice(&["M", "F"]).to_string(),
            age: self.rng.gen_range(18..70),
            ip_address: self.random_ip(),
            country: self
                .random_choice(&["United States", "United Kingdom", "Canada", "Japan"])
                .to_string(),
            signup_time: format_time(signup),
            purchase_time: format_time(purchase),
        }
    }

    /// Purchase seconds after signup, high value
    fn generate_suspicious(&mut self) -> RawTransaction {
        self.user_counter += 1;
        let signup = Utc::now().naive_utc() - ChronoDuration::minutes(self.rng.gen_range(5..60));
        let purchase = signup + ChronoDuration::seconds(self.rng.gen_range(1..10));

        RawTransaction {
            user_id: self.user_counter,
            purchase_value: self.rng.gen_range(80.0..160.0_f64).round(),
            device_id: self.random_device(),
            source: self.random_choice(&["Direct", "Ads"]).to_string(),
            browser: self.random_choice(&["Chrome", "Opera"]).to_string(),
            sex: self.random_choice(&["M", "F"]).to_string(),
            age: self.rng.gen_range(18..30),
            ip_address: self.random_ip(),
            country: self
                .random_choice(&["United States", "China", "Brazil"])
                .to_string(),
            signup_time: format_time(signup),
            purchase_time: format_time(purchase),
        }
    }

    /// Draw a suspicious record with probability `fraud_rate`
    fn next(&mut self, fraud_rate: f64) -> (RawTransaction, bool) {
        if self.rng.gen_bool(fraud_rate) {
            (self.generate_suspicious(), true)
        } else {
            (self.generate_legitimate(), false)
        }
    }

    /// A table device most of the time, otherwise a fresh id the service
    /// has never seen
    fn random_device(&mut self) -> String {
        if self.rng.gen_bool(0.7) {
            return self.random_choice(DEVICES).to_string();
        }
        (0..13)
            .map(|_| char::from(self.rng.gen_range(b'A'..=b'Z')))
            .collect()
    }

    fn random_ip(&mut self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.rng.gen_range(1..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(0..255),
            self.rng.gen_range(1..255)
        )
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn format_time(t: NaiveDateTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_requests=info".parse()?),
        )
        .init();

    info!("Starting Sample Request Generator");

    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or("http://localhost:5000");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args
        .get(3)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.1_f64)
        .clamp(0.0, 1.0);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        base_url = %base_url,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let health_url = format!("{base_url}/health");
    match client.get(&health_url).send().await {
        Ok(resp) if resp.status().is_success() => info!("Service is healthy"),
        Ok(resp) => {
            warn!(status = %resp.status(), "Service unhealthy. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
        Err(e) => {
            warn!(error = %e, "Service unreachable. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    }

    let predict_url = format!("{base_url}/predict");
    let mut generator = TransactionGenerator::new();
    let (mut suspicious_sent, mut flagged, mut errors) = (0u64, 0u64, 0u64);

    info!("Starting to send {} requests...", count);

    for i in 0..count {
        let (transaction, suspicious) = generator.next(fraud_rate);
        suspicious_sent += u64::from(suspicious);

        match client.post(&predict_url).json(&transaction).send().await {
            Ok(resp) if resp.status().is_success() => {
                let body: serde_json::Value = resp.json().await?;
                if body["prediction"] == 1 {
                    flagged += 1;
                }
            }
            Ok(resp) => {
                errors += 1;
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "Request rejected");
            }
            Err(e) => {
                errors += 1;
                warn!(error = %e, "Request failed");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} requests ({} suspicious, {} flagged, {} errors)",
                i + 1,
                count,
                suspicious_sent,
                flagged,
                errors
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} suspicious, {} flagged, {} errors)",
        count, suspicious_sent, flagged, errors
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no service connection)");

    let mut generator = TransactionGenerator::new();

    for i in 0..count {
        let (transaction, suspicious) = generator.next(fraud_rate);

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string_pretty(&transaction)?;
            info!(request = i + 1, suspicious, "Sample transaction:\n{}", json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
