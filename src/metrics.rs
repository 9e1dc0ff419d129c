#[derive(Debug, Clone)]
pub struct Metrics {
    upstream_requests: prometheus::IntCounterVec,
    upstream_latency: prometheus::HistogramVec,
    reports: prometheus::IntCounterVec,
    last_report_items: prometheus::IntGauge,
}

impl Metrics {
    pub fn new(registry: &prometheus::Registry) -> Result<Self, prometheus::Error> {
        let upstream_requests = prometheus::IntCounterVec::new(
            prometheus::Opts::new(
                "upstream_requests_total",
                "The number of requests sent to the marketplace API",
            ),
            &["endpoint", "status"],
        )?;
        registry.register(Box::new(upstream_requests.clone()))?;

        let upstream_latency = prometheus::HistogramVec::new(
            prometheus::HistogramOpts::new(
                "upstream_request_duration_seconds",
                "How long requests to the marketplace API took",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(upstream_latency.clone()))?;

        let reports = prometheus::IntCounterVec::new(
            prometheus::Opts::new("item_reports_total", "The number of item reports built"),
            &["outcome"],
        )?;
        registry.register(Box::new(reports.clone()))?;

        let last_report_items = prometheus::IntGauge::new(
            "last_report_items",
            "The number of items in the last successful report",
        )?;
        registry.register(Box::new(last_report_items.clone()))?;

        Ok(Self {
            upstream_requests,
            upstream_latency,
            reports,
            last_report_items,
        })
    }

    /// `status` is the HTTP status code, or `"error"` when no response arrived.
    pub fn observe_upstream(&self, endpoint: &str, status: &str, elapsed: std::time::Duration) {
        self.upstream_requests
            .with_label_values(&[endpoint, status])
            .inc();
        self.upstream_latency
            .with_label_values(&[endpoint])
            .observe(elapsed.as_secs_f64());
    }

    pub fn report_succeeded(&self, items: usize) {
        self.reports.with_label_values(&["success"]).inc();
        self.last_report_items.set(items as i64);
    }

    pub fn report_failed(&self) {
        self.reports.with_label_values(&["error"]).inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_counts() {
        let registry = prometheus::Registry::new();
        let metrics = Metrics::new(&registry).unwrap();

        metrics.observe_upstream("item", "200", std::time::Duration::from_millis(5));
        metrics.report_succeeded(3);

        let encoded = prometheus::TextEncoder::new()
            .encode_to_string(&registry.gather())
            .unwrap();
        assert!(encoded.contains(r#"upstream_requests_total{endpoint="item",status="200"} 1"#));
        assert!(encoded.contains("last_report_items 3"));
    }

    #[test]
    fn double_registration_fails() {
        let registry = prometheus::Registry::new();
        Metrics::new(&registry).unwrap();

        assert!(Metrics::new(&registry).is_err());
    }
}
