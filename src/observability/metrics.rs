use prometheus::{
    Encoder, GaugeVec, Histogram, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub pending_orders: IntGauge,
    pub expiry_sweep_seconds: Histogram,
    pub courier_earnings: GaugeVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "transitions_total",
                "Order lifecycle transitions by trigger and outcome",
            ),
            &["transition", "outcome"],
        )
        .expect("valid transitions_total metric");

        let pending_orders = IntGauge::new(
            "pending_orders",
            "Orders currently awaiting a business response",
        )
        .expect("valid pending_orders metric");

        let expiry_sweep_seconds = Histogram::with_opts(prometheus::HistogramOpts::new(
            "expiry_sweep_seconds",
            "Duration of one auto-cancel sweep over the order registry",
        ))
        .expect("valid expiry_sweep_seconds metric");

        let courier_earnings = GaugeVec::new(
            Opts::new("courier_earnings", "Cumulative courier earnings"),
            &["courier_id"],
        )
        .expect("valid courier_earnings metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(pending_orders.clone()))
            .expect("register pending_orders");
        registry
            .register(Box::new(expiry_sweep_seconds.clone()))
            .expect("register expiry_sweep_seconds");
        registry
            .register(Box::new(courier_earnings.clone()))
            .expect("register courier_earnings");

        Self {
            registry,
            transitions_total,
            pending_orders,
            expiry_sweep_seconds,
            courier_earnings,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
