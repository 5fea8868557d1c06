use std::sync::RwLock;

/// One exported sample: an ordered label list and a gauge value.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// MetricSet is the read-mostly container behind one exported metric family.
///
/// The driver task atomically replaces the content once per cycle; scrape
/// readers render under the read lock and always observe the last completed
/// cycle, never a partial update.
#[derive(Debug)]
pub struct MetricSet {
    name: &'static str,
    help: &'static str,
    metrics: RwLock<Vec<Metric>>,
}

impl MetricSet {
    pub const fn new(name: &'static str, help: &'static str) -> Self {
        MetricSet {
            name,
            help,
            metrics: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replaces the published content wholesale.
    pub fn update(&self, metrics: Vec<Metric>) {
        *self.metrics.write().unwrap() = metrics;
    }

    /// Appends the family in Prometheus text exposition format.
    pub fn render(&self, out: &mut String) {
        out.push_str("# HELP ");
        out.push_str(self.name);
        out.push(' ');
        out.push_str(self.help);
        out.push('\n');
        out.push_str("# TYPE ");
        out.push_str(self.name);
        out.push_str(" gauge\n");

        let metrics = self.metrics.read().unwrap();
        for metric in metrics.iter() {
            out.push_str(self.name);
            if !metric.labels.is_empty() {
                out.push('{');
                for (i, (key, value)) in metric.labels.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_label_value(value, out);
                    out.push('"');
                }
                out.push('}');
            }
            out.push(' ');
            out.push_str(&metric.value.to_string());
            out.push('\n');
        }
    }
}

/// Escapes `\`, `"` and newline per the exposition format.
fn escape_label_value(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
}
