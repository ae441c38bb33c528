//! Anomaly classification: preprocessing, training, persistence and
//! prediction serving.

pub mod classifier;
pub mod encoder;
pub mod naive_bayes;
pub mod predict;
pub mod report;
pub mod scaler;
pub mod store;
pub mod svm;
pub mod training;

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small, well separated three-class datasets.

    const CENTERS: [(f64, f64); 3] = [(0.0, 0.0), (600.0, 0.0), (0.0, 600.0)];
    const LABELS: [&str; 3] = ["dos", "normal", "scan"];

    fn jitter(i: usize) -> (f64, f64) {
        (
            ((i * 7) % 11) as f64 * 10.0 - 50.0,
            ((i * 5) % 9) as f64 * 10.0 - 40.0,
        )
    }

    /// Rows around three centers with codes 0, 1, 2.
    pub fn clusters(per_class: usize) -> (Vec<Vec<f64>>, Vec<u32>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (class, (cx, cy)) in CENTERS.iter().enumerate() {
            for i in 0..per_class {
                let (dx, dy) = jitter(i + class);
                x.push(vec![cx + dx, cy + dy]);
                y.push(class as u32);
            }
        }
        (x, y)
    }

    pub fn centers() -> Vec<Vec<f64>> {
        CENTERS.iter().map(|(x, y)| vec![*x, *y]).collect()
    }

    /// Telemetry CSV with columns `timestamp, ifInOctets11, tcpInSegs, <label_column>`.
    /// Classes are interleaved so every split sees all of them.
    pub fn telemetry_csv(per_class: usize, label_column: &str) -> String {
        let mut out = format!("timestamp,ifInOctets11,tcpInSegs,{}\n", label_column);
        let mut minute = 0;
        for i in 0..per_class {
            for (class, (cx, cy)) in CENTERS.iter().enumerate() {
                let (dx, dy) = jitter(i + class);
                out.push_str(&format!(
                    "2024-01-01 {:02}:{:02}:00,{},{},{}\n",
                    minute / 60,
                    minute % 60,
                    cx + dx,
                    cy + dy,
                    LABELS[class]
                ));
                minute += 1;
            }
        }
        out
    }

    /// Rows at the cluster centers, one per class, in code order.
    pub fn center_csv(extra_column: bool) -> String {
        let mut out = String::from("timestamp,tcpInSegs,ifInOctets11");
        if extra_column {
            out.push_str(",unused");
        }
        out.push('\n');
        for (i, (cx, cy)) in CENTERS.iter().enumerate() {
            out.push_str(&format!("2024-02-01 00:0{}:00,{},{}", i, cy, cx));
            if extra_column {
                out.push_str(",7");
            }
            out.push('\n');
        }
        out
    }

    pub fn labels() -> [&'static str; 3] {
        LABELS
    }
}
