use crate::classify::tables::{CORE_COMPONENTS, WORKLOAD_COMPONENTS};
use crate::classify::Layer;

/// One row of the static `(layer, component) → rank` gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRank {
    pub layer: Layer,
    pub component: &'static str,
    pub rank: u32,
}

/// Returns the component rank vector. The output is a pure function of the
/// static tables and is identical on every call.
pub fn component_ranks() -> Vec<ComponentRank> {
    let mut out = Vec::with_capacity(1 + CORE_COMPONENTS.len() + WORKLOAD_COMPONENTS.len());
    out.push(ComponentRank {
        layer: Layer::Compute,
        component: "compute",
        rank: 1,
    });
    for (i, rule) in CORE_COMPONENTS.iter().enumerate() {
        out.push(ComponentRank {
            layer: Layer::Core,
            component: rule.component,
            rank: 10 + 5 * i as u32,
        });
    }
    for (i, rule) in WORKLOAD_COMPONENTS.iter().enumerate() {
        out.push(ComponentRank {
            layer: Layer::Workload,
            component: rule.component(),
            rank: 1000 + 5 * i as u32,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_are_deterministic() {
        assert_eq!(component_ranks(), component_ranks());
    }

    #[test]
    fn test_rank_values() {
        let ranks = component_ranks();
        assert_eq!(
            ranks[0],
            ComponentRank {
                layer: Layer::Compute,
                component: "compute",
                rank: 1
            }
        );
        let etcd = ranks
            .iter()
            .find(|r| r.component == "etcd")
            .expect("etcd is ranked");
        assert_eq!(etcd.rank, 10);
        assert_eq!(etcd.layer, Layer::Core);

        let logging = ranks
            .iter()
            .find(|r| r.component == "logging")
            .expect("logging is ranked");
        assert_eq!(logging.rank, 1000);
        assert_eq!(logging.layer, Layer::Workload);
    }

    #[test]
    fn test_ranks_are_unique_per_layer_component() {
        let ranks = component_ranks();
        for (i, a) in ranks.iter().enumerate() {
            for b in &ranks[i + 1..] {
                assert!(
                    (a.layer, a.component) != (b.layer, b.component),
                    "duplicate rank entry for {}/{}",
                    a.layer,
                    a.component
                );
            }
        }
    }
}
